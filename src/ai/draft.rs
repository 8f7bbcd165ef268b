use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

use super::prompts;
use crate::constants::TOKEN_SIGNATURE;

/// Why a draft could not be produced. The editor state is never touched on
/// any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("教授を選択してください")]
    MissingProfessor,
    #[error("メールの目的を入力してください")]
    EmptyPurpose,
    #[error("メール生成に失敗しました: {0}")]
    Transport(String),
    /// Error payload returned by the remote service
    #[error("メール生成エラー: {0}")]
    Remote(String),
    #[error("メール生成に失敗しました - レスポンスが予期しない形式です")]
    UnexpectedResponse,
}

impl DraftError {
    pub(crate) fn remote(message: Option<String>) -> Self {
        Self::Remote(
            message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "不明なエラー".to_string()),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Formal,
    Casual,
}

impl Tone {
    pub fn description(self) -> &'static str {
        match self {
            Tone::Formal => "丁寧で礼儀正しい",
            Tone::Casual => "やや友好的でカジュアル",
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "formal" => Ok(Tone::Formal),
            "casual" => Ok(Tone::Casual),
            other => Err(format!("Unknown tone: {other} (expected formal or casual)")),
        }
    }
}

/// Inputs for one drafting call
#[derive(Debug, Clone)]
pub struct DraftRequest<'a> {
    pub purpose: &'a str,
    pub tone: Tone,
    pub extra_context: &'a str,
    pub professor_name: Option<&'a str>,
    pub sender_name: &'a str,
    /// Already formatted, e.g. `4月1日`
    pub date_label: &'a str,
}

impl DraftRequest<'_> {
    fn validate(&self) -> Result<(), DraftError> {
        if self.professor_name.is_none() {
            return Err(DraftError::MissingProfessor);
        }
        if self.purpose.trim().is_empty() {
            return Err(DraftError::EmptyPurpose);
        }
        Ok(())
    }
}

/// Title/content pair ready to drop into the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    /// False when the reply had no usable title and the caller's was kept
    pub title_generated: bool,
}

/// Anything that can turn a prompt into generated text.
pub trait DraftBackend {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, DraftError>>;
}

/// Ask the backend for a draft. Exactly one request is made.
pub async fn request_draft<B: DraftBackend>(
    backend: &B,
    request: &DraftRequest<'_>,
    current_title: &str,
) -> Result<Draft, DraftError> {
    request.validate()?;

    let prompt = prompts::draft_prompt(request);
    tracing::info!(tone = ?request.tone, "requesting AI draft");

    let text = backend.generate(&prompt).await.inspect_err(|e| {
        tracing::warn!("AI draft failed: {}", e);
    })?;

    Ok(parse_draft(&text, current_title))
}

/// Interpret the model's reply.
///
/// The span from the first `{` to the last `}` is parsed as JSON. If there is
/// no such span or it does not parse, the whole reply becomes the content and
/// `current_title` is kept. The signature token is appended either way.
pub fn parse_draft(text: &str, current_title: &str) -> Draft {
    let parsed = json_span(text).and_then(|json| {
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Draft reply is not valid JSON, using raw text: {}", e);
                None
            }
        }
    });

    match parsed {
        Some(value) => {
            // fields that are not strings count as missing
            let field = |name: &str| value.get(name).and_then(serde_json::Value::as_str);
            let title = field("title").filter(|t| !t.is_empty());
            Draft {
                title_generated: title.is_some(),
                title: title.unwrap_or(current_title).to_string(),
                content: with_signature(field("content").unwrap_or("")),
            }
        }
        None => Draft {
            title: current_title.to_string(),
            content: with_signature(text),
            title_generated: false,
        },
    }
}

fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn with_signature(content: &str) -> String {
    format!("{}\n\n{}", content.trim(), TOKEN_SIGNATURE)
}
