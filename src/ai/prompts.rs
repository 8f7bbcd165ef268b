//! Prompt text for AI drafting

use super::draft::DraftRequest;
use crate::constants::TOKEN_DATE;

/// Build the drafting prompt.
///
/// The model is asked for a JSON object with `title` and `content`. The
/// signature block is appended by the caller, so the model is told to leave
/// it out, and dates must be written as the date token.
pub fn draft_prompt(request: &DraftRequest<'_>) -> String {
    let sender = request.sender_name;
    let date = request.date_label;

    let extra = if request.extra_context.trim().is_empty() {
        String::new()
    } else {
        format!("追加情報: {}\n", request.extra_context.trim())
    };

    format!(
        r#"教授に送るメールを日本語で作成してください。
次の情報を使ってください。

教授の名前: {professor}
送信者の名前: {sender}
日付: {date}
メールの目的: {purpose}
文体: {tone}
{extra}
作成するものは次の2つです。
1. 件名: 内容が分かる簡潔なもの。先頭に送信者の名前を付けないこと。【】などの括弧は使わないこと。
2. 本文: 次の形式に従うこと。

[教授の名前]教授

いつもお世話になっております。{sender}です。

[本文]

{sender}

注意:
- 適切な敬称を使い、具体的で分かりやすい内容にしてください。
- 署名は後から挿入するので本文に含めないでください。
- 日付に触れるときは「{date}」のような具体的な日付ではなく、必ず {token} と書いてください（例:「{token}にお伺いします」）。

次のJSON形式だけで返答してください。
{{
  "title": "件名",
  "content": "本文"
}}
"#,
        professor = request.professor_name.unwrap_or_default(),
        purpose = request.purpose.trim(),
        tone = request.tone.description(),
        token = TOKEN_DATE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Tone;

    fn request<'a>(extra: &'a str) -> DraftRequest<'a> {
        DraftRequest {
            purpose: "研究室訪問のお願い",
            tone: Tone::Formal,
            extra_context: extra,
            professor_name: Some("田中"),
            sender_name: "鈴木",
            date_label: "4月1日",
        }
    }

    #[test]
    fn test_prompt_carries_inputs_and_rules() {
        let prompt = draft_prompt(&request(""));
        assert!(prompt.contains("教授の名前: 田中"));
        assert!(prompt.contains("いつもお世話になっております。鈴木です。"));
        assert!(prompt.contains("文体: 丁寧で礼儀正しい"));
        assert!(prompt.contains("必ず {日付} と書いてください"));
        assert!(prompt.contains("署名は後から挿入する"));
        assert!(prompt.contains("\"title\""));
        assert!(!prompt.contains("追加情報"));
    }

    #[test]
    fn test_prompt_includes_extra_context() {
        let prompt = draft_prompt(&request("来週の火曜日を希望"));
        assert!(prompt.contains("追加情報: 来週の火曜日を希望"));
    }
}
