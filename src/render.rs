//! Placeholder substitution for template text.
//!
//! All tokens are matched literally in a single pass. Unknown `{...}` text is
//! left alone.

use aho_corasick::AhoCorasick;
use chrono::{Datelike, NaiveDate};
use std::sync::OnceLock;

use crate::constants::{
    TOKEN_DATE, TOKEN_PROFESSOR_EMAIL, TOKEN_PROFESSOR_NAME, TOKEN_SENDER_NAME, TOKEN_SIGNATURE,
};
use crate::store::Professor;

/// Pattern order; `render` builds its replacement list in the same order.
const TOKENS: [&str; 5] = [
    TOKEN_PROFESSOR_NAME,
    TOKEN_PROFESSOR_EMAIL,
    TOKEN_SENDER_NAME,
    TOKEN_DATE,
    TOKEN_SIGNATURE,
];

static TOKEN_MATCHER: OnceLock<Option<AhoCorasick>> = OnceLock::new();

fn token_matcher() -> Option<&'static AhoCorasick> {
    TOKEN_MATCHER
        .get_or_init(|| match AhoCorasick::new(TOKENS) {
            Ok(ac) => Some(ac),
            Err(e) => {
                tracing::error!("Failed to build placeholder matcher: {}", e);
                None
            }
        })
        .as_ref()
}

/// Values available to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub professor_name: Option<&'a str>,
    pub professor_email: Option<&'a str>,
    pub sender_name: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub date: NaiveDate,
}

impl<'a> RenderContext<'a> {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            professor_name: None,
            professor_email: None,
            sender_name: None,
            signature: None,
            date,
        }
    }

    pub fn professor(mut self, professor: Option<&'a Professor>) -> Self {
        self.professor_name = professor.map(|p| p.name.as_str());
        self.professor_email = professor.and_then(Professor::email);
        self
    }

    pub fn sender_name(mut self, name: &'a str) -> Self {
        self.sender_name = Some(name);
        self
    }

    pub fn signature(mut self, content: &'a str) -> Self {
        self.signature = Some(content);
        self
    }
}

/// `<month>月<day>日` without leading zeros.
pub fn date_label(date: NaiveDate) -> String {
    format!("{}月{}日", date.month(), date.day())
}

/// Substitute every recognized token in `raw`.
///
/// Absent values become the empty string, except the signature: with no
/// signature content the `{署名}` token stays in the output as written.
pub fn render(raw: &str, ctx: &RenderContext<'_>) -> String {
    let Some(matcher) = token_matcher() else {
        return raw.to_string();
    };

    let date = date_label(ctx.date);
    let signature = ctx
        .signature
        .filter(|s| !s.is_empty())
        .unwrap_or(TOKEN_SIGNATURE);

    let replacements = [
        ctx.professor_name.unwrap_or(""),
        ctx.professor_email.unwrap_or(""),
        ctx.sender_name.unwrap_or(""),
        date.as_str(),
        signature,
    ];

    matcher.replace_all(raw, &replacements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_date_label_has_no_leading_zeros() {
        let ctx = RenderContext::new(day(1, 5));
        assert_eq!(render("{日付}", &ctx), "1月5日");
        let ctx = RenderContext::new(day(12, 31));
        assert_eq!(render("{日付}", &ctx), "12月31日");
    }

    #[test]
    fn test_names_substituted() {
        let ctx = RenderContext {
            professor_name: Some("田中"),
            sender_name: Some("鈴木"),
            ..RenderContext::new(day(4, 1))
        };
        assert_eq!(
            render("{教授の名前}さん、{自分の名前}です。", &ctx),
            "田中さん、鈴木です。"
        );
    }

    #[test]
    fn test_absent_values_become_empty_except_signature() {
        let ctx = RenderContext::new(day(6, 9));
        assert_eq!(
            render("[{教授の名前}][{教授のメール}][{自分の名前}][{署名}]", &ctx),
            "[][][][{署名}]"
        );

        let ctx = RenderContext::new(day(6, 9)).signature("");
        assert_eq!(render("{署名}", &ctx), "{署名}");
    }

    #[test]
    fn test_signature_and_email_substituted_everywhere() {
        let professor = Professor {
            id: "1".into(),
            name: "田中".into(),
            email: "tanaka@example.ac.jp".into(),
        };
        let ctx = RenderContext::new(day(3, 3))
            .professor(Some(&professor))
            .signature("--\n鈴木");
        assert_eq!(
            render("{教授のメール} {教授のメール}\n{署名}", &ctx),
            "tanaka@example.ac.jp tanaka@example.ac.jp\n--\n鈴木"
        );
    }

    #[test]
    fn test_unknown_tokens_untouched() {
        let ctx = RenderContext::new(day(1, 1)).sender_name("鈴木");
        assert_eq!(
            render("{宛先} {自分の名前} {教授の名前 }", &ctx),
            "{宛先} 鈴木 {教授の名前 }"
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let ctx = RenderContext::new(day(2, 14)).sender_name("{日付}");
        assert_eq!(render("{自分の名前} {日付}", &ctx), "{日付} 2月14日");
    }
}
