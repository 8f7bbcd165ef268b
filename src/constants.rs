//! Application-wide constants
//!
//! Storage keys, placeholder tokens and built-in defaults live here so the
//! persisted layout stays discoverable in one place.

use crate::store::Category;

// === Storage keys ===

/// Ordered list of categories (JSON array).
pub const KEY_CATEGORIES: &str = "categories";

/// Ordered list of templates (JSON array).
pub const KEY_TEMPLATES: &str = "templates";

/// Ordered list of professors (JSON array).
pub const KEY_PROFESSORS: &str = "professors";

/// Sender name, stored as the raw trimmed string.
pub const KEY_SENDER_NAME: &str = "myName";

/// Signature block (JSON object with a `content` field).
pub const KEY_SIGNATURE: &str = "signature";

// === Placeholder tokens ===

pub const TOKEN_PROFESSOR_NAME: &str = "{教授の名前}";
pub const TOKEN_PROFESSOR_EMAIL: &str = "{教授のメール}";
pub const TOKEN_SENDER_NAME: &str = "{自分の名前}";
pub const TOKEN_SIGNATURE: &str = "{署名}";
pub const TOKEN_DATE: &str = "{日付}";

/// Every recognized token with a short description, in display order.
pub const VARIABLES: [(&str, &str); 5] = [
    (TOKEN_PROFESSOR_NAME, "選択中の教授の名前"),
    (TOKEN_PROFESSOR_EMAIL, "選択中の教授のメールアドレス"),
    (TOKEN_SENDER_NAME, "あなたの名前"),
    (TOKEN_SIGNATURE, "署名テンプレート"),
    (TOKEN_DATE, "設定した日付"),
];

// === Categories ===

/// Color given to a new category when none is chosen.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6b7280";

/// Categories seeded on first run.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("1", "研究関連", "#0891b2"),
        Category::new("2", "事務関連", "#059669"),
        Category::new("3", "その他", DEFAULT_CATEGORY_COLOR),
    ]
}

/// Category assigned to a new template when the category list is empty.
pub fn fallback_category() -> Category {
    Category::new("default", "その他", DEFAULT_CATEGORY_COLOR)
}

/// Filter value that selects every category.
pub const ALL_CATEGORIES: &str = "all";
