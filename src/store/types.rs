use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Professor {
    /// Email address, or `None` when it was left blank
    pub fn email(&self) -> Option<&str> {
        Some(self.email.as_str()).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Display color as `#rrggbb`
    pub color: String,
}

impl Category {
    pub fn new(id: &str, name: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// A reusable email body with placeholder tokens.
///
/// `category` is a snapshot copied at assignment time, not a reference; it is
/// refreshed from the category list only when state is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Empty until the template is first saved
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    #[serde(default)]
    pub is_favorite: bool,
    /// Epoch milliseconds
    #[serde(default)]
    pub created_at: i64,
    /// Epoch milliseconds
    #[serde(default)]
    pub updated_at: i64,
}

impl Template {
    /// An unsaved template in the given category
    pub fn draft(category: Category) -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            content: String::new(),
            category,
            is_favorite: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_saved(&self) -> bool {
        !self.id.is_empty()
    }

    /// Case-insensitive substring match over title and content
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.content.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTemplate {
    pub content: String,
}
