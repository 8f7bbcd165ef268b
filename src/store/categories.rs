use super::ids::next_id;
use super::{Category, StoreError, Templates, require};
use crate::constants::{DEFAULT_CATEGORY_COLOR, fallback_category};

/// Ordered category collection
#[derive(Debug, Clone, Default)]
pub struct Categories {
    items: Vec<Category>,
}

impl Categories {
    pub fn new(items: Vec<Category>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Category] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.items.iter().find(|c| c.id == id)
    }

    /// Category for a new template: the first one, or the built-in fallback.
    pub fn default_for_new(&self) -> Category {
        self.items.first().cloned().unwrap_or_else(fallback_category)
    }

    pub fn add(
        &mut self,
        name: &str,
        color: Option<&str>,
        now_ms: i64,
    ) -> Result<Category, StoreError> {
        require(name, "カテゴリー名を入力してください")?;
        let color = color.unwrap_or(DEFAULT_CATEGORY_COLOR);
        if !is_hex_color(color) {
            return Err(StoreError::Validation(format!(
                "色は #rrggbb 形式で指定してください: {color}"
            )));
        }

        let id = next_id(now_ms, |id| self.get(id).is_some());
        let category = Category::new(&id, name.trim(), color);
        self.items.push(category.clone());
        tracing::debug!(id = %category.id, "category added");
        Ok(category)
    }

    /// Remove a category unless a template still references it.
    ///
    /// Returns `Ok(false)` when no category had that id.
    pub fn delete(&mut self, id: &str, templates: &Templates) -> Result<bool, StoreError> {
        if templates.references_category(id) {
            return Err(StoreError::InUse {
                category: id.to_string(),
            });
        }
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        Ok(self.items.len() != before)
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::default_categories;

    #[test]
    fn test_add_trims_and_defaults_color() {
        let mut categories = Categories::default();
        let c = categories.add("  ゼミ ", None, 42).unwrap();
        assert_eq!(c.id, "42");
        assert_eq!(c.name, "ゼミ");
        assert_eq!(c.color, DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn test_add_validation() {
        let mut categories = Categories::default();
        assert!(matches!(
            categories.add("   ", None, 1),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            categories.add("ゼミ", Some("red"), 1),
            Err(StoreError::Validation(_))
        ));
        assert!(categories.as_slice().is_empty());
    }

    #[test]
    fn test_delete_unused_category() {
        let mut categories = Categories::new(default_categories());
        let templates = Templates::default();
        assert_eq!(categories.delete("2", &templates), Ok(true));
        assert!(categories.get("2").is_none());
        assert_eq!(categories.as_slice().len(), 2);
    }

    #[test]
    fn test_delete_in_use_category_is_blocked() {
        let mut categories = Categories::new(default_categories());
        let mut templates = Templates::default();
        let research = categories.get("1").cloned().unwrap();
        templates.create("件名", "本文", research, 1).unwrap();

        let err = categories.delete("1", &templates).unwrap_err();
        assert_eq!(
            err,
            StoreError::InUse {
                category: "1".into()
            }
        );
        assert_eq!(categories.as_slice(), default_categories().as_slice());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut categories = Categories::new(default_categories());
        assert_eq!(categories.delete("zzz", &Templates::default()), Ok(false));
        assert_eq!(categories.as_slice().len(), 3);
    }

    #[test]
    fn test_default_for_new() {
        assert_eq!(Categories::default().default_for_new(), fallback_category());
        let categories = Categories::new(default_categories());
        assert_eq!(categories.default_for_new().id, "1");
    }
}
