use super::ids::next_id;
use super::{Category, StoreError, Template, require};
use crate::constants::ALL_CATEGORIES;

const TITLE_REQUIRED: &str = "タイトルを入力してください";
const CONTENT_REQUIRED: &str = "内容を入力してください";

/// Fields to change on an existing template; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Category>,
}

/// Ordered template collection
#[derive(Debug, Clone, Default)]
pub struct Templates {
    items: Vec<Template>,
}

impl Templates {
    pub fn new(items: Vec<Template>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Template] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.items.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|t| t.id == id)
    }

    /// Add a new template with a fresh id. Title and content must be non-blank.
    pub fn create(
        &mut self,
        title: &str,
        content: &str,
        category: Category,
        now_ms: i64,
    ) -> Result<Template, StoreError> {
        require(title, TITLE_REQUIRED)?;
        require(content, CONTENT_REQUIRED)?;

        let id = next_id(now_ms, |id| self.get(id).is_some());
        let template = Template {
            id,
            title: title.to_string(),
            content: content.to_string(),
            category,
            is_favorite: false,
            created_at: now_ms,
            updated_at: now_ms,
        };
        tracing::debug!(id = %template.id, "template created");
        self.items.push(template.clone());
        Ok(template)
    }

    /// Apply `patch` to an existing template and bump `updated_at`.
    ///
    /// The patched result is validated like a new template; on failure the
    /// stored template is unchanged.
    pub fn update(
        &mut self,
        id: &str,
        patch: TemplatePatch,
        now_ms: i64,
    ) -> Result<Template, StoreError> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::not_found("template", id))?;

        let mut updated = self.items[idx].clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(content) = patch.content {
            updated.content = content;
        }
        if let Some(category) = patch.category {
            updated.category = category;
        }
        require(&updated.title, TITLE_REQUIRED)?;
        require(&updated.content, CONTENT_REQUIRED)?;

        updated.updated_at = now_ms;
        self.items[idx] = updated.clone();
        tracing::debug!(id, "template updated");
        Ok(updated)
    }

    /// Create when `draft` has no id yet, otherwise overwrite the stored copy.
    pub fn save(&mut self, draft: Template, now_ms: i64) -> Result<Template, StoreError> {
        if !draft.is_saved() {
            let mut created = self.create(&draft.title, &draft.content, draft.category, now_ms)?;
            if draft.is_favorite {
                self.toggle_favorite(&created.id);
                created.is_favorite = true;
            }
            return Ok(created);
        }

        self.update(
            &draft.id,
            TemplatePatch {
                title: Some(draft.title),
                content: Some(draft.content),
                category: Some(draft.category),
            },
            now_ms,
        )
    }

    /// Remove a template. Returns false when no template had that id.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|t| t.id != id);
        self.items.len() != before
    }

    /// Flip the favorite flag, returning the new value (`None` if absent).
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let template = self.items.iter_mut().find(|t| t.id == id)?;
        template.is_favorite = !template.is_favorite;
        Some(template.is_favorite)
    }

    /// Templates in the given category, or all of them for `"all"`.
    pub fn list_by_category(&self, category_id: &str) -> Vec<&Template> {
        self.items
            .iter()
            .filter(|t| category_id == ALL_CATEGORIES || t.category.id == category_id)
            .collect()
    }

    /// `list_by_category`, narrowed to favorites and/or a search term.
    pub fn filtered(
        &self,
        category_id: &str,
        favorites_only: bool,
        search: Option<&str>,
    ) -> Vec<&Template> {
        let mut templates = self.list_by_category(category_id);
        if favorites_only {
            templates.retain(|t| t.is_favorite);
        }
        if let Some(term) = search {
            templates.retain(|t| t.matches(term));
        }
        templates
    }

    pub fn references_category(&self, category_id: &str) -> bool {
        self.items.iter().any(|t| t.category.id == category_id)
    }

    /// Refresh every embedded category snapshot from `categories` by id,
    /// falling back to the first category when the id no longer exists.
    pub fn resync_categories(&mut self, categories: &[Category]) {
        let Some(first) = categories.first() else {
            return;
        };
        for template in &mut self.items {
            let current = categories
                .iter()
                .find(|c| c.id == template.category.id)
                .unwrap_or(first);
            if template.category != *current {
                tracing::debug!(
                    id = %template.id,
                    category = %current.id,
                    "resynced template category"
                );
                template.category = current.clone();
            }
        }
    }
}
