//! Application state and its persistence.
//!
//! `Session` owns the loaded `AppState` and the `Storage` it came from. Every
//! mutating method validates first, changes the in-memory collection, then
//! writes the affected key in full. Nothing is written when validation fails.

use anyhow::Result;
use chrono::NaiveDate;

use crate::ai::Draft;
use crate::constants::{
    KEY_CATEGORIES, KEY_PROFESSORS, KEY_SENDER_NAME, KEY_SIGNATURE, KEY_TEMPLATES,
    default_categories,
};
use crate::render::{RenderContext, render};
use crate::storage::Storage;
use crate::store::{
    Categories, Category, Professor, Professors, SignatureTemplate, StoreError, Template,
    TemplatePatch, Templates,
};

/// Everything the user has entered
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub categories: Categories,
    pub templates: Templates,
    pub professors: Professors,
    pub sender_name: String,
    pub signature: SignatureTemplate,
}

impl AppState {
    /// Render context for the current sender/signature and an optional professor
    pub fn render_context<'a>(
        &'a self,
        professor: Option<&'a Professor>,
        date: NaiveDate,
    ) -> RenderContext<'a> {
        RenderContext::new(date)
            .professor(professor)
            .sender_name(&self.sender_name)
            .signature(&self.signature.content)
    }

    pub fn professor(&self, id: &str) -> Result<&Professor, StoreError> {
        self.professors
            .get(id)
            .ok_or_else(|| StoreError::not_found("professor", id))
    }

    pub fn template(&self, id: &str) -> Result<&Template, StoreError> {
        self.templates
            .get(id)
            .ok_or_else(|| StoreError::not_found("template", id))
    }

    pub fn category(&self, id: &str) -> Result<&Category, StoreError> {
        self.categories
            .get(id)
            .ok_or_else(|| StoreError::not_found("category", id))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct Session {
    storage: Storage,
    state: AppState,
}

impl Session {
    /// Load every key from `storage`.
    ///
    /// Missing keys start empty, except categories which fall back to the
    /// defaults. Each template's category snapshot is refreshed from the
    /// loaded categories by id (first category if the id is gone).
    pub async fn open(storage: Storage) -> Result<Self> {
        let categories = storage
            .get_json_list::<Category>(KEY_CATEGORIES)
            .await?
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_categories);

        let mut templates = Templates::new(
            storage
                .get_json_list::<Template>(KEY_TEMPLATES)
                .await?
                .unwrap_or_default(),
        );
        templates.resync_categories(&categories);

        let professors = Professors::new(
            storage
                .get_json_list::<Professor>(KEY_PROFESSORS)
                .await?
                .unwrap_or_default(),
        );

        // stored as a bare string, never JSON-encoded
        let sender_name = storage
            .get_raw(KEY_SENDER_NAME)
            .await?
            .unwrap_or_default();

        let signature = storage
            .get_json::<SignatureTemplate>(KEY_SIGNATURE)
            .await?
            .unwrap_or_default();

        tracing::info!(
            categories = categories.len(),
            templates = templates.len(),
            professors = professors.as_slice().len(),
            "state loaded"
        );

        Ok(Self {
            storage,
            state: AppState {
                categories: Categories::new(categories),
                templates,
                professors,
                sender_name,
                signature,
            },
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[cfg(test)]
    pub fn into_storage(self) -> Storage {
        self.storage
    }

    async fn persist_templates(&self) -> Result<()> {
        self.storage
            .set_json(KEY_TEMPLATES, self.state.templates.as_slice())
            .await
    }

    async fn persist_categories(&self) -> Result<()> {
        self.storage
            .set_json(KEY_CATEGORIES, self.state.categories.as_slice())
            .await
    }

    async fn persist_professors(&self) -> Result<()> {
        self.storage
            .set_json(KEY_PROFESSORS, self.state.professors.as_slice())
            .await
    }

    // === Professors ===

    pub async fn add_professor(&mut self, name: &str, email: &str) -> Result<Professor> {
        let professor = self.state.professors.add(name, email, now_ms())?;
        self.persist_professors().await?;
        Ok(professor)
    }

    pub async fn edit_professor(&mut self, id: &str, name: &str, email: &str) -> Result<Professor> {
        let professor = self.state.professors.edit(id, name, email)?;
        self.persist_professors().await?;
        Ok(professor)
    }

    pub async fn remove_professor(&mut self, id: &str) -> Result<bool> {
        if !self.state.professors.remove(id) {
            return Ok(false);
        }
        self.persist_professors().await?;
        Ok(true)
    }

    // === Categories ===

    pub async fn add_category(&mut self, name: &str, color: Option<&str>) -> Result<Category> {
        let category = self.state.categories.add(name, color, now_ms())?;
        self.persist_categories().await?;
        Ok(category)
    }

    pub async fn delete_category(&mut self, id: &str) -> Result<bool> {
        if !self.state.categories.delete(id, &self.state.templates)? {
            return Ok(false);
        }
        self.persist_categories().await?;
        Ok(true)
    }

    // === Templates ===

    /// Category to copy into a template: the named one, or the default for
    /// new templates.
    fn category_snapshot(&self, id: Option<&str>) -> Result<Category, StoreError> {
        match id {
            Some(id) => self.state.category(id).cloned(),
            None => Ok(self.state.categories.default_for_new()),
        }
    }

    pub async fn create_template(
        &mut self,
        title: &str,
        content: &str,
        category_id: Option<&str>,
    ) -> Result<Template> {
        let category = self.category_snapshot(category_id)?;
        let template = self
            .state
            .templates
            .create(title, content, category, now_ms())?;
        self.persist_templates().await?;
        Ok(template)
    }

    pub async fn update_template(
        &mut self,
        id: &str,
        title: Option<String>,
        content: Option<String>,
        category_id: Option<&str>,
    ) -> Result<Template> {
        let category = match category_id {
            Some(category_id) => Some(self.category_snapshot(Some(category_id))?),
            None => None,
        };
        let patch = TemplatePatch {
            title,
            content,
            category,
        };
        let template = self.state.templates.update(id, patch, now_ms())?;
        self.persist_templates().await?;
        Ok(template)
    }

    /// Create or update depending on whether `draft` already has an id.
    pub async fn save_template(&mut self, draft: Template) -> Result<Template> {
        let template = self.state.templates.save(draft, now_ms())?;
        self.persist_templates().await?;
        Ok(template)
    }

    pub async fn delete_template(&mut self, id: &str) -> Result<bool> {
        if !self.state.templates.delete(id) {
            return Ok(false);
        }
        self.persist_templates().await?;
        Ok(true)
    }

    pub async fn toggle_favorite(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(favorite) = self.state.templates.toggle_favorite(id) else {
            return Ok(None);
        };
        self.persist_templates().await?;
        Ok(Some(favorite))
    }

    /// Editor copy of a template: the stored one, or a fresh unsaved draft.
    pub fn editor_template(&self, id: Option<&str>) -> Result<Template, StoreError> {
        match id {
            Some(id) => self.state.template(id).cloned(),
            None => Ok(Template::draft(self.state.categories.default_for_new())),
        }
    }

    /// Write an AI draft into a template and save it.
    pub async fn save_draft(&mut self, template_id: Option<&str>, draft: Draft) -> Result<Template> {
        let mut template = self.editor_template(template_id)?;
        template.title = draft.title;
        template.content = draft.content;
        self.save_template(template).await
    }

    // === Sender / signature ===

    pub async fn set_sender_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("名前を入力してください".to_string()).into());
        }
        self.storage.set_raw(KEY_SENDER_NAME, name).await?;
        self.state.sender_name = name.to_string();
        Ok(())
    }

    pub async fn set_signature(&mut self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(
                StoreError::Validation("署名テンプレートを入力してください".to_string()).into(),
            );
        }
        let signature = SignatureTemplate {
            content: content.to_string(),
        };
        self.storage.set_json(KEY_SIGNATURE, &signature).await?;
        self.state.signature = signature;
        Ok(())
    }

    // === Rendering ===

    pub fn render_template(
        &self,
        template_id: &str,
        professor_id: Option<&str>,
        date: NaiveDate,
    ) -> Result<String, StoreError> {
        let template = self.state.template(template_id)?;
        let professor = professor_id.map(|id| self.state.professor(id)).transpose()?;
        let ctx = self.state.render_context(professor, date);
        Ok(render(&template.content, &ctx))
    }
}
