use super::ids::next_id;
use super::{Professor, StoreError, require};

const NAME_REQUIRED: &str = "教授の名前を入力してください";

#[derive(Debug, Clone, Default)]
pub struct Professors {
    items: Vec<Professor>,
}

impl Professors {
    pub fn new(items: Vec<Professor>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Professor] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Professor> {
        self.items.iter().find(|p| p.id == id)
    }

    pub fn add(&mut self, name: &str, email: &str, now_ms: i64) -> Result<Professor, StoreError> {
        require(name, NAME_REQUIRED)?;
        let professor = Professor {
            id: next_id(now_ms, |id| self.get(id).is_some()),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.items.push(professor.clone());
        tracing::debug!(id = %professor.id, "professor added");
        Ok(professor)
    }

    pub fn edit(&mut self, id: &str, name: &str, email: &str) -> Result<Professor, StoreError> {
        require(name, NAME_REQUIRED)?;
        let professor = self
            .items
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("professor", id))?;
        professor.name = name.to_string();
        professor.email = email.to_string();
        Ok(professor.clone())
    }

    /// Returns false when no professor had that id.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|p| p.id != id);
        self.items.len() != before
    }
}
