use thiserror::Error;

/// Failures surfaced by store operations.
///
/// None of these are fatal: the collection is left exactly as it was before
/// the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A required field was empty or malformed
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Category still referenced by at least one template
    #[error("このカテゴリーは使用中のため削除できません ({category})")]
    InUse { category: String },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
