//! In-memory collections for professors, categories and templates.
//!
//! Each collection keeps insertion order and enforces its own invariants.
//! Nothing here performs I/O: callers persist the whole collection after a
//! mutation succeeds (see `session.rs`).

mod categories;
mod error;
mod ids;
mod professors;
mod templates;
mod types;

pub use categories::Categories;
pub use error::StoreError;
pub use professors::Professors;
pub use templates::{TemplatePatch, Templates};
pub use types::{Category, Professor, SignatureTemplate, Template};

/// Reject empty or whitespace-only input for a required field.
fn require(value: &str, message: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(message.to_string()));
    }
    Ok(())
}
