//! Page identifier generation.

use crate::Result;
use uuid::Uuid;

/// Source of opaque, unique page IDs.
///
/// Implementations must never hand out the same ID twice and must not
/// return the reserved root ID `"root"`.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LeafTreeError::IdGeneration`] if no ID can be produced.
    fn generate(&self) -> Result<String>;
}

/// Default generator producing random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}
