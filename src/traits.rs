//! Core traits shared by stored entities

use crate::error::ValidationError;

/// Trait for entities that carry their own invariants
pub trait Validate {
    /// Validate the entity for consistency and correctness
    fn validate(&self) -> Result<(), ValidationError>;
}
