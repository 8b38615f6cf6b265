//! Target profile (ICP) documents.
//!
//! Profiles are structured data validated against JSON Schema, then
//! rendered into the scoring prompt.

mod document;
mod schema;

pub use document::{ProfileError, TargetProfile};
pub use schema::validate_profile_schema;
