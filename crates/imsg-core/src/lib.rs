//! imsg-core — domain logic for the imsg chat.db reader.
//!
//! This crate owns read-only access to the Messages database, the schema
//! capability probe, attributed-body text extraction, and the tapback
//! classifier/resolver.

pub mod db;
pub mod error;
pub mod schema;
pub mod tapback;
pub mod typedstream;

pub use error::{CoreError, CoreResult};
pub use schema::Capabilities;
