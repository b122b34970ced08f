//! factloop core - terms, vocabulary, data model, configuration and error kinds
//!
//! Every other crate in the workspace speaks in these types. Nothing here
//! touches a store or runs an algorithm.

pub mod config;
pub mod error;
pub mod types;
pub mod vocab;

pub use config::EngineConfig;
pub use error::{BindingError, Error, MemoryError, RegistryError, Result, StoreError, TemplateError};
pub use types::*;
pub use vocab::{local_name, Namespaces};
