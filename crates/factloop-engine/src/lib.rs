//! factloop engine - template compilers, the interpreter and fixpoint drivers
//!
//! Both compiler front-ends ([`textual`] and [`compiler`]) produce a plain
//! [`CompiledTemplate`]; the [`Engine`] runs templates against its graph
//! store without knowing where they came from.

pub mod bulk;
pub mod classify;
pub mod compiler;
pub mod context;
pub mod fixpoint;
pub mod interpreter;
pub mod invocation;
pub mod lexer;
pub mod ontology;
pub mod report;
pub mod store;
pub mod template;
pub mod textual;

pub use bulk::distance_class;
pub use classify::{classification_queries, classification_query, ROOT_INFERENCE};
pub use compiler::compile_descriptor;
pub use context::Engine;
pub use fixpoint::{compile_replay, split_queries};
pub use invocation::Invocation;
pub use ontology::Ontology;
pub use report::{Mode, Outcome, RunOutcome, RunReport, TemplateStats};
pub use store::{GraphStore, OxigraphStore};
pub use template::{CompiledTemplate, Pending};
pub use textual::compile_text;
