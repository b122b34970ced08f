//! factloop - a forward-chaining rule engine over an RDF graph whose rules
//! call native algorithms.
//!
//! Core types are re-exported at the root; the other workspace members are
//! reachable as modules so callers can depend on a single package.

pub use factloop_algo as algo;
pub use factloop_engine as engine;
pub use factloop_memory as memory;

pub use factloop_core::*;
pub use factloop_engine::{Engine, RunReport};
