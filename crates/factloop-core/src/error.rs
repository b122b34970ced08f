//! Error types for factloop

use std::time::Duration;
use thiserror::Error;

/// Compile-time failure of either template front-end. Fatal: reported before
/// any query reaches the store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("malformed query: {0}")]
    Malformed(String),

    #[error("query has no {fragment}")]
    MissingFragment { fragment: &'static str },

    #[error("unbalanced '{open}' opened at byte {at}")]
    Unbalanced { open: char, at: usize },

    #[error("variable {var} is used in the {clause} clause but never bound by the select clause")]
    UnboundVariable { var: String, clause: &'static str },

    #[error("{algorithm}: output characteristic {property} on {required} cannot be satisfied, no input or parameter has that type")]
    UnsatisfiableOutput {
        algorithm: String,
        property: String,
        required: String,
    },

    #[error("{algorithm}: {reason}")]
    Unsupported { algorithm: String, reason: String },

    #[error("template slot {0} was never filled")]
    UnfilledSlot(String),
}

/// Failure while binding one invocation's arguments or running its algorithm.
/// Scoped to one binding row: the row yields no results, the pass continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("{value} is a uri that is not referenced in the memory")]
    DanglingReference { value: String },

    #[error("{value} is deprecated")]
    Deprecated { value: String },

    #[error("cannot read '{value}' as {datatype}: {reason}")]
    Coercion {
        value: String,
        datatype: String,
        reason: String,
    },

    #[error("algorithm {algorithm} has no parameter '{name}'")]
    UnknownParameter { algorithm: String, name: String },

    #[error("parameter '{name}' expects {expected}")]
    WrongType { name: String, expected: &'static str },

    #[error("missing parameter '{0}'")]
    Missing(String),

    #[error("variable {0} is still unbound in the invocation")]
    UnboundVariable(String),

    #[error("no algorithm registered for {0}")]
    UnknownAlgorithm(String),

    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("{algorithm} failed: {message}")]
    Process { algorithm: String, message: String },

    #[error("?{var} is bound to blank node _:{id}, which an update cannot name again")]
    BlankNode { var: String, id: String },
}

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("no object stored at {0}")]
    NotStored(String),

    #[error("cannot walk {path}: {reason}")]
    Walk { path: String, reason: String },

    #[error("{first} and {second} would both be written to {file}")]
    FileCollision {
        file: String,
        first: String,
        second: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("update failed: {0}")]
    Update(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid term: {0}")]
    Term(String),

    #[error("load/dump failed: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("{0} is not a registered algorithm")]
    NotAnAlgorithm(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("no fixpoint after {passes} passes, the template set keeps producing facts")]
    Divergence { passes: usize },

    #[error("timed out after {limit:?} waiting for {what}")]
    Timeout { what: String, limit: Duration },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn timeout(what: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            limit,
        }
    }
}

impl BindingError {
    pub fn process(algorithm: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Process {
            algorithm: algorithm.into(),
            message: message.into(),
        }
    }
}
