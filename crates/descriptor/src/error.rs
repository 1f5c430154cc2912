use thiserror::Error;

/// A string that does not follow the descriptor/signature grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed descriptor {descriptor:?} at offset {offset}: {reason}")]
pub struct MalformedDescriptor {
    pub descriptor: String,
    pub offset: usize,
    pub reason: &'static str,
}
