//! Error types for the compiler's one recoverable failure path.
//!
//! Per spec.md §7, IR invariant violations are programmer errors in the
//! upstream producer and surface as panics (see `QCode::check_invariants`
//! and `Exp::check_invariants`), never as a `CompileError`. The only
//! recoverable condition is a dialect being asked to render a construct it
//! cannot express.
use thiserror::Error;

use crate::registry::DialectName;
use crate::types::Op;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unsupported operator {op:?} for dialect {dialect:?}")]
    Unsupported { dialect: DialectName, op: Op },

    /// A construct that came from caller input (not this crate's own IR)
    /// failed to decode — e.g. a malformed cursor token. Distinct from the
    /// panic-on-IR-bug path because the caller, not the compiler, is at fault.
    #[error("invalid input: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;
