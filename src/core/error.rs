//! Error types for allocation and query operations.

use thiserror::Error;

/// Errors produced by the allocation service.
///
/// Permanent errors must not be blindly retried by clients; a `Queued`
/// response is a success outcome, never an error.
#[derive(Debug, Error)]
pub enum AllocatorError {
    /// Malformed request shape (missing ID, wrong topology count, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// No unit in the inventory could ever satisfy the request.
    #[error(
        "wanted {wanted} topologies, matched {matched}: impossible to match against \
         inventory. This is a permanent failure, not an availability failure."
    )]
    Infeasible {
        /// Number of topologies requested.
        wanted: usize,
        /// Number of topologies with at least one structural match.
        matched: usize,
    },
    /// No unit advertises the named topology.
    #[error("unknown unit name: {0}")]
    UnknownUnit(String),
    /// The invocation ID is neither allocated nor queued.
    #[error("invocation_id not found: {0:?}")]
    UnknownInvocation(String),
    /// Internal invariant failure with context.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AllocatorError {
    /// Whether this error is a permanent/client error that must not be
    /// retried as-is.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::InvalidRequest(_)
            | Self::Infeasible { .. }
            | Self::UnknownUnit(_)
            | Self::UnknownInvocation(_) => true,
            Self::Internal(_) => false,
        }
    }
}

/// Errors produced by the query evaluator, naming the offending token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// An operator was applied to fewer operands than its arity requires.
    #[error("not enough operands for {0:?}")]
    MissingOperands(String),
    /// A binary AND/OR mixed a raw leaf with an already-reduced result.
    #[error("operands for {0:?} must be both leaves or both sub-results")]
    MixedOperands(String),
    /// NOT was applied to a bare leaf instead of a reducible compound.
    #[error("{0:?} must apply to a compound expression, not a bare leaf")]
    BareLeaf(String),
    /// The expression did not reduce to exactly one boolean.
    #[error("malformed expression: did not reduce to a single boolean (stack size {0})")]
    Unreduced(usize),
    /// A comparison referenced an attribute the unit does not have.
    #[error("unknown field: {0:?}")]
    UnknownField(String),
    /// A constant could not be converted to a comparable value.
    #[error("cannot type constant {0:?}")]
    BadConstant(String),
    /// Left and right sides of a comparison have incompatible types.
    #[error("type mismatch comparing {field:?} with {constant:?}")]
    TypeMismatch {
        /// Field side of the comparison.
        field: String,
        /// Constant side of the comparison.
        constant: String,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
