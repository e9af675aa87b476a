use thiserror::Error;

/// An Error enum capturing the errors produced by this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Modulus is not a power of two
    #[error("order must be a power of two >= 2, got {0}")]
    InvalidOrder(u64),
    /// Match ratio outside its valid range
    #[error("match ratio must be in [0, 1), got {0}")]
    InvalidMatchRatio(f64),
    /// Operands live in different rings
    #[error("share sets use different orders ({0} vs {1})")]
    OrderMismatch(u64, u64),
    /// A scalar share set was expected
    #[error("expected a scalar share set")]
    NotScalar,
    /// A vector share set was expected
    #[error("expected a vector share set")]
    NotVector,
    /// Vector operands of different lengths
    #[error("vector lengths differ ({0} vs {1})")]
    LengthMismatch(usize, usize),
    /// A scalar share set must hold exactly two of its three slots
    #[error("share set holds {0} of 3 slots, expected 2")]
    MalformedShareSet(usize),
    /// Local products need both operands held by the same party
    #[error("operands are held by different parties")]
    PartyMismatch,
    /// Two share sets that should jointly cover all three slots do not
    #[error("share sets do not cover slot {0}")]
    IncompleteReconstruction(usize),
    /// Invalid party id provided
    #[error("invalid party id {0}")]
    Id(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
