use thiserror::Error;

/// Validation errors for configuration and state invariants.
///
/// These are fatal: a game carrying any of them cannot be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Phase name not part of the phase order.
    #[error("unknown phase: {0}")]
    UnknownPhase(String),
    /// Configuration value outside its accepted range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Config text could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Two entities share an identifier.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// Entity refers to something that does not exist.
    #[error("dangling reference: {0}")]
    DanglingReference(String),
    /// Stock price is not a grid value.
    #[error("stock price {price} of {company} is not on the price grid")]
    OffGridStockPrice { company: String, price: String },
    /// Worker counts do not add up.
    #[error("workforce inconsistent: {0}")]
    Workforce(String),
    /// Factory breaks the size table or slot rules.
    #[error("invalid factory {0}")]
    InvalidFactory(String),
}
