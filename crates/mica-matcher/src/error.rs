use std::fmt;

/// Selector compilation error.
///
/// Every variant is produced at compile time; matching a compiled selector
/// cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherError {
    /// The selector tree itself is malformed (bad top-level value, bad
    /// logical-operator shape, inconsistent operator keys).
    InvalidSelector(String),
    /// A `$`-prefixed key that is not a known operator.
    UnknownOperator(String),
    /// A known operator with an operand of the wrong type or shape.
    InvalidOperand(String),
    /// A known operator used somewhere it is not allowed.
    OperatorContext(String),
}

impl fmt::Display for MatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatcherError::InvalidSelector(msg) => write!(f, "invalid selector: {msg}"),
            MatcherError::UnknownOperator(msg) => write!(f, "unrecognized operator: {msg}"),
            MatcherError::InvalidOperand(msg) => write!(f, "invalid operand: {msg}"),
            MatcherError::OperatorContext(msg) => write!(f, "misplaced operator: {msg}"),
        }
    }
}

impl std::error::Error for MatcherError {}
