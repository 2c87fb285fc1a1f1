use std::fmt;

/// Location-carrying detail for parse failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDetails {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

/// Error types surfaced by the Ripple kernel
///
/// An unresolved symbol is deliberately *not* represented here: the
/// evaluator returns the symbol itself so partial resolution stays
/// representable, and the resolver retries once a binding exists.
#[derive(Debug, Clone, PartialEq)]
pub enum RippleError {
    /// Malformed source text, with line/column of the offending token
    Parse(Box<ParseDetails>),

    /// Inserting the named rule would create a dependency cycle
    Cycle(String),

    /// An expression without a key was handed to a keyed API
    EmptyKey,

    /// A non-function value was called; carries the actual type name
    NotFunction(String),

    /// Part access past the end of a table
    OutOfRange { index: usize, len: usize },

    /// Lookup of a name that is not present in a context
    Missing(String),

    /// Engine error without a more specific shape
    Engine(String),
}

impl RippleError {
    /// Create a parse error with source location
    pub fn parse(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::Parse(Box::new(ParseDetails {
            message: message.into(),
            line,
            col,
        }))
    }
}

impl fmt::Display for RippleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RippleError::Parse(details) => {
                write!(
                    f,
                    "Parse error: {} at {}:{}",
                    details.message, details.line, details.col
                )
            }
            RippleError::Cycle(name) => {
                write!(f, "Inserting '{}' would create a dependency cycle", name)
            }
            RippleError::EmptyKey => write!(f, "Expression has no key"),
            RippleError::NotFunction(type_name) => {
                write!(f, "Cannot call a value of type {}", type_name)
            }
            RippleError::OutOfRange { index, len } => {
                write!(f, "Part index {} out of range for {} parts", index, len)
            }
            RippleError::Missing(name) => write!(f, "No item named '{}'", name),
            RippleError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for RippleError {}
