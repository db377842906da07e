// error.rs - Error types for program assembly and matching.
//
// Ordinary non-match is not an error: `Matcher::match_at` reports it as
// `Ok(false)`. Everything here is either a control escape out of a match
// (memory, stack limit, cancellation) or a malformed program.

use std::collections::TryReserveError;
use std::fmt;

/// Error type for program assembly and matching operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    /// A continuation/assertion stack or per-match table could not grow.
    Memory,
    /// The configured continuation-stack limit was exceeded.
    MatchStackLimitOver,
    /// The query-continue callout asked the match to stop.
    Cancelled,
    /// The input is longer than the largest representable offset.
    InputTooLong,
    /// The program builder rejected the program.
    InvalidProgram { message: String },
    /// An instruction or continuation did not have the expected shape at run time.
    InternalBug { message: String },
}

impl RegexError {
    pub(crate) fn invalid_program(message: impl Into<String>) -> Self {
        RegexError::InvalidProgram {
            message: message.into(),
        }
    }

    pub(crate) fn internal_bug(message: impl Into<String>) -> Self {
        RegexError::InternalBug {
            message: message.into(),
        }
    }

    /// True for the control escapes that abort a match in progress.
    pub fn is_match_abort(&self) -> bool {
        matches!(
            self,
            RegexError::Memory | RegexError::MatchStackLimitOver | RegexError::Cancelled
        )
    }
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexError::Memory => write!(f, "memory allocation failed"),
            RegexError::MatchStackLimitOver => write!(f, "match-stack limit over"),
            RegexError::Cancelled => write!(f, "match cancelled by query-continue"),
            RegexError::InputTooLong => write!(f, "input too long"),
            RegexError::InvalidProgram { message } => write!(f, "invalid program: {}", message),
            RegexError::InternalBug { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for RegexError {}

impl From<TryReserveError> for RegexError {
    fn from(_: TryReserveError) -> Self {
        RegexError::Memory
    }
}
