// prelude.rs - Convenient re-exports for building and running programs.
//
//! # Prelude
//!
//! ```
//! use regvm::prelude::*;
//!
//! let re = Regex::new(Program::single_char("x", RegexFlags::empty(), b'x' as Char));
//! assert_eq!(re.find_str("a x").as_deref(), Some("x"));
//! ```

pub use crate::api::{Captures, CapturesIter, FindIter, Match, Regex, RegexBuilder};
pub use crate::error::RegexError;
pub use crate::regemit::ProgramBuilder;
pub use crate::regexec::{Matcher, QueryContinueFn};
pub use crate::regint::{Char, CharCount, ChompMode, CountDomain, Label, RegexFlags};
pub use crate::regprogram::{Program, ProgramTag};
pub use crate::stdchars::{CaseEquivalence, SimpleCaseEquivalence};
