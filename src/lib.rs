//! # Regvm
//!
//! Backtracking regular-expression virtual machine over UTF-16 input.
//!
//! A compiled [`regprogram::Program`] is either a list of instructions
//! or one of a handful of whole-program fast paths. A
//! [`regexec::Matcher`] runs a program against an input, backtracking
//! through an explicit continuation stack instead of native recursion, so
//! deep patterns never overflow the thread stack and long matches can be
//! capped ([`regexec::set_match_stack_limit`]) or cancelled from the host
//! through a periodic query-continue callout.
//!
//! ## Quick Start
//!
//! ```rust
//! use regvm::prelude::*;
//! use regvm::reginst::{CharMixin, Inst};
//!
//! // ab
//! let mut b = ProgramBuilder::new("ab", RegexFlags::empty());
//! b.emit(Inst::MatchChar(CharMixin { c: b'a' as Char }));
//! b.emit(Inst::MatchChar(CharMixin { c: b'b' as Char }));
//! b.emit(Inst::Succ);
//! let re = Regex::new(b.finish().unwrap());
//!
//! let text: Vec<u16> = "xxab".encode_utf16().collect();
//! let m = re.find(&text).unwrap();
//! assert_eq!(m.range(), 2..4);
//! ```
//!
//! For direct control over execution state, drive a [`regexec::Matcher`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use regvm::prelude::*;
//!
//! let program = Arc::new(Program::bounded_word("\\b\\w+\\b", RegexFlags::empty()));
//! let mut m = Matcher::new(program);
//! let text: Vec<u16> = "  hi there".encode_utf16().collect();
//! assert!(m.match_at(&text, 0).unwrap());
//! assert_eq!(m.group_range(0), Some(2..4));
//! assert!(m.match_at(&text, 4).unwrap());
//! assert_eq!(m.group_range(0), Some(5..10));
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`regint`] | Core types, flags, count domains, global defaults |
//! | [`charset`] | Runtime character sets |
//! | [`chartrie`] | Literal-alternation tries |
//! | [`stdchars`] | Standard character classes and case equivalence |
//! | [`scanner`] | Literal scanners used by sync instructions |
//! | [`octoquad`] | Two-pattern, four-letter-alphabet fast path |
//! | [`reginst`] | Instruction set |
//! | [`regcont`] | Continuations, group/loop/assertion state, stacks |
//! | [`regprogram`] | Compiled program |
//! | [`regemit`] | Program builder and validation |
//! | [`regexec`] | Matcher and instruction execution |
//! | [`regstats`] | Execution counters |
//! | [`regdump`] | Program and matcher listings |
//! | [`api`] | `Regex`, `Match`, `Captures`, `FindIter` |

pub mod api;
pub mod charset;
pub mod chartrie;
pub mod error;
pub mod octoquad;
pub mod prelude;
pub mod regcont;
pub mod regdump;
pub mod regemit;
pub mod regexec;
pub mod reginst;
pub mod regint;
pub mod regprogram;
pub mod regstats;
pub mod scanner;
pub mod stdchars;
