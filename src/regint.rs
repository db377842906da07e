// regint.rs - Internal types shared by the program, instructions and matcher.
//
// Character/count aliases, instruction labels, the CountDomain repetition
// interval, regex flags and the escalation modes used by hard failures.

use std::fmt;

use bitflags::bitflags;

// === Character and Count Types ===

/// One UTF-16 code unit of input.
pub type Char = u16;
/// An offset into, or a length within, the input or the literal buffer.
pub type CharCount = u32;
/// A count that may also hold [`CHAR_COUNT_FLAG`] meaning "unbounded".
pub type CharCountOrFlag = u32;

pub const CHAR_COUNT_FLAG: CharCountOrFlag = u32::MAX;
pub const MAX_CHAR_COUNT: CharCount = u32::MAX - 1;
pub const MAX_UCHAR: u32 = u16::MAX as u32;

/// Number of code units stored per literal position for equivalence-class literals.
pub const EQUIV_CLASS_SIZE: usize = 4;
/// Upper bound on the literals a single multi-literal sync instruction scans for.
pub const MAX_NUM_SYNC_LITERALS: usize = 4;
pub const SWITCH_10_MAX_CASES: usize = 10;
pub const SWITCH_20_MAX_CASES: usize = 20;
pub const INIT_CONT_STACK_SIZE: usize = 160;
pub const INIT_ASSERTION_STACK_SIZE: usize = 8;

// === Tunable Defaults ===
pub const DEFAULT_TICKS_PER_QC: u32 = 1 << 12;
pub const DEFAULT_TICKS_PER_QC_TIME_CHECK: u32 = 1 << 16;
pub const DEFAULT_TIME_PER_QC_MSEC: u64 = 1000;
pub const DEFAULT_MATCH_STACK_LIMIT: u32 = 0;

// ============================================================================
// Label
// ============================================================================

/// Stable address of an instruction inside a program's instruction arena.
///
/// Labels are never relocated once emitted, so they can be stored in
/// continuations and compared across the whole match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Label(pub u32);

impl Label {
    pub const START: Label = Label(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The instruction immediately following this one.
    #[inline]
    pub fn next(self) -> Label {
        Label(self.0 + 1)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{:04}", self.0)
    }
}

// ============================================================================
// CountDomain
// ============================================================================

/// Interval `[lower, upper]` of repetition counts; `upper` may be unbounded.
///
/// Arithmetic never wraps: lower bounds saturate at [`MAX_CHAR_COUNT`] and
/// upper bounds saturate to unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountDomain {
    pub lower: CharCount,
    pub upper: CharCountOrFlag,
}

impl CountDomain {
    pub const fn new(lower: CharCount, upper: CharCountOrFlag) -> Self {
        CountDomain { lower, upper }
    }

    pub const fn exactly(n: CharCount) -> Self {
        CountDomain { lower: n, upper: n }
    }

    pub const fn at_least(lower: CharCount) -> Self {
        CountDomain { lower, upper: CHAR_COUNT_FLAG }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.upper == CHAR_COUNT_FLAG || self.lower <= self.upper
    }

    #[inline]
    pub fn could_match_empty(&self) -> bool {
        self.lower == 0
    }

    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.upper == CHAR_COUNT_FLAG
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    #[inline]
    pub fn is_exact(&self, n: CharCount) -> bool {
        self.lower == n && self.upper == n
    }

    /// Every count in `self` is strictly greater than every count in `other`.
    #[inline]
    pub fn is_greater_than(&self, other: &CountDomain) -> bool {
        other.upper != CHAR_COUNT_FLAG && self.lower > other.upper
    }

    /// Every count in `self` is strictly less than every count in `other`.
    #[inline]
    pub fn is_less_than(&self, other: &CountDomain) -> bool {
        self.upper != CHAR_COUNT_FLAG && self.upper < other.lower
    }

    /// Least upper bound: the smallest interval covering both.
    pub fn lub(self, other: CountDomain) -> CountDomain {
        let lower = self.lower.min(other.lower);
        let upper = if self.is_unbounded() || other.is_unbounded() {
            CHAR_COUNT_FLAG
        } else {
            self.upper.max(other.upper)
        };
        CountDomain { lower, upper }
    }

    /// Interval of `a + b` for `a` in `self` and `b` in `other`.
    pub fn add(self, other: CountDomain) -> CountDomain {
        let lower = clamp_lower(self.lower.checked_add(other.lower));
        let upper = if self.is_unbounded() || other.is_unbounded() {
            CHAR_COUNT_FLAG
        } else {
            self.upper.checked_add(other.upper).unwrap_or(CHAR_COUNT_FLAG)
        };
        CountDomain { lower, upper }
    }

    /// Interval of `a - b` for `a` in `self` and `b` in `other`, floored at zero.
    pub fn sub(self, other: CountDomain) -> CountDomain {
        let lower = if other.is_unbounded() || other.upper > self.lower {
            0
        } else {
            self.lower - other.upper
        };
        let upper = if self.is_unbounded() {
            CHAR_COUNT_FLAG
        } else if other.lower > self.upper {
            0
        } else {
            self.upper - other.lower
        };
        CountDomain { lower, upper }
    }

    /// Interval of `a * b` for `a` in `self` and `b` in `other`.
    pub fn mult(self, other: CountDomain) -> CountDomain {
        let lower = clamp_lower(self.lower.checked_mul(other.lower));
        let upper = if self.is_unbounded() || other.is_unbounded() {
            CHAR_COUNT_FLAG
        } else {
            self.upper.checked_mul(other.upper).unwrap_or(CHAR_COUNT_FLAG)
        };
        CountDomain { lower, upper }
    }
}

#[inline]
fn clamp_lower(n: Option<CharCount>) -> CharCount {
    n.map_or(MAX_CHAR_COUNT, |n| n.min(MAX_CHAR_COUNT))
}

impl fmt::Display for CountDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "[{}-*]", self.lower)
        } else {
            write!(f, "[{}-{}]", self.lower, self.upper)
        }
    }
}

// ============================================================================
// Flags and Modes
// ============================================================================

bitflags! {
    /// Pattern flags recorded on the program.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RegexFlags: u8 {
        const IGNORE_CASE = 1 << 0;
        const GLOBAL = 1 << 1;
        const MULTILINE = 1 << 2;
        const UNICODE = 1 << 3;
        const STICKY = 1 << 4;
        const DOT_ALL = 1 << 5;
    }
}

/// Which case-equivalence table backs case-insensitive comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingSource {
    /// Unicode simple case folding (patterns with the unicode flag).
    CaseFolding,
    /// Legacy upper/lower mappings from the character database.
    UnicodeData,
}

/// How a failing instruction escalates past ordinary backtracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardFailMode {
    /// Ordinary failure: backtrack, then try later start offsets.
    BacktrackAndLater,
    /// Backtrack locally but never try a later start offset.
    BacktrackOnly,
    /// Skip local backtracking and move straight to the next start offset.
    LaterOnly,
    /// Abandon the whole match call.
    ImmediateFail,
}

/// Repetition shape of a chomp instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChompMode {
    Star,
    Plus,
}

impl ChompMode {
    #[inline]
    pub fn min_count(self) -> CharCount {
        match self {
            ChompMode::Star => 0,
            ChompMode::Plus => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChompMode::Star => "Star",
            ChompMode::Plus => "Plus",
        }
    }
}
