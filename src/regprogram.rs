// regprogram.rs - Immutable compiled program.
//
// A Program is either an instruction list plus literal buffer, or one of
// the whole-program fast paths the matcher runs without the VM. Programs
// are built by `regemit::ProgramBuilder` or the fast-path constructors
// below and shared read-only between any number of matchers.

use crate::octoquad::OctoquadMatcher;
use crate::reginst::Inst;
use crate::regint::{Char, CharCount, Label, MappingSource, RegexFlags};

/// Selects how the matcher drives a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramTag {
    /// Instruction list, tried at every start offset.
    Instructions,
    /// Instruction list anchored at the beginning of input.
    BoiInstructions,
    /// Instruction list tried only at the requested start offset.
    BoiInstructionsForStickyFlag,
    SingleChar,
    BoundedWord,
    LeadingTrailingSpaces,
    Octoquad,
    BoiLiteral2,
}

impl ProgramTag {
    #[inline]
    pub fn is_instructions(self) -> bool {
        matches!(
            self,
            ProgramTag::Instructions
                | ProgramTag::BoiInstructions
                | ProgramTag::BoiInstructionsForStickyFlag
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ProgramTag::Instructions => "Instructions",
            ProgramTag::BoiInstructions => "BOIInstructions",
            ProgramTag::BoiInstructionsForStickyFlag => "BOIInstructionsForStickyFlag",
            ProgramTag::SingleChar => "SingleChar",
            ProgramTag::BoundedWord => "BoundedWord",
            ProgramTag::LeadingTrailingSpaces => "LeadingTrailingSpaces",
            ProgramTag::Octoquad => "Octoquad",
            ProgramTag::BoiLiteral2 => "BOILiteral2",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramRep {
    Instructions {
        insts: Vec<Inst>,
        litbuf: Vec<Char>,
        num_sync_literal_scanners: usize,
    },
    SingleChar {
        c: Char,
    },
    BoundedWord,
    LeadingTrailingSpaces {
        begin_min_match: CharCount,
        end_min_match: CharCount,
    },
    Octoquad(Box<OctoquadMatcher>),
    BoiLiteral2 {
        literal: [Char; 2],
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    source: String,
    flags: RegexFlags,
    num_groups: usize,
    num_loops: usize,
    tag: ProgramTag,
    rep: ProgramRep,
}

impl Program {
    pub(crate) fn from_parts(
        source: String,
        flags: RegexFlags,
        num_groups: usize,
        num_loops: usize,
        tag: ProgramTag,
        rep: ProgramRep,
    ) -> Self {
        debug_assert!(num_groups >= 1);
        Program {
            source,
            flags,
            num_groups,
            num_loops,
            tag,
            rep,
        }
    }

    fn fast_path(source: &str, flags: RegexFlags, tag: ProgramTag, rep: ProgramRep) -> Self {
        Self::from_parts(source.to_string(), flags, 1, 0, tag, rep)
    }

    // === Fast-path constructors ===

    /// One character, compared case-insensitively when `IGNORE_CASE` is set.
    pub fn single_char(source: &str, flags: RegexFlags, c: Char) -> Self {
        Self::fast_path(source, flags, ProgramTag::SingleChar, ProgramRep::SingleChar { c })
    }

    /// `\b\w+\b`
    pub fn bounded_word(source: &str, flags: RegexFlags) -> Self {
        Self::fast_path(source, flags, ProgramTag::BoundedWord, ProgramRep::BoundedWord)
    }

    /// `^\s{n,}|\s{m,}$` without the multiline flag.
    pub fn leading_trailing_spaces(
        source: &str,
        flags: RegexFlags,
        begin_min_match: CharCount,
        end_min_match: CharCount,
    ) -> Self {
        Self::fast_path(
            source,
            flags,
            ProgramTag::LeadingTrailingSpaces,
            ProgramRep::LeadingTrailingSpaces {
                begin_min_match,
                end_min_match,
            },
        )
    }

    pub fn octoquad(source: &str, flags: RegexFlags, matcher: OctoquadMatcher) -> Self {
        Self::fast_path(
            source,
            flags,
            ProgramTag::Octoquad,
            ProgramRep::Octoquad(Box::new(matcher)),
        )
    }

    /// Two-character literal anchored at the beginning of input.
    pub fn boi_literal2(source: &str, flags: RegexFlags, literal: [Char; 2]) -> Self {
        Self::fast_path(
            source,
            flags,
            ProgramTag::BoiLiteral2,
            ProgramRep::BoiLiteral2 { literal },
        )
    }

    // === Accessors ===

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    /// Number of capture groups, group 0 included.
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn num_loops(&self) -> usize {
        self.num_loops
    }

    pub fn tag(&self) -> ProgramTag {
        self.tag
    }

    pub fn rep(&self) -> &ProgramRep {
        &self.rep
    }

    #[inline]
    pub fn is_ignore_case(&self) -> bool {
        self.flags.contains(RegexFlags::IGNORE_CASE)
    }

    pub fn case_mapping_source(&self) -> MappingSource {
        if self.flags.contains(RegexFlags::UNICODE) {
            MappingSource::CaseFolding
        } else {
            MappingSource::UnicodeData
        }
    }

    /// Instruction list; empty for fast-path programs.
    #[inline]
    pub fn insts(&self) -> &[Inst] {
        match &self.rep {
            ProgramRep::Instructions { insts, .. } => insts,
            _ => &[],
        }
    }

    #[inline]
    pub fn litbuf(&self) -> &[Char] {
        match &self.rep {
            ProgramRep::Instructions { litbuf, .. } => litbuf,
            _ => &[],
        }
    }

    #[inline]
    pub fn inst(&self, label: Label) -> Option<&Inst> {
        self.insts().get(label.index())
    }

    pub fn num_sync_literal_scanners(&self) -> usize {
        match &self.rep {
            ProgramRep::Instructions {
                num_sync_literal_scanners,
                ..
            } => *num_sync_literal_scanners,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_programs_have_only_group_zero() {
        let program = Program::single_char("a", RegexFlags::IGNORE_CASE, b'a' as Char);
        assert_eq!(program.tag(), ProgramTag::SingleChar);
        assert_eq!(program.num_groups(), 1);
        assert_eq!(program.num_loops(), 0);
        assert!(program.insts().is_empty());
        assert!(program.is_ignore_case());
        assert_eq!(program.source(), "a");
    }

    #[test]
    fn mapping_source_follows_unicode_flag() {
        let legacy = Program::bounded_word("\\b\\w+\\b", RegexFlags::empty());
        assert_eq!(legacy.case_mapping_source(), MappingSource::UnicodeData);
        let unicode = Program::bounded_word("\\b\\w+\\b", RegexFlags::UNICODE);
        assert_eq!(unicode.case_mapping_source(), MappingSource::CaseFolding);
    }

    #[test]
    fn tag_names() {
        assert!(ProgramTag::BoiInstructions.is_instructions());
        assert!(!ProgramTag::Octoquad.is_instructions());
        assert_eq!(ProgramTag::BoiLiteral2.name(), "BOILiteral2");
    }
}
