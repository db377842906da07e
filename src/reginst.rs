// reginst.rs - Instruction set of the matcher.
//
// Instructions are a closed enum stored in the program's instruction
// arena and addressed by `Label`. Payloads are assembled from small
// reusable mixins (a char, a set, a literal-buffer span, a group id, a
// jump target, ...). Execution lives in regexec.rs; this module only
// describes the data.

use std::ops::Range;

use smallvec::SmallVec;

use crate::charset::RuntimeCharSet;
use crate::chartrie::RuntimeCharTrie;
use crate::regint::{Char, CharCount, ChompMode, CountDomain, Label, EQUIV_CLASS_SIZE, SWITCH_20_MAX_CASES};
use crate::scanner::{Char2LiteralScanner, ScannerInfos, TextbookBoyerMoore, TextbookBoyerMooreWithLinearMap};

pub type GroupId = usize;
pub type LoopId = usize;

/// Inclusive range of group ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupRange {
    pub from: GroupId,
    pub to: GroupId,
}

impl GroupRange {
    pub fn new(from: GroupId, to: GroupId) -> Self {
        debug_assert!(from <= to);
        GroupRange { from, to }
    }

    pub fn single(id: GroupId) -> Self {
        GroupRange { from: id, to: id }
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<GroupId> {
        self.from..=self.to
    }
}

// ============================================================================
// Mixins
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharMixin {
    pub c: Char,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Char2Mixin {
    pub cs: [Char; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Char3Mixin {
    pub cs: [Char; 3],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Char4Mixin {
    pub cs: [Char; 4],
}

/// Span of the literal buffer. Equivalence-class literals occupy
/// `length * EQUIV_CLASS_SIZE` code units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiteralMixin {
    pub offset: CharCount,
    pub length: CharCount,
}

impl LiteralMixin {
    #[inline]
    pub fn span(&self) -> Range<usize> {
        self.offset as usize..(self.offset + self.length) as usize
    }

    #[inline]
    pub fn equiv_span(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize * EQUIV_CLASS_SIZE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetMixin {
    pub set: RuntimeCharSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieMixin {
    pub trie: RuntimeCharTrie,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Char2LiteralScannerMixin {
    pub literal: LiteralMixin,
    pub scanner: Char2LiteralScanner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannerMixin {
    pub literal: LiteralMixin,
    pub scanner: TextbookBoyerMoore,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearScannerMixin {
    pub literal: LiteralMixin,
    pub scanner: TextbookBoyerMooreWithLinearMap,
}

/// Scanner over an equivalence-class literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquivScannerMixin {
    pub literal: LiteralMixin,
    pub scanner: TextbookBoyerMoore,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannersMixin {
    pub infos: ScannerInfos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackupMixin {
    pub backup: CountDomain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardFailMixin {
    pub can_hard_fail: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupMixin {
    pub group_id: GroupId,
}

/// Set when backtracking can provably never re-enter the group, so no
/// undo continuation is needed after binding it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoNeedToSaveMixin {
    pub no_need_to_save: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedLengthMixin {
    pub length: CharCount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChompBoundedMixin {
    pub repeats: CountDomain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JumpMixin {
    pub target_label: Label,
}

/// Groups defined strictly inside a loop or assertion body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BodyGroupsMixin {
    pub body_groups: Option<GroupRange>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeginLoopMixin {
    pub loop_id: LoopId,
    pub repeats: CountDomain,
    /// Loop is nested in another loop, so its LoopInfo must be restored on backtrack.
    pub has_outer_loops: bool,
    /// Body may leave choicepoints behind after an iteration completes.
    pub has_inner_nondet: bool,
    pub exit_label: Label,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopSetMixin {
    pub loop_id: LoopId,
    pub repeats: CountDomain,
    pub has_outer_loops: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatLoopMixin {
    pub begin_label: Label,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TryMixin {
    pub fail_label: Label,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchCase {
    pub c: Char,
    pub target_label: Label,
}

/// Cases sorted by character.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SwitchMixin {
    pub cases: SmallVec<[SwitchCase; SWITCH_20_MAX_CASES]>,
}

impl SwitchMixin {
    pub fn new(mut cases: Vec<SwitchCase>) -> Self {
        cases.sort_by_key(|case| case.c);
        SwitchMixin {
            cases: cases.into_iter().collect(),
        }
    }

    #[inline]
    pub fn lookup(&self, c: Char) -> Option<Label> {
        self.cases
            .binary_search_by_key(&c, |case| case.c)
            .ok()
            .map(|idx| self.cases[idx].target_label)
    }
}

// ============================================================================
// Sync targets
// ============================================================================

/// What a sync instruction scans ahead for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncTarget {
    Char(CharMixin),
    Char2Set(Char2Mixin),
    Set(SetMixin),
    NegatedSet(SetMixin),
    Char2Literal(Char2LiteralScannerMixin),
    Literal(ScannerMixin),
    LinearLiteral(LinearScannerMixin),
    LiteralEquiv(EquivScannerMixin),
    LiteralEquivTrivialLastPatChar(EquivScannerMixin),
}

impl SyncTarget {
    /// Code units consumed by the `Consume` form once synced.
    pub fn consume_length(&self) -> CharCount {
        match self {
            SyncTarget::Char(_)
            | SyncTarget::Char2Set(_)
            | SyncTarget::Set(_)
            | SyncTarget::NegatedSet(_) => 1,
            SyncTarget::Char2Literal(_) => 2,
            SyncTarget::Literal(m) => m.literal.length,
            SyncTarget::LinearLiteral(m) => m.literal.length,
            SyncTarget::LiteralEquiv(m) | SyncTarget::LiteralEquivTrivialLastPatChar(m) => {
                m.literal.length
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SyncTarget::Char(_) => "Char",
            SyncTarget::Char2Set(_) => "Char2Set",
            SyncTarget::Set(_) => "Set",
            SyncTarget::NegatedSet(_) => "NegatedSet",
            SyncTarget::Char2Literal(_) => "Char2Literal",
            SyncTarget::Literal(_) => "Literal",
            SyncTarget::LinearLiteral(_) => "LinearLiteral",
            SyncTarget::LiteralEquiv(_) => "LiteralEquiv",
            SyncTarget::LiteralEquivTrivialLastPatChar(_) => "LiteralEquivTrivialLastPatChar",
        }
    }

    fn literal(&self) -> Option<(LiteralMixin, bool)> {
        match self {
            SyncTarget::Char2Literal(m) => Some((m.literal, false)),
            SyncTarget::Literal(m) => Some((m.literal, false)),
            SyncTarget::LinearLiteral(m) => Some((m.literal, false)),
            SyncTarget::LiteralEquiv(m) | SyncTarget::LiteralEquivTrivialLastPatChar(m) => {
                Some((m.literal, true))
            }
            _ => None,
        }
    }
}

// ============================================================================
// Inst
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
    // === Control flow ===
    Fail,
    Succ,
    Jump(JumpMixin),
    JumpIfNotChar(CharMixin, JumpMixin),
    MatchCharOrJump(CharMixin, JumpMixin),
    JumpIfNotSet(SetMixin, JumpMixin),
    MatchSetOrJump(SetMixin, JumpMixin),
    Switch10(SwitchMixin),
    Switch20(SwitchMixin),
    SwitchAndConsume10(SwitchMixin),
    SwitchAndConsume20(SwitchMixin),

    // === Built-in assertions ===
    BoiTest(HardFailMixin),
    EoiTest(HardFailMixin),
    BolTest,
    EolTest,
    WordBoundaryTest { is_negation: bool },

    // === Matching ===
    MatchChar(CharMixin),
    MatchChar2(Char2Mixin),
    MatchChar3(Char3Mixin),
    MatchChar4(Char4Mixin),
    MatchSet(SetMixin),
    MatchNegatedSet(SetMixin),
    MatchLiteral(LiteralMixin),
    MatchLiteralEquiv(LiteralMixin),
    MatchTrie(TrieMixin),
    OptMatchChar(CharMixin),
    OptMatchSet(SetMixin),

    // === Synchronization ===
    SyncToAndContinue(SyncTarget),
    SyncToAndConsume(SyncTarget),
    SyncToAndBackup(SyncTarget, BackupMixin),
    SyncToLiteralsAndBackup(ScannersMixin, BackupMixin),

    // === Groups ===
    MatchGroup(GroupMixin),
    BeginDefineGroup(GroupMixin),
    EndDefineGroup(GroupMixin, NoNeedToSaveMixin),
    DefineGroupFixed(GroupMixin, FixedLengthMixin, NoNeedToSaveMixin),

    // === Loops ===
    BeginLoop {
        begin: BeginLoopMixin,
        body: BodyGroupsMixin,
        is_greedy: bool,
    },
    RepeatLoop(RepeatLoopMixin),
    BeginLoopIfChar {
        c: CharMixin,
        begin: BeginLoopMixin,
        body: BodyGroupsMixin,
    },
    RepeatLoopIfChar(RepeatLoopMixin),
    BeginLoopIfSet {
        set: SetMixin,
        begin: BeginLoopMixin,
        body: BodyGroupsMixin,
    },
    RepeatLoopIfSet(RepeatLoopMixin),
    BeginLoopFixed {
        begin: BeginLoopMixin,
        length: FixedLengthMixin,
    },
    RepeatLoopFixed(RepeatLoopMixin),
    LoopSet {
        set: SetMixin,
        lp: LoopSetMixin,
    },
    LoopSetWithFollowFirst {
        set: SetMixin,
        lp: LoopSetMixin,
        follow_first: Char,
    },
    BeginLoopFixedGroupLastIteration {
        begin: BeginLoopMixin,
        length: FixedLengthMixin,
        group: GroupMixin,
        save: NoNeedToSaveMixin,
    },
    RepeatLoopFixedGroupLastIteration(RepeatLoopMixin),
    BeginGreedyLoopNoBacktrack {
        loop_id: LoopId,
        exit_label: Label,
    },
    RepeatGreedyLoopNoBacktrack(RepeatLoopMixin),

    // === Chomp ===
    ChompChar(CharMixin, ChompMode),
    ChompSet(SetMixin, ChompMode),
    ChompCharGroup {
        c: CharMixin,
        group: GroupMixin,
        save: NoNeedToSaveMixin,
        mode: ChompMode,
    },
    ChompSetGroup {
        set: SetMixin,
        group: GroupMixin,
        save: NoNeedToSaveMixin,
        mode: ChompMode,
    },
    ChompCharBounded(CharMixin, ChompBoundedMixin),
    ChompSetBounded(SetMixin, ChompBoundedMixin),
    ChompSetBoundedGroupLastChar {
        set: SetMixin,
        repeats: ChompBoundedMixin,
        group: GroupMixin,
        save: NoNeedToSaveMixin,
    },

    // === Choicepoints ===
    Try(TryMixin),
    TryIfChar(CharMixin, TryMixin),
    TryMatchChar(CharMixin, TryMixin),
    TryIfSet(SetMixin, TryMixin),
    TryMatchSet(SetMixin, TryMixin),

    // === Lookaround ===
    BeginAssertion {
        is_negation: bool,
        body: BodyGroupsMixin,
        next_label: Label,
    },
    EndAssertion,
}

impl Inst {
    /// Opcode name, as printed by the program dump.
    pub fn name(&self) -> String {
        match self {
            Inst::SyncToAndContinue(target) => format!("SyncTo{}AndContinue", target.name()),
            Inst::SyncToAndConsume(target) => format!("SyncTo{}AndConsume", target.name()),
            Inst::SyncToAndBackup(target, _) => format!("SyncTo{}AndBackup", target.name()),
            Inst::ChompChar(_, mode) => format!("ChompChar{}", mode.name()),
            Inst::ChompSet(_, mode) => format!("ChompSet{}", mode.name()),
            Inst::ChompCharGroup { mode, .. } => format!("ChompCharGroup{}", mode.name()),
            Inst::ChompSetGroup { mode, .. } => format!("ChompSetGroup{}", mode.name()),
            other => other.fixed_name().to_string(),
        }
    }

    fn fixed_name(&self) -> &'static str {
        match self {
            Inst::Fail => "Fail",
            Inst::Succ => "Succ",
            Inst::Jump(_) => "Jump",
            Inst::JumpIfNotChar(..) => "JumpIfNotChar",
            Inst::MatchCharOrJump(..) => "MatchCharOrJump",
            Inst::JumpIfNotSet(..) => "JumpIfNotSet",
            Inst::MatchSetOrJump(..) => "MatchSetOrJump",
            Inst::Switch10(_) => "Switch10",
            Inst::Switch20(_) => "Switch20",
            Inst::SwitchAndConsume10(_) => "SwitchAndConsume10",
            Inst::SwitchAndConsume20(_) => "SwitchAndConsume20",
            Inst::BoiTest(_) => "BOITest",
            Inst::EoiTest(_) => "EOITest",
            Inst::BolTest => "BOLTest",
            Inst::EolTest => "EOLTest",
            Inst::WordBoundaryTest { .. } => "WordBoundaryTest",
            Inst::MatchChar(_) => "MatchChar",
            Inst::MatchChar2(_) => "MatchChar2",
            Inst::MatchChar3(_) => "MatchChar3",
            Inst::MatchChar4(_) => "MatchChar4",
            Inst::MatchSet(_) => "MatchSet",
            Inst::MatchNegatedSet(_) => "MatchNegatedSet",
            Inst::MatchLiteral(_) => "MatchLiteral",
            Inst::MatchLiteralEquiv(_) => "MatchLiteralEquiv",
            Inst::MatchTrie(_) => "MatchTrie",
            Inst::OptMatchChar(_) => "OptMatchChar",
            Inst::OptMatchSet(_) => "OptMatchSet",
            Inst::SyncToAndContinue(_) | Inst::SyncToAndConsume(_) | Inst::SyncToAndBackup(..) => {
                "SyncTo"
            }
            Inst::SyncToLiteralsAndBackup(..) => "SyncToLiteralsAndBackup",
            Inst::MatchGroup(_) => "MatchGroup",
            Inst::BeginDefineGroup(_) => "BeginDefineGroup",
            Inst::EndDefineGroup(..) => "EndDefineGroup",
            Inst::DefineGroupFixed(..) => "DefineGroupFixed",
            Inst::BeginLoop { .. } => "BeginLoop",
            Inst::RepeatLoop(_) => "RepeatLoop",
            Inst::BeginLoopIfChar { .. } => "BeginLoopIfChar",
            Inst::RepeatLoopIfChar(_) => "RepeatLoopIfChar",
            Inst::BeginLoopIfSet { .. } => "BeginLoopIfSet",
            Inst::RepeatLoopIfSet(_) => "RepeatLoopIfSet",
            Inst::BeginLoopFixed { .. } => "BeginLoopFixed",
            Inst::RepeatLoopFixed(_) => "RepeatLoopFixed",
            Inst::LoopSet { .. } => "LoopSet",
            Inst::LoopSetWithFollowFirst { .. } => "LoopSetWithFollowFirst",
            Inst::BeginLoopFixedGroupLastIteration { .. } => "BeginLoopFixedGroupLastIteration",
            Inst::RepeatLoopFixedGroupLastIteration(_) => "RepeatLoopFixedGroupLastIteration",
            Inst::BeginGreedyLoopNoBacktrack { .. } => "BeginGreedyLoopNoBacktrack",
            Inst::RepeatGreedyLoopNoBacktrack(_) => "RepeatGreedyLoopNoBacktrack",
            Inst::ChompChar(..) => "ChompChar",
            Inst::ChompSet(..) => "ChompSet",
            Inst::ChompCharGroup { .. } => "ChompCharGroup",
            Inst::ChompSetGroup { .. } => "ChompSetGroup",
            Inst::ChompCharBounded(..) => "ChompCharBounded",
            Inst::ChompSetBounded(..) => "ChompSetBounded",
            Inst::ChompSetBoundedGroupLastChar { .. } => "ChompSetBoundedGroupLastChar",
            Inst::Try(_) => "Try",
            Inst::TryIfChar(..) => "TryIfChar",
            Inst::TryMatchChar(..) => "TryMatchChar",
            Inst::TryIfSet(..) => "TryIfSet",
            Inst::TryMatchSet(..) => "TryMatchSet",
            Inst::BeginAssertion { .. } => "BeginAssertion",
            Inst::EndAssertion => "EndAssertion",
        }
    }

    /// Visits every label operand, mutably. Used to resolve forward labels.
    pub fn for_each_label_mut<F: FnMut(&mut Label)>(&mut self, mut f: F) {
        match self {
            Inst::Jump(j)
            | Inst::JumpIfNotChar(_, j)
            | Inst::MatchCharOrJump(_, j)
            | Inst::JumpIfNotSet(_, j)
            | Inst::MatchSetOrJump(_, j) => f(&mut j.target_label),
            Inst::Switch10(s)
            | Inst::Switch20(s)
            | Inst::SwitchAndConsume10(s)
            | Inst::SwitchAndConsume20(s) => {
                for case in s.cases.iter_mut() {
                    f(&mut case.target_label);
                }
            }
            Inst::BeginLoop { begin, .. }
            | Inst::BeginLoopIfChar { begin, .. }
            | Inst::BeginLoopIfSet { begin, .. }
            | Inst::BeginLoopFixed { begin, .. }
            | Inst::BeginLoopFixedGroupLastIteration { begin, .. } => f(&mut begin.exit_label),
            Inst::BeginGreedyLoopNoBacktrack { exit_label, .. } => f(exit_label),
            Inst::RepeatLoop(r)
            | Inst::RepeatLoopIfChar(r)
            | Inst::RepeatLoopIfSet(r)
            | Inst::RepeatLoopFixed(r)
            | Inst::RepeatLoopFixedGroupLastIteration(r)
            | Inst::RepeatGreedyLoopNoBacktrack(r) => f(&mut r.begin_label),
            Inst::Try(t)
            | Inst::TryIfChar(_, t)
            | Inst::TryMatchChar(_, t)
            | Inst::TryIfSet(_, t)
            | Inst::TryMatchSet(_, t) => f(&mut t.fail_label),
            Inst::BeginAssertion { next_label, .. } => f(next_label),
            _ => {}
        }
    }

    /// Every label operand, in operand order.
    pub fn labels(&self) -> SmallVec<[Label; 2]> {
        let mut labels = SmallVec::new();
        match self {
            Inst::Jump(j)
            | Inst::JumpIfNotChar(_, j)
            | Inst::MatchCharOrJump(_, j)
            | Inst::JumpIfNotSet(_, j)
            | Inst::MatchSetOrJump(_, j) => labels.push(j.target_label),
            Inst::Switch10(s)
            | Inst::Switch20(s)
            | Inst::SwitchAndConsume10(s)
            | Inst::SwitchAndConsume20(s) => {
                labels.extend(s.cases.iter().map(|case| case.target_label));
            }
            Inst::BeginLoop { begin, .. }
            | Inst::BeginLoopIfChar { begin, .. }
            | Inst::BeginLoopIfSet { begin, .. }
            | Inst::BeginLoopFixed { begin, .. }
            | Inst::BeginLoopFixedGroupLastIteration { begin, .. } => labels.push(begin.exit_label),
            Inst::BeginGreedyLoopNoBacktrack { exit_label, .. } => labels.push(*exit_label),
            Inst::RepeatLoop(r)
            | Inst::RepeatLoopIfChar(r)
            | Inst::RepeatLoopIfSet(r)
            | Inst::RepeatLoopFixed(r)
            | Inst::RepeatLoopFixedGroupLastIteration(r)
            | Inst::RepeatGreedyLoopNoBacktrack(r) => labels.push(r.begin_label),
            Inst::Try(t)
            | Inst::TryIfChar(_, t)
            | Inst::TryMatchChar(_, t)
            | Inst::TryIfSet(_, t)
            | Inst::TryMatchSet(_, t) => labels.push(t.fail_label),
            Inst::BeginAssertion { next_label, .. } => labels.push(*next_label),
            _ => {}
        }
        labels
    }

    /// Group ids this instruction reads or writes.
    pub fn group_ids(&self) -> SmallVec<[GroupId; 2]> {
        let mut ids = SmallVec::new();
        match self {
            Inst::BeginLoop { body, .. }
            | Inst::BeginLoopIfChar { body, .. }
            | Inst::BeginLoopIfSet { body, .. }
            | Inst::BeginAssertion { body, .. } => {
                if let Some(range) = body.body_groups {
                    ids.push(range.from);
                    ids.push(range.to);
                }
            }
            Inst::MatchGroup(g)
            | Inst::BeginDefineGroup(g)
            | Inst::EndDefineGroup(g, _)
            | Inst::DefineGroupFixed(g, ..)
            | Inst::BeginLoopFixedGroupLastIteration { group: g, .. }
            | Inst::ChompCharGroup { group: g, .. }
            | Inst::ChompSetGroup { group: g, .. }
            | Inst::ChompSetBoundedGroupLastChar { group: g, .. } => ids.push(g.group_id),
            _ => {}
        }
        ids
    }

    /// Loop id this instruction owns, if it begins a loop.
    pub fn loop_id(&self) -> Option<LoopId> {
        match self {
            Inst::BeginLoop { begin, .. }
            | Inst::BeginLoopIfChar { begin, .. }
            | Inst::BeginLoopIfSet { begin, .. }
            | Inst::BeginLoopFixed { begin, .. }
            | Inst::BeginLoopFixedGroupLastIteration { begin, .. } => Some(begin.loop_id),
            Inst::LoopSet { lp, .. } | Inst::LoopSetWithFollowFirst { lp, .. } => Some(lp.loop_id),
            Inst::BeginGreedyLoopNoBacktrack { loop_id, .. } => Some(*loop_id),
            _ => None,
        }
    }

    /// Literal-buffer spans this instruction reads.
    pub fn literal_spans(&self) -> SmallVec<[Range<usize>; 4]> {
        let mut spans = SmallVec::new();
        let target = match self {
            Inst::MatchLiteral(l) => {
                spans.push(l.span());
                None
            }
            Inst::MatchLiteralEquiv(l) => {
                spans.push(l.equiv_span());
                None
            }
            Inst::SyncToAndContinue(t) | Inst::SyncToAndConsume(t) | Inst::SyncToAndBackup(t, _) => {
                Some(t)
            }
            Inst::SyncToLiteralsAndBackup(s, _) => {
                for info in s.infos.iter() {
                    let start = info.offset as usize;
                    spans.push(start..start + info.buffer_len());
                }
                None
            }
            _ => None,
        };
        if let Some((lit, equiv)) = target.and_then(|t| t.literal()) {
            spans.push(if equiv { lit.equiv_span() } else { lit.span() });
        }
        spans
    }

    /// True when `self` is the begin instruction that `repeat` must pair with.
    pub fn pairs_with_repeat(&self, repeat: &Inst) -> bool {
        matches!(
            (self, repeat),
            (Inst::BeginLoop { .. }, Inst::RepeatLoop(_))
                | (Inst::BeginLoopIfChar { .. }, Inst::RepeatLoopIfChar(_))
                | (Inst::BeginLoopIfSet { .. }, Inst::RepeatLoopIfSet(_))
                | (Inst::BeginLoopFixed { .. }, Inst::RepeatLoopFixed(_))
                | (
                    Inst::BeginLoopFixedGroupLastIteration { .. },
                    Inst::RepeatLoopFixedGroupLastIteration(_)
                )
                | (
                    Inst::BeginGreedyLoopNoBacktrack { .. },
                    Inst::RepeatGreedyLoopNoBacktrack(_)
                )
        )
    }
}
