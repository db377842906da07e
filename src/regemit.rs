// regemit.rs - Program builder.
//
// Instructions are appended to an arena and addressed by label. Forward
// references use pending labels handed out by `new_label` and fixed up
// by `finish`, which also checks every id, span and loop pairing so the
// matcher can trust the program it runs.

use crate::error::RegexError;
use crate::reginst::{
    Char2LiteralScannerMixin, EquivScannerMixin, GroupId, Inst, LinearScannerMixin, LiteralMixin,
    LoopId, ScannerMixin, ScannersMixin, SyncTarget,
};
use crate::regint::{
    Char, CharCount, Label, MappingSource, RegexFlags, EQUIV_CLASS_SIZE, MAX_NUM_SYNC_LITERALS,
    SWITCH_10_MAX_CASES, SWITCH_20_MAX_CASES,
};
use crate::regprogram::{Program, ProgramRep, ProgramTag};
use crate::scanner::{
    fits_linear_map, Char2LiteralScanner, ScannerInfo, ScannerInfos, TextbookBoyerMoore,
    TextbookBoyerMooreWithLinearMap,
};
use crate::stdchars::CaseEquivalence;

/// Labels at or above this value are pending and resolved by `finish`.
const PENDING_LABEL_BASE: u32 = 1 << 31;

#[derive(Debug)]
pub struct ProgramBuilder {
    source: String,
    flags: RegexFlags,
    tag: ProgramTag,
    insts: Vec<Inst>,
    litbuf: Vec<Char>,
    pending: Vec<Option<Label>>,
    num_groups: usize,
    num_loops: usize,
}

impl ProgramBuilder {
    /// Starts an unanchored program. Group 0 is always allocated.
    pub fn new(source: &str, flags: RegexFlags) -> Self {
        ProgramBuilder {
            source: source.to_string(),
            flags,
            tag: ProgramTag::Instructions,
            insts: Vec::new(),
            litbuf: Vec::new(),
            pending: Vec::new(),
            num_groups: 1,
            num_loops: 0,
        }
    }

    /// Marks the program as anchored at the beginning of input.
    pub fn anchored(mut self) -> Self {
        self.tag = ProgramTag::BoiInstructions;
        self
    }

    /// Marks the program as tried only at the caller's start offset.
    pub fn sticky(mut self) -> Self {
        self.tag = ProgramTag::BoiInstructionsForStickyFlag;
        self
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn case_mapping_source(&self) -> MappingSource {
        if self.flags.contains(RegexFlags::UNICODE) {
            MappingSource::CaseFolding
        } else {
            MappingSource::UnicodeData
        }
    }

    // === Ids ===

    pub fn new_group(&mut self) -> GroupId {
        self.num_groups += 1;
        self.num_groups - 1
    }

    pub fn new_loop(&mut self) -> LoopId {
        self.num_loops += 1;
        self.num_loops - 1
    }

    // === Labels ===

    /// Label of the next instruction to be emitted.
    #[inline]
    pub fn here(&self) -> Label {
        Label(self.insts.len() as u32)
    }

    /// Hands out a forward label to be bound later with `bind`.
    pub fn new_label(&mut self) -> Label {
        self.pending.push(None);
        Label(PENDING_LABEL_BASE + (self.pending.len() - 1) as u32)
    }

    /// Binds a forward label to the next instruction to be emitted.
    pub fn bind(&mut self, label: Label) {
        let here = self.here();
        if let Some(slot) = self.pending_slot(label) {
            *slot = Some(here);
        }
    }

    fn pending_slot(&mut self, label: Label) -> Option<&mut Option<Label>> {
        label
            .0
            .checked_sub(PENDING_LABEL_BASE)
            .and_then(|idx| self.pending.get_mut(idx as usize))
    }

    pub fn emit(&mut self, inst: Inst) -> Label {
        let label = self.here();
        self.insts.push(inst);
        label
    }

    // === Literals ===

    /// Appends a literal to the literal buffer.
    pub fn literal(&mut self, chars: &[Char]) -> LiteralMixin {
        let offset = self.litbuf.len() as CharCount;
        self.litbuf.extend_from_slice(chars);
        LiteralMixin {
            offset,
            length: chars.len() as CharCount,
        }
    }

    /// Appends a literal as equivalence classes, four code units per position.
    pub fn literal_equiv(&mut self, chars: &[Char], equivalence: &dyn CaseEquivalence) -> LiteralMixin {
        let source = self.case_mapping_source();
        let offset = self.litbuf.len() as CharCount;
        for &c in chars {
            self.litbuf.extend_from_slice(&equivalence.equivs(source, c));
        }
        LiteralMixin {
            offset,
            length: chars.len() as CharCount,
        }
    }

    /// Sync target for a case-sensitive literal, using the cheapest scanner that fits.
    pub fn sync_literal(&mut self, chars: &[Char]) -> SyncTarget {
        let literal = self.literal(chars);
        let pat = &self.litbuf[literal.span()];
        if chars.len() == 2 {
            SyncTarget::Char2Literal(Char2LiteralScannerMixin {
                literal,
                scanner: Char2LiteralScanner::new(chars[0], chars[1]),
            })
        } else if fits_linear_map(pat) {
            SyncTarget::LinearLiteral(LinearScannerMixin {
                literal,
                scanner: TextbookBoyerMooreWithLinearMap::new(pat, literal.length, 1),
            })
        } else {
            SyncTarget::Literal(ScannerMixin {
                literal,
                scanner: TextbookBoyerMoore::new(pat, literal.length, 1),
            })
        }
    }

    /// Sync target for a case-insensitive literal. With `trivial_last_char`
    /// the last position only matches its own code unit.
    pub fn sync_literal_equiv(
        &mut self,
        chars: &[Char],
        equivalence: &dyn CaseEquivalence,
        trivial_last_char: bool,
    ) -> SyncTarget {
        let literal = self.literal_equiv(chars, equivalence);
        let mixin = EquivScannerMixin {
            literal,
            scanner: TextbookBoyerMoore::new(
                &self.litbuf[literal.equiv_span()],
                literal.length,
                EQUIV_CLASS_SIZE,
            ),
        };
        if trivial_last_char {
            SyncTarget::LiteralEquivTrivialLastPatChar(mixin)
        } else {
            SyncTarget::LiteralEquiv(mixin)
        }
    }

    /// Scanner for one literal of a multi-literal sync; `equivalence`
    /// selects the equivalence-class form.
    pub fn scanner_info(
        &mut self,
        chars: &[Char],
        equivalence: Option<&dyn CaseEquivalence>,
    ) -> ScannerInfo {
        let literal = match equivalence {
            Some(eq) => self.literal_equiv(chars, eq),
            None => self.literal(chars),
        };
        ScannerInfo::new(&self.litbuf, literal.offset, literal.length, equivalence.is_some())
    }

    pub fn scanners(&mut self, literals: &[&[Char]], equivalence: Option<&dyn CaseEquivalence>) -> ScannersMixin {
        let infos: ScannerInfos = literals
            .iter()
            .map(|lit| self.scanner_info(lit, equivalence))
            .collect();
        ScannersMixin { infos }
    }

    // === Finish ===

    pub fn finish(self) -> Result<Program, RegexError> {
        let ProgramBuilder {
            source,
            flags,
            tag,
            mut insts,
            litbuf,
            pending,
            num_groups,
            num_loops,
        } = self;

        if insts.is_empty() {
            return Err(RegexError::invalid_program("program has no instructions"));
        }

        let mut unresolved = None;
        for inst in insts.iter_mut() {
            inst.for_each_label_mut(|label| {
                if label.0 >= PENDING_LABEL_BASE {
                    match pending.get((label.0 - PENDING_LABEL_BASE) as usize).copied().flatten() {
                        Some(bound) => *label = bound,
                        None => unresolved = Some(*label),
                    }
                }
            });
        }
        if let Some(label) = unresolved {
            return Err(RegexError::invalid_program(format!(
                "unbound label #{}",
                label.0 - PENDING_LABEL_BASE
            )));
        }

        let mut num_sync_literal_scanners = 0;
        for (idx, inst) in insts.iter().enumerate() {
            let at = Label(idx as u32);
            validate_inst(at, inst, &insts, litbuf.len(), num_groups, num_loops)?;
            if let Inst::SyncToLiteralsAndBackup(scanners, _) = inst {
                num_sync_literal_scanners = num_sync_literal_scanners.max(scanners.infos.len());
            }
        }
        validate_assertions(&insts)?;

        Ok(Program::from_parts(
            source,
            flags,
            num_groups,
            num_loops,
            tag,
            ProgramRep::Instructions {
                insts,
                litbuf,
                num_sync_literal_scanners,
            },
        ))
    }
}

/// Assertion bodies nest in instruction order: each `EndAssertion` closes
/// the innermost open `BeginAssertion`, whose `next_label` follows it.
fn validate_assertions(insts: &[Inst]) -> Result<(), RegexError> {
    let mut open: Vec<(Label, Label)> = Vec::new();
    for (idx, inst) in insts.iter().enumerate() {
        let at = Label(idx as u32);
        match inst {
            Inst::BeginAssertion { next_label, .. } => open.push((at, *next_label)),
            Inst::EndAssertion => match open.pop() {
                Some((_, next_label)) if next_label.index() == idx + 1 => {}
                Some((begin, next_label)) => {
                    return Err(RegexError::invalid_program(format!(
                        "{}: BeginAssertion continues at {} but closes at {}",
                        begin, next_label, at
                    )));
                }
                None => {
                    return Err(RegexError::invalid_program(format!(
                        "{}: EndAssertion without BeginAssertion",
                        at
                    )));
                }
            },
            _ => {}
        }
    }
    match open.pop() {
        Some((begin, _)) => Err(RegexError::invalid_program(format!("{}: BeginAssertion is never closed", begin))),
        None => Ok(()),
    }
}

fn validate_inst(
    at: Label,
    inst: &Inst,
    insts: &[Inst],
    litbuf_len: usize,
    num_groups: usize,
    num_loops: usize,
) -> Result<(), RegexError> {
    let invalid = |what: String| Err(RegexError::invalid_program(format!("{}: {} {}", at, inst.name(), what)));

    for label in inst.labels() {
        if label.index() >= insts.len() {
            return invalid(format!("jumps to {} past the end", label));
        }
    }
    for id in inst.group_ids() {
        if id >= num_groups {
            return invalid(format!("names group {} of {}", id, num_groups));
        }
    }
    if let Some(id) = inst.loop_id() {
        if id >= num_loops {
            return invalid(format!("names loop {} of {}", id, num_loops));
        }
    }
    for span in inst.literal_spans() {
        if span.end > litbuf_len {
            return invalid(format!("reads literal {}..{} past {}", span.start, span.end, litbuf_len));
        }
    }

    match inst {
        Inst::Switch10(s) | Inst::SwitchAndConsume10(s) if s.cases.len() > SWITCH_10_MAX_CASES => {
            return invalid(format!("has {} cases", s.cases.len()));
        }
        Inst::Switch20(s) | Inst::SwitchAndConsume20(s) if s.cases.len() > SWITCH_20_MAX_CASES => {
            return invalid(format!("has {} cases", s.cases.len()));
        }
        Inst::SyncToLiteralsAndBackup(s, _)
            if s.infos.is_empty() || s.infos.len() > MAX_NUM_SYNC_LITERALS =>
        {
            return invalid(format!("scans for {} literals", s.infos.len()));
        }
        Inst::RepeatLoop(r)
        | Inst::RepeatLoopIfChar(r)
        | Inst::RepeatLoopIfSet(r)
        | Inst::RepeatLoopFixed(r)
        | Inst::RepeatLoopFixedGroupLastIteration(r)
        | Inst::RepeatGreedyLoopNoBacktrack(r) => {
            let paired = insts
                .get(r.begin_label.index())
                .is_some_and(|begin| begin.pairs_with_repeat(inst));
            if !paired {
                return invalid(format!("does not pair with {}", r.begin_label));
            }
        }
        _ => {}
    }
    Ok(())
}
