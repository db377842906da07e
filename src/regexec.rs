// regexec.rs - Backtracking matcher.
//
// Structure: global tunables -> Matcher (per-program state, fast paths,
// start-offset loop) -> ExecContext (one match_at call) -> instruction
// and continuation execution.
//
// The dispatcher never recurses. Choicepoints and undo records are
// pushed on the ContStack; on failure the stack is unwound until a
// continuation resumes forward execution or the stack runs dry.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::RegexError;
use crate::regcont::{AssertionInfo, AssertionStack, Cont, ContStack, GroupInfo, LoopInfo};
use crate::reginst::{BeginLoopMixin, BodyGroupsMixin, GroupId, GroupRange, Inst, LoopId, SyncTarget};
use crate::regint::*;
use crate::regprogram::{Program, ProgramRep, ProgramTag};
use crate::regstats::MatchStats;
use crate::stdchars::{is_newline, is_whitespace_or_newline, is_word, CaseEquivalence, SimpleCaseEquivalence};

// ============================================================================
// Global tunables
// ============================================================================

static TICKS_PER_QUERY_CONTINUE: AtomicU32 = AtomicU32::new(DEFAULT_TICKS_PER_QC);
static TICKS_PER_QUERY_CONTINUE_TIME_CHECK: AtomicU32 = AtomicU32::new(DEFAULT_TICKS_PER_QC_TIME_CHECK);
static TIME_PER_QUERY_CONTINUE_MSEC: AtomicU64 = AtomicU64::new(DEFAULT_TIME_PER_QC_MSEC);
static MATCH_STACK_LIMIT: AtomicU32 = AtomicU32::new(DEFAULT_MATCH_STACK_LIMIT);

pub fn set_ticks_per_query_continue(n: u32) { TICKS_PER_QUERY_CONTINUE.store(n.max(1), Ordering::Relaxed); }
pub fn get_ticks_per_query_continue() -> u32 { TICKS_PER_QUERY_CONTINUE.load(Ordering::Relaxed) }
pub fn set_ticks_per_query_continue_time_check(n: u32) { TICKS_PER_QUERY_CONTINUE_TIME_CHECK.store(n.max(1), Ordering::Relaxed); }
pub fn get_ticks_per_query_continue_time_check() -> u32 { TICKS_PER_QUERY_CONTINUE_TIME_CHECK.load(Ordering::Relaxed) }
pub fn set_time_per_query_continue_msec(n: u64) { TIME_PER_QUERY_CONTINUE_MSEC.store(n, Ordering::Relaxed); }
pub fn get_time_per_query_continue_msec() -> u64 { TIME_PER_QUERY_CONTINUE_MSEC.load(Ordering::Relaxed) }
pub fn set_match_stack_limit(n: u32) { MATCH_STACK_LIMIT.store(n, Ordering::Relaxed); }
pub fn get_match_stack_limit() -> u32 { MATCH_STACK_LIMIT.load(Ordering::Relaxed) }

/// Host callout consulted periodically during long matches. Returning
/// false cancels the match with [`RegexError::Cancelled`].
pub type QueryContinueFn = Arc<dyn Fn() -> bool + Send + Sync>;

// ============================================================================
// Query-continue state
// ============================================================================

#[derive(Clone)]
struct QueryContinue {
    callback: Option<QueryContinueFn>,
    ticks: u32,
    ticks_per_qc: u32,
    ticks_per_time_check: u32,
    time_per_qc: Duration,
    previous: Option<Instant>,
}

impl QueryContinue {
    fn from_globals() -> Self {
        QueryContinue {
            callback: None,
            ticks: 0,
            ticks_per_qc: get_ticks_per_query_continue().max(1),
            ticks_per_time_check: get_ticks_per_query_continue_time_check().max(1),
            time_per_qc: Duration::from_millis(get_time_per_query_continue_msec()),
            previous: None,
        }
    }

    fn reset(&mut self) {
        self.ticks = 0;
        self.previous = None;
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// Execution state for one program. Reusable across calls; not shared
/// between threads while matching (use `clone_context` per thread).
pub struct Matcher {
    program: Arc<Program>,
    equivalence: Arc<dyn CaseEquivalence>,
    group_infos: Vec<GroupInfo>,
    loop_infos: Vec<LoopInfo>,
    cont_stack: ContStack,
    assertion_stack: AssertionStack,
    literal_next_sync_input_offsets: [CharCount; MAX_NUM_SYNC_LITERALS],
    qc: QueryContinue,
    stats: Option<MatchStats>,
}

impl Matcher {
    pub fn new(program: Arc<Program>) -> Self {
        Self::with_equivalence(program, Arc::new(SimpleCaseEquivalence))
    }

    pub fn with_equivalence(program: Arc<Program>, equivalence: Arc<dyn CaseEquivalence>) -> Self {
        let num_groups = program.num_groups();
        let num_loops = program.num_loops();
        Matcher {
            program,
            equivalence,
            group_infos: vec![GroupInfo::default(); num_groups],
            loop_infos: vec![LoopInfo::default(); num_loops],
            cont_stack: ContStack::new(get_match_stack_limit()),
            assertion_stack: AssertionStack::new(),
            literal_next_sync_input_offsets: [0; MAX_NUM_SYNC_LITERALS],
            qc: QueryContinue::from_globals(),
            stats: None,
        }
    }

    /// Fresh execution state over the same program and settings.
    pub fn clone_context(&self) -> Matcher {
        let mut m = Matcher::with_equivalence(Arc::clone(&self.program), Arc::clone(&self.equivalence));
        m.cont_stack.set_limit(self.cont_stack.limit());
        m.qc = self.qc.clone();
        m.qc.reset();
        if self.stats.is_some() {
            m.stats = Some(MatchStats::default());
        }
        m
    }

    // === Configuration ===

    pub fn set_query_continue(&mut self, callback: QueryContinueFn) {
        self.qc.callback = Some(callback);
    }

    pub fn clear_query_continue(&mut self) {
        self.qc.callback = None;
    }

    pub fn set_ticks_per_query_continue(&mut self, n: u32) {
        self.qc.ticks_per_qc = n.max(1);
    }

    pub fn set_ticks_per_query_continue_time_check(&mut self, n: u32) {
        self.qc.ticks_per_time_check = n.max(1);
    }

    pub fn set_time_per_query_continue(&mut self, time: Duration) {
        self.qc.time_per_qc = time;
    }

    /// Caps the continuation stack depth; 0 means unlimited.
    pub fn set_match_stack_limit(&mut self, limit: u32) {
        self.cont_stack.set_limit(limit);
    }

    pub fn enable_stats(&mut self) {
        if self.stats.is_none() {
            self.stats = Some(MatchStats::default());
        }
    }

    pub fn stats(&self) -> Option<&MatchStats> {
        self.stats.as_ref()
    }

    // === Results ===

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn was_last_match_successful(&self) -> bool {
        !self.group_infos[0].is_undefined()
    }

    pub fn num_groups(&self) -> usize {
        self.group_infos.len()
    }

    pub fn group(&self, id: GroupId) -> Option<GroupInfo> {
        self.group_infos.get(id).copied()
    }

    /// Input range of a defined group.
    pub fn group_range(&self, id: GroupId) -> Option<std::ops::Range<usize>> {
        let info = self.group_infos.get(id)?;
        info.end_offset()
            .map(|end| info.offset as usize..end as usize)
    }

    pub fn groups(&self) -> &[GroupInfo] {
        &self.group_infos
    }

    pub fn loops(&self) -> &[LoopInfo] {
        &self.loop_infos
    }

    pub fn cont_stack(&self) -> &ContStack {
        &self.cont_stack
    }

    pub fn assertion_stack(&self) -> &AssertionStack {
        &self.assertion_stack
    }

    fn reset_groups(&mut self) {
        for info in self.group_infos.iter_mut() {
            info.reset();
        }
    }

    fn count_attempt(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            stats.num_attempts += 1;
        }
    }

    // ========================================================================
    // Entry point
    // ========================================================================

    /// Searches `input` for the leftmost match starting at or after
    /// `offset` (or exactly at `offset` for sticky programs).
    ///
    /// On success group 0 holds the match; on `Ok(false)` and on error
    /// every group is undefined.
    pub fn match_at(&mut self, input: &[Char], offset: CharCount) -> Result<bool, RegexError> {
        let input_length = CharCount::try_from(input.len())
            .ok()
            .filter(|&n| n <= MAX_CHAR_COUNT)
            .ok_or(RegexError::InputTooLong)?;

        self.cont_stack.reset_counters();
        self.qc.reset();
        if let Some(stats) = self.stats.as_mut() {
            stats.input_length = input.len();
        }

        let program = Arc::clone(&self.program);
        let result = if offset > input_length {
            self.reset_groups();
            Ok(false)
        } else {
            match program.rep() {
                ProgramRep::Instructions { .. } => self.match_instructions(&program, input, offset),
                ProgramRep::SingleChar { c } => {
                    self.count_attempt();
                    Ok(self.match_single_char(&program, input, offset, *c))
                }
                ProgramRep::BoundedWord => {
                    self.count_attempt();
                    Ok(self.match_bounded_word(input, offset))
                }
                ProgramRep::LeadingTrailingSpaces {
                    begin_min_match,
                    end_min_match,
                } => {
                    self.count_attempt();
                    Ok(self.match_leading_trailing_spaces(input, offset, *begin_min_match, *end_min_match))
                }
                ProgramRep::Octoquad(matcher) => {
                    self.count_attempt();
                    let mut start = offset;
                    Ok(if matcher.match_at(input, &mut start) {
                        self.set_match(start, crate::octoquad::PATTERN_LENGTH as CharCount)
                    } else {
                        self.no_match()
                    })
                }
                ProgramRep::BoiLiteral2 { literal } => {
                    self.count_attempt();
                    Ok(if offset == 0 && input.len() >= 2 && input[..2] == literal[..] {
                        self.set_match(0, 2)
                    } else {
                        self.no_match()
                    })
                }
            }
        };

        match result {
            Ok(true) => {}
            // Hard fails and unsaved groups leave inner bindings behind.
            Ok(false) => self.reset_groups(),
            Err(_) => {
                self.reset_groups();
                self.cont_stack.clear();
                self.assertion_stack.clear();
            }
        }
        if let Some(stats) = self.stats.as_mut() {
            stats.num_pushes += self.cont_stack.pushes();
            stats.num_pops += self.cont_stack.pops();
            stats.stack_high_water_mark = stats.stack_high_water_mark.max(self.cont_stack.high_water_mark());
        }
        result
    }

    fn set_match(&mut self, offset: CharCount, length: CharCount) -> bool {
        self.group_infos[0] = GroupInfo::new(offset, length);
        true
    }

    fn no_match(&mut self) -> bool {
        self.group_infos[0].reset();
        false
    }

    // ========================================================================
    // Fast paths
    // ========================================================================

    fn match_single_char(&mut self, program: &Program, input: &[Char], offset: CharCount, c: Char) -> bool {
        let rest = &input[offset as usize..];
        let found = if program.is_ignore_case() {
            let equivs = self.equivalence.equivs(program.case_mapping_source(), c);
            rest.iter().position(|x| equivs.contains(x))
        } else {
            rest.iter().position(|&x| x == c)
        };
        match found {
            Some(pos) => self.set_match(offset + pos as CharCount, 1),
            None => self.no_match(),
        }
    }

    fn match_bounded_word(&mut self, input: &[Char], offset: CharCount) -> bool {
        let len = input.len();
        let mut off = offset as usize;
        if off >= len {
            return self.no_match();
        }
        // Starting mid-word: that word has no boundary at `off`, skip it.
        if off > 0 && is_word(input[off - 1]) {
            while off < len && is_word(input[off]) {
                off += 1;
            }
        }
        while off < len && !is_word(input[off]) {
            off += 1;
        }
        if off >= len {
            return self.no_match();
        }
        let start = off;
        while off < len && is_word(input[off]) {
            off += 1;
        }
        self.set_match(start as CharCount, (off - start) as CharCount)
    }

    fn match_leading_trailing_spaces(
        &mut self,
        input: &[Char],
        offset: CharCount,
        begin_min_match: CharCount,
        end_min_match: CharCount,
    ) -> bool {
        let len = input.len() as CharCount;
        if offset == len {
            return if end_min_match == 0 || (offset == 0 && begin_min_match == 0) {
                self.set_match(offset, 0)
            } else {
                self.no_match()
            };
        }
        if offset == 0 {
            let leading = input.iter().take_while(|&&c| is_whitespace_or_newline(c)).count() as CharCount;
            if leading >= begin_min_match {
                return self.set_match(0, leading);
            }
        }
        let trailing = input[offset as usize..]
            .iter()
            .rev()
            .take_while(|&&c| is_whitespace_or_newline(c))
            .count() as CharCount;
        if trailing >= end_min_match {
            self.set_match(len - trailing, trailing)
        } else {
            self.no_match()
        }
    }

    // ========================================================================
    // Instruction programs
    // ========================================================================

    fn match_instructions(&mut self, program: &Program, input: &[Char], offset: CharCount) -> Result<bool, RegexError> {
        let loop_match_here = match program.tag() {
            ProgramTag::Instructions => true,
            ProgramTag::BoiInstructions => {
                if offset != 0 {
                    self.reset_groups();
                    return Ok(false);
                }
                false
            }
            ProgramTag::BoiInstructionsForStickyFlag => false,
            other => {
                return Err(RegexError::internal_bug(format!(
                    "{} program carries instructions",
                    other.name()
                )))
            }
        };

        let mut ctx = ExecContext {
            program,
            input,
            input_length: input.len() as CharCount,
            equivalence: &*self.equivalence,
            match_start: offset,
            input_offset: offset,
            next_sync_input_offset: offset,
            inst_pointer: Label::START,
            first_iteration: true,
            group_infos: &mut self.group_infos,
            loop_infos: &mut self.loop_infos,
            cont_stack: &mut self.cont_stack,
            assertion_stack: &mut self.assertion_stack,
            literal_next_sync_input_offsets: &mut self.literal_next_sync_input_offsets,
            qc: &mut self.qc,
            stats: self.stats.as_mut(),
        };

        loop {
            if let Some(stats) = ctx.stats.as_deref_mut() {
                stats.num_attempts += 1;
            }
            let res = ctx.match_here()?;
            ctx.first_iteration = false;
            if res || !loop_match_here {
                return Ok(res);
            }
            ctx.match_start += 1;
            if ctx.match_start > ctx.input_length {
                return Ok(false);
            }
        }
    }
}

// ============================================================================
// ExecContext
// ============================================================================

/// Flow out of one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Continue at `inst_pointer`.
    Next,
    Fail(HardFailMode),
    /// Attempt finished.
    Stop,
}

const FAIL: Flow = Flow::Fail(HardFailMode::BacktrackAndLater);

/// State of one `match_at` call, borrowed out of the Matcher.
pub(crate) struct ExecContext<'a> {
    program: &'a Program,
    input: &'a [Char],
    input_length: CharCount,
    equivalence: &'a dyn CaseEquivalence,
    match_start: CharCount,
    input_offset: CharCount,
    next_sync_input_offset: CharCount,
    inst_pointer: Label,
    first_iteration: bool,
    group_infos: &'a mut [GroupInfo],
    loop_infos: &'a mut [LoopInfo],
    cont_stack: &'a mut ContStack,
    assertion_stack: &'a mut AssertionStack,
    literal_next_sync_input_offsets: &'a mut [CharCount; MAX_NUM_SYNC_LITERALS],
    qc: &'a mut QueryContinue,
    stats: Option<&'a mut MatchStats>,
}

fn mismatch(label: Label, expected: &str) -> RegexError {
    debug_assert!(false, "{} is not a {}", label, expected);
    RegexError::internal_bug(format!("{} is not a {}", label, expected))
}

impl<'a> ExecContext<'a> {
    // === Match loop ===

    fn match_here(&mut self) -> Result<bool, RegexError> {
        self.cont_stack.clear();
        self.assertion_stack.clear();
        for info in self.group_infos.iter_mut() {
            info.reset();
        }
        for info in self.loop_infos.iter_mut() {
            info.reset();
        }
        self.input_offset = self.match_start;
        self.inst_pointer = Label::START;
        self.run()?;
        Ok(!self.group_infos[0].is_undefined())
    }

    fn run(&mut self) -> Result<(), RegexError> {
        let program: &'a Program = self.program;
        let insts = program.insts();
        loop {
            self.query_continue()?;
            let label = self.inst_pointer;
            let inst = insts
                .get(label.index())
                .ok_or_else(|| RegexError::internal_bug(format!("no instruction at {}", label)))?;
            if let Some(stats) = self.stats.as_deref_mut() {
                stats.num_insts += 1;
            }
            match inst.exec(label, self)? {
                Flow::Next => {}
                Flow::Stop => return Ok(()),
                Flow::Fail(mode) => {
                    if self.hard_fail(mode)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Ordinary failure. Returns true when the attempt is over.
    fn fail(&mut self) -> Result<bool, RegexError> {
        if !self.cont_stack.is_empty() && !self.run_cont_stack()? {
            return Ok(false);
        }
        self.group_infos[0].reset();
        Ok(true)
    }

    /// Unwinds until a continuation resumes. Returns true when the stack ran dry.
    fn run_cont_stack(&mut self) -> Result<bool, RegexError> {
        while let Some(cont) = self.cont_stack.pop() {
            self.query_continue()?;
            if cont.exec(self)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn hard_fail(&mut self, mode: HardFailMode) -> Result<bool, RegexError> {
        match mode {
            HardFailMode::BacktrackAndLater => self.fail(),
            HardFailMode::BacktrackOnly => {
                if self.fail()? {
                    self.match_start = self.input_length;
                    return Ok(true);
                }
                Ok(false)
            }
            HardFailMode::LaterOnly => {
                self.cont_stack.clear();
                self.assertion_stack.clear();
                self.group_infos[0].reset();
                Ok(true)
            }
            HardFailMode::ImmediateFail => {
                self.match_start = self.input_length;
                self.group_infos[0].reset();
                Ok(true)
            }
        }
    }

    // === Query continue ===

    #[inline]
    fn query_continue(&mut self) -> Result<(), RegexError> {
        self.qc.ticks = self.qc.ticks.wrapping_add(1);
        if self.qc.ticks % self.qc.ticks_per_qc == 0 {
            return self.do_query_continue();
        }
        Ok(())
    }

    fn do_query_continue(&mut self) -> Result<(), RegexError> {
        let due = match self.qc.previous {
            Some(previous) => previous.elapsed() >= self.qc.time_per_qc,
            None => true,
        };
        if !due && self.qc.ticks % self.qc.ticks_per_time_check != 0 {
            return Ok(());
        }
        self.qc.previous = Some(Instant::now());
        if let Some(stats) = self.stats.as_deref_mut() {
            stats.num_query_continues += 1;
        }
        match &self.qc.callback {
            Some(callback) if !callback() => Err(RegexError::Cancelled),
            _ => Ok(()),
        }
    }

    // === Helpers ===

    #[inline]
    fn goto(&mut self, label: Label) -> Flow {
        self.inst_pointer = label;
        Flow::Next
    }

    #[inline]
    fn push(&mut self, cont: Cont) -> Result<(), RegexError> {
        self.cont_stack.push(cont)
    }

    #[inline]
    fn inst_at(&self, label: Label) -> Result<&'a Inst, RegexError> {
        let program: &'a Program = self.program;
        program
            .inst(label)
            .ok_or_else(|| RegexError::internal_bug(format!("no instruction at {}", label)))
    }

    #[inline]
    fn remaining(&self) -> CharCount {
        self.input_length - self.input_offset
    }

    #[inline]
    fn count_compares(&mut self, n: CharCount) {
        if let Some(stats) = self.stats.as_deref_mut() {
            stats.num_compares += n as u64;
        }
    }

    /// Tests the current character without consuming it.
    #[inline]
    fn test_char<F: FnOnce(Char) -> bool>(&mut self, pred: F) -> bool {
        self.count_compares(1);
        match self.input.get(self.input_offset as usize) {
            Some(&c) => pred(c),
            None => false,
        }
    }

    /// Consumes the current character if it satisfies `pred`.
    #[inline]
    fn match_char_if<F: FnOnce(Char) -> bool>(&mut self, pred: F) -> bool {
        if self.test_char(pred) {
            self.input_offset += 1;
            true
        } else {
            false
        }
    }

    /// Consumes up to `max` characters satisfying `pred`; returns how many.
    fn consume_while<F: Fn(Char) -> bool>(&mut self, max: CharCount, pred: F) -> CharCount {
        let start = self.input_offset as usize;
        let end = start + max.min(self.remaining()) as usize;
        let n = self.input[start..end].iter().take_while(|&&c| pred(c)).count() as CharCount;
        self.count_compares(n + 1);
        self.input_offset += n;
        n
    }

    #[inline]
    fn max_repeats(&self, repeats: CountDomain) -> CharCount {
        if repeats.is_unbounded() {
            self.remaining()
        } else {
            repeats.upper.min(self.remaining())
        }
    }

    fn save_loop(&mut self, loop_id: LoopId) -> Result<(), RegexError> {
        let orig_loop_info = self.loop_infos[loop_id].clone();
        self.push(Cont::RestoreLoop {
            loop_id,
            orig_loop_info,
        })
    }

    fn start_loop(&mut self, begin: &BeginLoopMixin) -> Result<(), RegexError> {
        if begin.has_outer_loops {
            self.save_loop(begin.loop_id)?;
        }
        let info = &mut self.loop_infos[begin.loop_id];
        info.number = 0;
        info.start_input_offset = self.input_offset;
        Ok(())
    }

    fn bind_group(
        &mut self,
        group_id: GroupId,
        offset: CharCount,
        length: CharCount,
        no_need_to_save: bool,
    ) -> Result<(), RegexError> {
        if !no_need_to_save {
            self.push(Cont::ResetGroup { group_id })?;
        }
        self.group_infos[group_id] = GroupInfo::new(offset, length);
        Ok(())
    }

    // === Group save/restore ===

    /// Pushes undo records for every group in `range`: a RestoreGroup per
    /// defined group (cleared when `reset`) and one reset per run of
    /// undefined groups.
    pub(crate) fn save_inner_groups(&mut self, range: Option<GroupRange>, reset: bool) -> Result<(), RegexError> {
        let Some(range) = range else {
            return Ok(());
        };
        if self.group_infos[range.from..=range.to].iter().all(GroupInfo::is_undefined) {
            return self.save_inner_groups_all_undefined(range);
        }
        let mut undefined_from = None;
        for group_id in range.ids() {
            let orig_group_info = self.group_infos[group_id];
            if orig_group_info.is_undefined() {
                undefined_from.get_or_insert(group_id);
                continue;
            }
            if let Some(from) = undefined_from.take() {
                self.push_reset_groups(from, group_id - 1)?;
            }
            self.push(Cont::RestoreGroup {
                group_id,
                orig_group_info,
            })?;
            if reset {
                self.group_infos[group_id].reset();
            }
        }
        if let Some(from) = undefined_from {
            self.push_reset_groups(from, range.to)?;
        }
        Ok(())
    }

    /// Same as `save_inner_groups` when every group in `range` is undefined.
    pub(crate) fn save_inner_groups_all_undefined(&mut self, range: GroupRange) -> Result<(), RegexError> {
        debug_assert!(self.group_infos[range.from..=range.to].iter().all(GroupInfo::is_undefined));
        self.push_reset_groups(range.from, range.to)
    }

    fn push_reset_groups(&mut self, from: GroupId, to: GroupId) -> Result<(), RegexError> {
        if from == to {
            self.push(Cont::ResetGroup { group_id: from })
        } else {
            self.push(Cont::ResetGroupRange {
                from_group_id: from,
                to_group_id: to,
            })
        }
    }

    pub(crate) fn reset_group(&mut self, group_id: GroupId) {
        self.group_infos[group_id].reset();
    }

    pub(crate) fn reset_inner_groups(&mut self, range: Option<GroupRange>) {
        if let Some(range) = range {
            for info in &mut self.group_infos[range.from..=range.to] {
                info.reset();
            }
        }
    }

    /// Groups of a loop body on entry to another iteration.
    fn enter_body_groups(&mut self, begin: &BeginLoopMixin, body: &BodyGroupsMixin) -> Result<(), RegexError> {
        if begin.has_inner_nondet {
            self.save_inner_groups(body.body_groups, true)
        } else {
            self.reset_inner_groups(body.body_groups);
            Ok(())
        }
    }

    // === Assertions ===

    /// Closes the innermost assertion. Returns true when execution resumes
    /// after it, false when the assertion as a whole failed.
    fn pop_assertion(&mut self, succeeded: bool) -> Result<bool, RegexError> {
        let info: AssertionInfo = self
            .assertion_stack
            .pop()
            .ok_or_else(|| RegexError::internal_bug("assertion stack underflow"))?;
        self.cont_stack.pop_to(info.cont_stack_position);
        let Inst::BeginAssertion {
            is_negation,
            body,
            next_label,
        } = self.inst_at(info.begin_label)?
        else {
            return Err(mismatch(info.begin_label, "BeginAssertion"));
        };
        if succeeded && *is_negation {
            self.reset_inner_groups(body.body_groups);
        }
        if succeeded == *is_negation {
            return Ok(false);
        }
        self.input_offset = info.start_input_offset;
        self.inst_pointer = *next_label;
        Ok(true)
    }

    // === Sync ===

    fn scan_for(&mut self, target: &SyncTarget, offset: &mut CharCount) -> bool {
        let input = self.input;
        let litbuf = self.program.litbuf();
        let found = match target {
            SyncTarget::Char(m) => find_char(input, offset, |c| c == m.c),
            SyncTarget::Char2Set(m) => find_char(input, offset, |c| c == m.cs[0] || c == m.cs[1]),
            SyncTarget::Set(m) => find_char(input, offset, |c| m.set.contains(c)),
            SyncTarget::NegatedSet(m) => find_char(input, offset, |c| !m.set.contains(c)),
            SyncTarget::Char2Literal(m) => m.scanner.find(input, offset),
            SyncTarget::Literal(m) => m.scanner.find::<1>(input, offset, &litbuf[m.literal.span()]),
            SyncTarget::LinearLiteral(m) => m.scanner.find::<1>(input, offset, &litbuf[m.literal.span()]),
            SyncTarget::LiteralEquiv(m) => {
                m.scanner
                    .find::<EQUIV_CLASS_SIZE>(input, offset, &litbuf[m.literal.equiv_span()])
            }
            SyncTarget::LiteralEquivTrivialLastPatChar(m) => {
                m.scanner
                    .find_trivial_last_char(input, offset, &litbuf[m.literal.equiv_span()])
            }
        };
        if let Some(stats) = self.stats.as_deref_mut() {
            stats.num_compares += 1;
        }
        found
    }

    /// Shared prelude of the backup syncs. `Some(flow)` ends the instruction.
    fn backup_prelude(&mut self, label: Label, backup: CountDomain) -> Option<Flow> {
        if backup.lower > self.input_length - self.match_start {
            // Not even a match at the very end leaves room for the backup.
            return Some(Flow::Fail(HardFailMode::ImmediateFail));
        }
        if self.input_offset < self.next_sync_input_offset {
            // Still before the last sync point: syncing again would land
            // on the same occurrence and back up to where we already are.
            return Some(self.goto(label.next()));
        }
        if backup.lower > self.input_offset - self.match_start {
            self.input_offset = self.match_start + backup.lower;
        }
        None
    }

    fn backup_from(&mut self, label: Label, found: CharCount, backup: CountDomain) -> Flow {
        self.next_sync_input_offset = found + 1;
        if !backup.is_unbounded() {
            self.match_start = found - (found - self.match_start).min(backup.upper);
        }
        self.input_offset = self.match_start;
        self.goto(label.next())
    }
}

fn find_char<F: Fn(Char) -> bool>(input: &[Char], offset: &mut CharCount, pred: F) -> bool {
    let rest = input.get(*offset as usize..).unwrap_or(&[]);
    match rest.iter().position(|&c| pred(c)) {
        Some(pos) => {
            *offset += pos as CharCount;
            true
        }
        None => false,
    }
}

// ============================================================================
// Instruction execution
// ============================================================================

impl Inst {
    pub(crate) fn exec(&self, label: Label, ctx: &mut ExecContext<'_>) -> Result<Flow, RegexError> {
        let program = ctx.program;
        let input = ctx.input;
        let next = label.next();
        match self {
            // === Control flow ===
            Inst::Fail => Ok(FAIL),
            Inst::Succ => {
                let start = ctx.match_start;
                ctx.group_infos[0] = GroupInfo::new(start, ctx.input_offset - start);
                Ok(Flow::Stop)
            }
            Inst::Jump(j) => Ok(ctx.goto(j.target_label)),
            Inst::JumpIfNotChar(c, j) => {
                if ctx.test_char(|x| x == c.c) {
                    Ok(ctx.goto(next))
                } else {
                    Ok(ctx.goto(j.target_label))
                }
            }
            Inst::MatchCharOrJump(c, j) => {
                if ctx.match_char_if(|x| x == c.c) {
                    Ok(ctx.goto(next))
                } else {
                    Ok(ctx.goto(j.target_label))
                }
            }
            Inst::JumpIfNotSet(s, j) => {
                if ctx.test_char(|x| s.set.contains(x)) {
                    Ok(ctx.goto(next))
                } else {
                    Ok(ctx.goto(j.target_label))
                }
            }
            Inst::MatchSetOrJump(s, j) => {
                if ctx.match_char_if(|x| s.set.contains(x)) {
                    Ok(ctx.goto(next))
                } else {
                    Ok(ctx.goto(j.target_label))
                }
            }
            Inst::Switch10(s) | Inst::Switch20(s) => {
                let Some(&c) = input.get(ctx.input_offset as usize) else {
                    return Ok(FAIL);
                };
                ctx.count_compares(1);
                Ok(ctx.goto(s.lookup(c).unwrap_or(next)))
            }
            Inst::SwitchAndConsume10(s) | Inst::SwitchAndConsume20(s) => {
                let Some(&c) = input.get(ctx.input_offset as usize) else {
                    return Ok(FAIL);
                };
                ctx.count_compares(1);
                match s.lookup(c) {
                    Some(target) => {
                        ctx.input_offset += 1;
                        Ok(ctx.goto(target))
                    }
                    None => Ok(ctx.goto(next)),
                }
            }

            // === Built-in assertions ===
            Inst::BoiTest(h) => {
                if ctx.input_offset > 0 {
                    return Ok(Flow::Fail(if h.can_hard_fail {
                        HardFailMode::ImmediateFail
                    } else {
                        HardFailMode::BacktrackAndLater
                    }));
                }
                Ok(ctx.goto(next))
            }
            Inst::EoiTest(h) => {
                if ctx.input_offset < ctx.input_length {
                    return Ok(Flow::Fail(if h.can_hard_fail {
                        HardFailMode::LaterOnly
                    } else {
                        HardFailMode::BacktrackAndLater
                    }));
                }
                Ok(ctx.goto(next))
            }
            Inst::BolTest => {
                let off = ctx.input_offset as usize;
                if off > 0 && !is_newline(input[off - 1]) {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::EolTest => {
                let off = ctx.input_offset as usize;
                if off < input.len() && !is_newline(input[off]) {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::WordBoundaryTest { is_negation } => {
                let off = ctx.input_offset as usize;
                let prev = off > 0 && is_word(input[off - 1]);
                let curr = off < input.len() && is_word(input[off]);
                if *is_negation == (prev != curr) {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }

            // === Matching ===
            Inst::MatchChar(c) => match_or_fail(ctx, next, |x| x == c.c),
            Inst::MatchChar2(m) => match_or_fail(ctx, next, |x| m.cs.contains(&x)),
            Inst::MatchChar3(m) => match_or_fail(ctx, next, |x| m.cs.contains(&x)),
            Inst::MatchChar4(m) => match_or_fail(ctx, next, |x| m.cs.contains(&x)),
            Inst::MatchSet(s) => match_or_fail(ctx, next, |x| s.set.contains(x)),
            Inst::MatchNegatedSet(s) => match_or_fail(ctx, next, |x| !s.set.contains(x)),
            Inst::MatchLiteral(lit) => {
                if lit.length > ctx.remaining() {
                    return Ok(FAIL);
                }
                let off = ctx.input_offset as usize;
                let expected = &program.litbuf()[lit.span()];
                ctx.count_compares(lit.length);
                if input[off..off + expected.len()] != *expected {
                    return Ok(FAIL);
                }
                ctx.input_offset += lit.length;
                Ok(ctx.goto(next))
            }
            Inst::MatchLiteralEquiv(lit) => {
                if lit.length > ctx.remaining() {
                    return Ok(FAIL);
                }
                let off = ctx.input_offset as usize;
                let classes = &program.litbuf()[lit.equiv_span()];
                ctx.count_compares(lit.length);
                let matched = classes
                    .chunks_exact(EQUIV_CLASS_SIZE)
                    .zip(&input[off..off + lit.length as usize])
                    .all(|(class, c)| class.contains(c));
                if !matched {
                    return Ok(FAIL);
                }
                ctx.input_offset += lit.length;
                Ok(ctx.goto(next))
            }
            Inst::MatchTrie(t) => {
                ctx.count_compares(1);
                if !t.trie.match_at(input, &mut ctx.input_offset) {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::OptMatchChar(c) => {
                ctx.match_char_if(|x| x == c.c);
                Ok(ctx.goto(next))
            }
            Inst::OptMatchSet(s) => {
                ctx.match_char_if(|x| s.set.contains(x));
                Ok(ctx.goto(next))
            }

            // === Synchronization ===
            Inst::SyncToAndContinue(target) | Inst::SyncToAndConsume(target) => {
                let mut found = ctx.input_offset;
                if !ctx.scan_for(target, &mut found) {
                    return Ok(Flow::Fail(HardFailMode::ImmediateFail));
                }
                ctx.match_start = found;
                ctx.input_offset = found;
                if matches!(self, Inst::SyncToAndConsume(_)) {
                    ctx.input_offset += target.consume_length();
                }
                Ok(ctx.goto(next))
            }
            Inst::SyncToAndBackup(target, b) => {
                if let Some(flow) = ctx.backup_prelude(label, b.backup) {
                    return Ok(flow);
                }
                let mut found = ctx.input_offset;
                if !ctx.scan_for(target, &mut found) {
                    return Ok(Flow::Fail(HardFailMode::ImmediateFail));
                }
                Ok(ctx.backup_from(label, found, b.backup))
            }
            Inst::SyncToLiteralsAndBackup(scanners, b) => {
                if let Some(flow) = ctx.backup_prelude(label, b.backup) {
                    return Ok(flow);
                }
                let infos = &scanners.infos;
                if ctx.first_iteration {
                    for next_offset in ctx.literal_next_sync_input_offsets.iter_mut().take(infos.len()) {
                        *next_offset = ctx.input_offset;
                    }
                }
                let litbuf = program.litbuf();
                let mut best: Option<CharCount> = None;
                for (info, next_offset) in infos.iter().zip(ctx.literal_next_sync_input_offsets.iter_mut()) {
                    let mut this_offset = (*next_offset).max(ctx.input_offset);
                    if this_offset < ctx.input_length && info.find(input, &mut this_offset, litbuf) {
                        if best.map_or(true, |b| this_offset < b) {
                            best = Some(this_offset);
                        }
                        *next_offset = this_offset;
                    } else {
                        *next_offset = ctx.input_length;
                    }
                }
                ctx.count_compares(infos.len() as CharCount);
                match best {
                    Some(found) => Ok(ctx.backup_from(label, found, b.backup)),
                    None => Ok(Flow::Fail(HardFailMode::ImmediateFail)),
                }
            }

            // === Groups ===
            Inst::MatchGroup(g) => {
                let info = ctx.group_infos[g.group_id];
                if let Some(length) = info.length.filter(|&n| n > 0) {
                    if length > ctx.remaining() {
                        return Ok(FAIL);
                    }
                    let captured = &input[info.offset as usize..(info.offset + length) as usize];
                    let off = ctx.input_offset as usize;
                    let here = &input[off..off + length as usize];
                    ctx.count_compares(length);
                    let matched = if program.is_ignore_case() {
                        let source = program.case_mapping_source();
                        let equivalence = ctx.equivalence;
                        captured
                            .iter()
                            .zip(here)
                            .all(|(&a, &b)| equivalence.equals(source, a, b))
                    } else {
                        captured == here
                    };
                    if !matched {
                        return Ok(FAIL);
                    }
                    ctx.input_offset += length;
                }
                Ok(ctx.goto(next))
            }
            Inst::BeginDefineGroup(g) => {
                ctx.group_infos[g.group_id].offset = ctx.input_offset;
                Ok(ctx.goto(next))
            }
            Inst::EndDefineGroup(g, s) => {
                if !s.no_need_to_save {
                    ctx.push(Cont::ResetGroup { group_id: g.group_id })?;
                }
                let info = &mut ctx.group_infos[g.group_id];
                info.length = Some(ctx.input_offset - info.offset);
                Ok(ctx.goto(next))
            }
            Inst::DefineGroupFixed(g, f, s) => {
                let offset = ctx.input_offset - f.length;
                ctx.bind_group(g.group_id, offset, f.length, s.no_need_to_save)?;
                Ok(ctx.goto(next))
            }

            // === Loops ===
            Inst::BeginLoop { begin, is_greedy, .. } => {
                ctx.start_loop(begin)?;
                if begin.repeats.lower > 0 {
                    return Ok(ctx.goto(next));
                }
                let off = ctx.input_offset;
                if *is_greedy {
                    ctx.push(Cont::Resume {
                        orig_input_offset: off,
                        orig_inst_label: begin.exit_label,
                    })?;
                    Ok(ctx.goto(next))
                } else {
                    ctx.push(Cont::RepeatLoop {
                        begin_label: label,
                        orig_input_offset: off,
                    })?;
                    Ok(ctx.goto(begin.exit_label))
                }
            }
            Inst::RepeatLoop(r) => {
                let Inst::BeginLoop {
                    begin,
                    body,
                    is_greedy,
                } = ctx.inst_at(r.begin_label)?
                else {
                    return Err(mismatch(r.begin_label, "BeginLoop"));
                };
                let body_label = r.begin_label.next();
                if begin.has_inner_nondet {
                    ctx.save_loop(begin.loop_id)?;
                }
                let off = ctx.input_offset;
                let info = &mut ctx.loop_infos[begin.loop_id];
                info.number += 1;
                let number = info.number;
                if number < begin.repeats.lower {
                    info.start_input_offset = off;
                    ctx.enter_body_groups(begin, body)?;
                    Ok(ctx.goto(body_label))
                } else if off == info.start_input_offset && number > begin.repeats.lower {
                    // Empty iteration beyond the minimum.
                    Ok(FAIL)
                } else if !begin.repeats.is_unbounded() && number >= begin.repeats.upper {
                    Ok(ctx.goto(begin.exit_label))
                } else if *is_greedy {
                    info.start_input_offset = off;
                    ctx.push(Cont::Resume {
                        orig_input_offset: off,
                        orig_inst_label: begin.exit_label,
                    })?;
                    ctx.save_inner_groups(body.body_groups, true)?;
                    Ok(ctx.goto(body_label))
                } else {
                    ctx.push(Cont::RepeatLoop {
                        begin_label: r.begin_label,
                        orig_input_offset: off,
                    })?;
                    Ok(ctx.goto(begin.exit_label))
                }
            }
            Inst::BeginLoopIfChar { c, begin, .. } => {
                let c = c.c;
                begin_loop_if(ctx, next, begin, |x| x == c)
            }
            Inst::BeginLoopIfSet { set, begin, .. } => begin_loop_if(ctx, next, begin, |x| set.set.contains(x)),
            Inst::RepeatLoopIfChar(r) => {
                let Inst::BeginLoopIfChar { c, begin, body } = ctx.inst_at(r.begin_label)? else {
                    return Err(mismatch(r.begin_label, "BeginLoopIfChar"));
                };
                let c = c.c;
                repeat_loop_if(ctx, r.begin_label, begin, body, |x| x == c)
            }
            Inst::RepeatLoopIfSet(r) => {
                let Inst::BeginLoopIfSet { set, begin, body } = ctx.inst_at(r.begin_label)? else {
                    return Err(mismatch(r.begin_label, "BeginLoopIfSet"));
                };
                repeat_loop_if(ctx, r.begin_label, begin, body, |x| set.set.contains(x))
            }
            Inst::BeginLoopFixed { begin, .. } => {
                ctx.start_loop(begin)?;
                if begin.repeats.lower == 0 {
                    ctx.push(Cont::RewindLoopFixed {
                        begin_label: label,
                        trying_body: true,
                    })?;
                }
                Ok(ctx.goto(next))
            }
            Inst::RepeatLoopFixed(r) => {
                let Inst::BeginLoopFixed { begin, .. } = ctx.inst_at(r.begin_label)? else {
                    return Err(mismatch(r.begin_label, "BeginLoopFixed"));
                };
                let begin_label = r.begin_label;
                let info = &mut ctx.loop_infos[begin.loop_id];
                info.number += 1;
                let number = info.number;
                let repeats = begin.repeats;
                if number < repeats.lower {
                    Ok(ctx.goto(begin_label.next()))
                } else if !repeats.is_unbounded() && number >= repeats.upper {
                    if repeats.lower < repeats.upper {
                        ctx.push(Cont::RewindLoopFixed {
                            begin_label,
                            trying_body: false,
                        })?;
                    }
                    Ok(ctx.goto(begin.exit_label))
                } else {
                    if number == repeats.lower {
                        ctx.push(Cont::RewindLoopFixed {
                            begin_label,
                            trying_body: true,
                        })?;
                    }
                    Ok(ctx.goto(begin_label.next()))
                }
            }
            Inst::LoopSet { set, lp } => {
                if lp.has_outer_loops {
                    ctx.save_loop(lp.loop_id)?;
                }
                let start = ctx.input_offset;
                let max = ctx.max_repeats(lp.repeats);
                let number = ctx.consume_while(max, |x| set.set.contains(x));
                let info = &mut ctx.loop_infos[lp.loop_id];
                info.start_input_offset = start;
                info.number = number;
                if number < lp.repeats.lower {
                    return Ok(FAIL);
                }
                if number > lp.repeats.lower {
                    ctx.push(Cont::RewindLoopSet { begin_label: label })?;
                }
                Ok(ctx.goto(next))
            }
            Inst::LoopSetWithFollowFirst { set, lp, follow_first } => {
                if lp.has_outer_loops {
                    ctx.save_loop(lp.loop_id)?;
                }
                let start = ctx.input_offset;
                let max = ctx.max_repeats(lp.repeats);
                let end = (start + max) as usize;
                let info = &mut ctx.loop_infos[lp.loop_id];
                info.start_input_offset = start;
                info.offsets_of_follow_first.clear();
                let mut pos = start as usize;
                while pos < end && set.set.contains(input[pos]) {
                    if input[pos] == *follow_first {
                        info.offsets_of_follow_first.push(pos as CharCount - start);
                    }
                    pos += 1;
                }
                let number = pos as CharCount - start;
                info.number = number;
                let can_rewind = number > lp.repeats.lower && !info.offsets_of_follow_first.is_empty();
                ctx.input_offset = pos as CharCount;
                ctx.count_compares(number + 1);
                if number < lp.repeats.lower {
                    return Ok(FAIL);
                }
                if can_rewind {
                    ctx.push(Cont::RewindLoopSetWithFollowFirst { begin_label: label })?;
                }
                Ok(ctx.goto(next))
            }
            Inst::BeginLoopFixedGroupLastIteration { begin, .. } => {
                ctx.start_loop(begin)?;
                if begin.repeats.lower == 0 {
                    ctx.push(Cont::RewindLoopFixedGroupLastIteration {
                        begin_label: label,
                        trying_body: true,
                    })?;
                }
                Ok(ctx.goto(next))
            }
            Inst::RepeatLoopFixedGroupLastIteration(r) => {
                let Inst::BeginLoopFixedGroupLastIteration {
                    begin,
                    length,
                    group,
                    save,
                } = ctx.inst_at(r.begin_label)?
                else {
                    return Err(mismatch(r.begin_label, "BeginLoopFixedGroupLastIteration"));
                };
                let begin_label = r.begin_label;
                let info = &mut ctx.loop_infos[begin.loop_id];
                info.number += 1;
                let number = info.number;
                let repeats = begin.repeats;
                if number < repeats.lower {
                    Ok(ctx.goto(begin_label.next()))
                } else if !repeats.is_unbounded() && number >= repeats.upper {
                    if repeats.lower < repeats.upper {
                        ctx.push(Cont::RewindLoopFixedGroupLastIteration {
                            begin_label,
                            trying_body: false,
                        })?;
                    }
                    let off = ctx.input_offset;
                    ctx.bind_group(group.group_id, off - length.length, length.length, save.no_need_to_save)?;
                    Ok(ctx.goto(begin.exit_label))
                } else {
                    if number == repeats.lower {
                        ctx.push(Cont::RewindLoopFixedGroupLastIteration {
                            begin_label,
                            trying_body: true,
                        })?;
                    }
                    Ok(ctx.goto(begin_label.next()))
                }
            }
            Inst::BeginGreedyLoopNoBacktrack { exit_label, .. } => {
                let off = ctx.input_offset;
                ctx.push(Cont::Resume {
                    orig_input_offset: off,
                    orig_inst_label: *exit_label,
                })?;
                Ok(ctx.goto(next))
            }
            Inst::RepeatGreedyLoopNoBacktrack(r) => {
                if !matches!(ctx.inst_at(r.begin_label)?, Inst::BeginGreedyLoopNoBacktrack { .. }) {
                    return Err(mismatch(r.begin_label, "BeginGreedyLoopNoBacktrack"));
                }
                let off = ctx.input_offset;
                match ctx.cont_stack.top_mut() {
                    Some(Cont::Resume {
                        orig_input_offset, ..
                    }) => {
                        if *orig_input_offset == off {
                            return Ok(FAIL);
                        }
                        *orig_input_offset = off;
                    }
                    _ => return Err(RegexError::internal_bug("greedy loop without its resume point")),
                }
                Ok(ctx.goto(r.begin_label.next()))
            }

            // === Chomp ===
            Inst::ChompChar(c, mode) => {
                let n = ctx.consume_while(CharCount::MAX, |x| x == c.c);
                if n < mode.min_count() {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::ChompSet(s, mode) => {
                let n = ctx.consume_while(CharCount::MAX, |x| s.set.contains(x));
                if n < mode.min_count() {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::ChompCharGroup { c, group, save, mode } => {
                let start = ctx.input_offset;
                let n = ctx.consume_while(CharCount::MAX, |x| x == c.c);
                if n < mode.min_count() {
                    return Ok(FAIL);
                }
                ctx.bind_group(group.group_id, start, n, save.no_need_to_save)?;
                Ok(ctx.goto(next))
            }
            Inst::ChompSetGroup { set, group, save, mode } => {
                let start = ctx.input_offset;
                let n = ctx.consume_while(CharCount::MAX, |x| set.set.contains(x));
                if n < mode.min_count() {
                    return Ok(FAIL);
                }
                ctx.bind_group(group.group_id, start, n, save.no_need_to_save)?;
                Ok(ctx.goto(next))
            }
            Inst::ChompCharBounded(c, b) => {
                let max = ctx.max_repeats(b.repeats);
                if ctx.consume_while(max, |x| x == c.c) < b.repeats.lower {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::ChompSetBounded(s, b) => {
                let max = ctx.max_repeats(b.repeats);
                if ctx.consume_while(max, |x| s.set.contains(x)) < b.repeats.lower {
                    return Ok(FAIL);
                }
                Ok(ctx.goto(next))
            }
            Inst::ChompSetBoundedGroupLastChar {
                set,
                repeats,
                group,
                save,
            } => {
                let max = ctx.max_repeats(repeats.repeats);
                let n = ctx.consume_while(max, |x| set.set.contains(x));
                if n < repeats.repeats.lower {
                    return Ok(FAIL);
                }
                if n > 0 {
                    let off = ctx.input_offset;
                    ctx.bind_group(group.group_id, off - 1, 1, save.no_need_to_save)?;
                }
                Ok(ctx.goto(next))
            }

            // === Choicepoints ===
            Inst::Try(t) => {
                push_resume(ctx, t.fail_label)?;
                Ok(ctx.goto(next))
            }
            Inst::TryIfChar(c, t) => try_if(ctx, next, t.fail_label, false, |x| x == c.c),
            Inst::TryMatchChar(c, t) => try_if(ctx, next, t.fail_label, true, |x| x == c.c),
            Inst::TryIfSet(s, t) => try_if(ctx, next, t.fail_label, false, |x| s.set.contains(x)),
            Inst::TryMatchSet(s, t) => try_if(ctx, next, t.fail_label, true, |x| s.set.contains(x)),

            // === Lookaround ===
            Inst::BeginAssertion { is_negation, body, .. } => {
                if !*is_negation {
                    ctx.save_inner_groups(body.body_groups, false)?;
                }
                let info = AssertionInfo {
                    begin_label: label,
                    start_input_offset: ctx.input_offset,
                    cont_stack_position: ctx.cont_stack.position(),
                };
                ctx.assertion_stack.push(info)?;
                ctx.push(Cont::PopAssertion)?;
                Ok(ctx.goto(next))
            }
            Inst::EndAssertion => {
                if ctx.pop_assertion(true)? {
                    Ok(Flow::Next)
                } else {
                    Ok(FAIL)
                }
            }
        }
    }
}

#[inline]
fn match_or_fail<F: FnOnce(Char) -> bool>(ctx: &mut ExecContext<'_>, next: Label, pred: F) -> Result<Flow, RegexError> {
    if ctx.match_char_if(pred) {
        Ok(ctx.goto(next))
    } else {
        Ok(FAIL)
    }
}

#[inline]
fn push_resume(ctx: &mut ExecContext<'_>, label: Label) -> Result<(), RegexError> {
    let off = ctx.input_offset;
    ctx.push(Cont::Resume {
        orig_input_offset: off,
        orig_inst_label: label,
    })
}

/// Choicepoint taken only when the next character can start the first
/// alternative; with `consume` that character is matched as well.
fn try_if<F: FnOnce(Char) -> bool>(
    ctx: &mut ExecContext<'_>,
    next: Label,
    fail_label: Label,
    consume: bool,
    pred: F,
) -> Result<Flow, RegexError> {
    if !ctx.test_char(pred) {
        return Ok(ctx.goto(fail_label));
    }
    push_resume(ctx, fail_label)?;
    if consume {
        ctx.input_offset += 1;
    }
    Ok(ctx.goto(next))
}

fn begin_loop_if<F: FnOnce(Char) -> bool>(
    ctx: &mut ExecContext<'_>,
    next: Label,
    begin: &BeginLoopMixin,
    pred: F,
) -> Result<Flow, RegexError> {
    if ctx.test_char(pred) {
        ctx.start_loop(begin)?;
        return Ok(ctx.goto(next));
    }
    if begin.repeats.lower > 0 {
        Ok(FAIL)
    } else {
        Ok(ctx.goto(begin.exit_label))
    }
}

fn repeat_loop_if<F: FnOnce(Char) -> bool>(
    ctx: &mut ExecContext<'_>,
    begin_label: Label,
    begin: &BeginLoopMixin,
    body: &BodyGroupsMixin,
    pred: F,
) -> Result<Flow, RegexError> {
    if begin.has_inner_nondet {
        ctx.save_loop(begin.loop_id)?;
    }
    ctx.loop_infos[begin.loop_id].number += 1;
    let number = ctx.loop_infos[begin.loop_id].number;
    if ctx.test_char(pred) {
        // The follow set is disjoint from the body's first set, so a body
        // character past the maximum can never lead to a match.
        if !begin.repeats.is_unbounded() && number >= begin.repeats.upper {
            return Ok(FAIL);
        }
        ctx.enter_body_groups(begin, body)?;
        ctx.loop_infos[begin.loop_id].start_input_offset = ctx.input_offset;
        return Ok(ctx.goto(begin_label.next()));
    }
    if number < begin.repeats.lower {
        Ok(FAIL)
    } else {
        Ok(ctx.goto(begin.exit_label))
    }
}

// ============================================================================
// Continuation execution
// ============================================================================

impl Cont {
    /// Runs a popped continuation. Returns true when forward execution
    /// resumes at the restored instruction pointer and input offset.
    pub(crate) fn exec(self, ctx: &mut ExecContext<'_>) -> Result<bool, RegexError> {
        match self {
            Cont::Resume {
                orig_input_offset,
                orig_inst_label,
            } => {
                ctx.input_offset = orig_input_offset;
                ctx.inst_pointer = orig_inst_label;
                Ok(true)
            }
            Cont::RestoreLoop {
                loop_id,
                orig_loop_info,
            } => {
                ctx.loop_infos[loop_id] = orig_loop_info;
                Ok(false)
            }
            Cont::RestoreGroup {
                group_id,
                orig_group_info,
            } => {
                ctx.group_infos[group_id] = orig_group_info;
                Ok(false)
            }
            Cont::ResetGroup { group_id } => {
                ctx.reset_group(group_id);
                Ok(false)
            }
            Cont::ResetGroupRange {
                from_group_id,
                to_group_id,
            } => {
                ctx.reset_inner_groups(Some(GroupRange::new(from_group_id, to_group_id)));
                Ok(false)
            }
            Cont::RepeatLoop {
                begin_label,
                orig_input_offset,
            } => {
                let Inst::BeginLoop { begin, body, .. } = ctx.inst_at(begin_label)? else {
                    return Err(mismatch(begin_label, "BeginLoop"));
                };
                ctx.input_offset = orig_input_offset;
                ctx.loop_infos[begin.loop_id].start_input_offset = orig_input_offset;
                ctx.inst_pointer = begin_label.next();
                ctx.enter_body_groups(begin, body)?;
                Ok(true)
            }
            Cont::PopAssertion => ctx.pop_assertion(false),
            Cont::RewindLoopFixed {
                begin_label,
                trying_body,
            } => {
                let Inst::BeginLoopFixed { begin, length } = ctx.inst_at(begin_label)? else {
                    return Err(mismatch(begin_label, "BeginLoopFixed"));
                };
                let number = rewind_fixed(ctx, begin, length.length, trying_body);
                if number > begin.repeats.lower {
                    ctx.push(Cont::RewindLoopFixed {
                        begin_label,
                        trying_body: false,
                    })?;
                }
                ctx.inst_pointer = begin.exit_label;
                Ok(true)
            }
            Cont::RewindLoopSet { begin_label } => {
                let Inst::LoopSet { lp, .. } = ctx.inst_at(begin_label)? else {
                    return Err(mismatch(begin_label, "LoopSet"));
                };
                let info = &mut ctx.loop_infos[lp.loop_id];
                info.number -= 1;
                let number = info.number;
                ctx.input_offset = info.start_input_offset + number;
                if number > lp.repeats.lower {
                    ctx.push(Cont::RewindLoopSet { begin_label })?;
                }
                ctx.inst_pointer = begin_label.next();
                Ok(true)
            }
            Cont::RewindLoopSetWithFollowFirst { begin_label } => {
                let Inst::LoopSetWithFollowFirst { lp, .. } = ctx.inst_at(begin_label)? else {
                    return Err(mismatch(begin_label, "LoopSetWithFollowFirst"));
                };
                let info = &mut ctx.loop_infos[lp.loop_id];
                loop {
                    let Some(offset) = info.offsets_of_follow_first.pop() else {
                        return Ok(false);
                    };
                    if offset >= lp.repeats.lower {
                        info.number = offset;
                        break;
                    }
                }
                ctx.input_offset = info.start_input_offset + info.number;
                if !info.offsets_of_follow_first.is_empty() {
                    ctx.push(Cont::RewindLoopSetWithFollowFirst { begin_label })?;
                }
                ctx.inst_pointer = begin_label.next();
                Ok(true)
            }
            Cont::RewindLoopFixedGroupLastIteration {
                begin_label,
                trying_body,
            } => {
                let Inst::BeginLoopFixedGroupLastIteration {
                    begin,
                    length,
                    group,
                    save,
                } = ctx.inst_at(begin_label)?
                else {
                    return Err(mismatch(begin_label, "BeginLoopFixedGroupLastIteration"));
                };
                let number = rewind_fixed(ctx, begin, length.length, trying_body);
                if number > begin.repeats.lower {
                    ctx.push(Cont::RewindLoopFixedGroupLastIteration {
                        begin_label,
                        trying_body: false,
                    })?;
                }
                if number > 0 {
                    let off = ctx.input_offset;
                    ctx.bind_group(group.group_id, off - length.length, length.length, save.no_need_to_save)?;
                } else {
                    ctx.reset_group(group.group_id);
                }
                ctx.inst_pointer = begin.exit_label;
                Ok(true)
            }
        }
    }
}

/// Backs a fixed-length loop off by one iteration (or stops trying the
/// body) and moves the input to the end of the last kept iteration.
fn rewind_fixed(ctx: &mut ExecContext<'_>, begin: &BeginLoopMixin, length: CharCount, trying_body: bool) -> CharCount {
    let info = &mut ctx.loop_infos[begin.loop_id];
    if !trying_body {
        info.number = info.number.saturating_sub(1);
    }
    ctx.input_offset = info.start_input_offset + info.number * length;
    info.number
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::RuntimeCharSet;
    use crate::regemit::ProgramBuilder;
    use crate::reginst::{
        BackupMixin, CharMixin, ChompBoundedMixin, GroupMixin, HardFailMixin, JumpMixin, LoopSetMixin,
        NoNeedToSaveMixin, RepeatLoopMixin, SetMixin, TryMixin,
    };

    fn u(s: &str) -> Vec<Char> {
        s.encode_utf16().collect()
    }

    fn ch(c: char) -> CharMixin {
        CharMixin { c: c as Char }
    }

    fn matcher(b: ProgramBuilder) -> Matcher {
        Matcher::new(Arc::new(b.finish().unwrap()))
    }

    #[test]
    fn single_char_program_searches_forward() {
        let program = Arc::new(Program::single_char("b", RegexFlags::empty(), b'b' as Char));
        let mut m = Matcher::new(program);
        assert!(m.match_at(&u("aab"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(2..3));
        assert!(!m.match_at(&u("aab"), 3).unwrap());
        assert!(!m.was_last_match_successful());
    }

    #[test]
    fn try_backtracks_to_alternative() {
        // a|b
        let mut b = ProgramBuilder::new("a|b", RegexFlags::empty());
        let alt = b.new_label();
        let done = b.new_label();
        b.emit(Inst::Try(TryMixin { fail_label: alt }));
        b.emit(Inst::MatchChar(ch('a')));
        b.emit(Inst::Jump(JumpMixin { target_label: done }));
        b.bind(alt);
        b.emit(Inst::MatchChar(ch('b')));
        b.bind(done);
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("xb"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(1..2));
    }

    #[test]
    fn greedy_loop_backtracks_into_follow() {
        // (?:a)*ab
        let mut b = ProgramBuilder::new("(?:a)*ab", RegexFlags::empty());
        let lp = b.new_loop();
        let exit = b.new_label();
        let begin = b.emit(Inst::BeginLoop {
            begin: BeginLoopMixin {
                loop_id: lp,
                repeats: CountDomain::at_least(0),
                has_outer_loops: false,
                has_inner_nondet: false,
                exit_label: exit,
            },
            body: BodyGroupsMixin::default(),
            is_greedy: true,
        });
        b.emit(Inst::MatchChar(ch('a')));
        b.emit(Inst::RepeatLoop(RepeatLoopMixin { begin_label: begin }));
        b.bind(exit);
        b.emit(Inst::MatchChar(ch('a')));
        b.emit(Inst::MatchChar(ch('b')));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("aaab"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(0..4));
        assert!(!m.match_at(&u("aaa"), 0).unwrap());
    }

    #[test]
    fn loop_set_rewinds_one_at_a_time() {
        // [a-z]{1,}z
        let mut b = ProgramBuilder::new("[a-z]+z", RegexFlags::empty());
        let lp = b.new_loop();
        b.emit(Inst::LoopSet {
            set: SetMixin {
                set: RuntimeCharSet::from_ranges(&[(b'a' as Char, b'z' as Char)]),
            },
            lp: LoopSetMixin {
                loop_id: lp,
                repeats: CountDomain::at_least(1),
                has_outer_loops: false,
            },
        });
        b.emit(Inst::MatchChar(ch('z')));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("abzcd"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(0..3));
    }

    #[test]
    fn chomp_group_binds_capture() {
        let mut b = ProgramBuilder::new("(a+)", RegexFlags::empty());
        let g = b.new_group();
        b.emit(Inst::ChompCharGroup {
            c: ch('a'),
            group: GroupMixin { group_id: g },
            save: NoNeedToSaveMixin { no_need_to_save: false },
            mode: ChompMode::Plus,
        });
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("baab"), 0).unwrap());
        assert_eq!(m.group_range(1), Some(1..3));
    }

    #[test]
    fn chomp_bounded_respects_limits() {
        let mut b = ProgramBuilder::new("a{2,3}", RegexFlags::empty());
        b.emit(Inst::ChompCharBounded(ch('a'), ChompBoundedMixin { repeats: CountDomain::new(2, 3) }));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("aaaa"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(0..3));
        assert!(!m.match_at(&u("a"), 0).unwrap());
    }

    #[test]
    fn boi_hard_fail_stops_search() {
        let mut b = ProgramBuilder::new("^b", RegexFlags::empty());
        b.emit(Inst::BoiTest(HardFailMixin { can_hard_fail: true }));
        b.emit(Inst::MatchChar(ch('b')));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        m.enable_stats();
        assert!(!m.match_at(&u("ab"), 0).unwrap());
        assert_eq!(m.stats().unwrap().num_attempts, 2);
    }

    #[test]
    fn hard_fail_leaves_no_inner_group_bound() {
        // (a)^
        let mut b = ProgramBuilder::new("(a)^", RegexFlags::empty());
        let g = b.new_group();
        b.emit(Inst::BeginDefineGroup(GroupMixin { group_id: g }));
        b.emit(Inst::MatchChar(ch('a')));
        b.emit(Inst::EndDefineGroup(
            GroupMixin { group_id: g },
            NoNeedToSaveMixin { no_need_to_save: false },
        ));
        b.emit(Inst::BoiTest(HardFailMixin { can_hard_fail: true }));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(!m.match_at(&u("a"), 0).unwrap());
        assert!(m.groups().iter().all(GroupInfo::is_undefined));
    }

    #[test]
    fn unsaved_group_is_undefined_after_sticky_failure() {
        // (a)b, sticky
        let mut b = ProgramBuilder::new("(a)b", RegexFlags::empty()).sticky();
        let g = b.new_group();
        b.emit(Inst::BeginDefineGroup(GroupMixin { group_id: g }));
        b.emit(Inst::MatchChar(ch('a')));
        b.emit(Inst::EndDefineGroup(
            GroupMixin { group_id: g },
            NoNeedToSaveMixin { no_need_to_save: true },
        ));
        b.emit(Inst::MatchChar(ch('b')));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("ab"), 0).unwrap());
        assert_eq!(m.group_range(1), Some(0..1));
        assert!(!m.match_at(&u("ac"), 0).unwrap());
        assert!(m.groups().iter().all(GroupInfo::is_undefined));
    }

    #[test]
    fn sync_backup_moves_match_start() {
        // \w{0,2}c found through the literal "c"
        let mut b = ProgramBuilder::new("a?b?c", RegexFlags::empty());
        let target = SyncTarget::Char(ch('c'));
        b.emit(Inst::SyncToAndBackup(target, BackupMixin { backup: CountDomain::new(0, 2) }));
        b.emit(Inst::OptMatchChar(ch('a')));
        b.emit(Inst::OptMatchChar(ch('b')));
        b.emit(Inst::MatchChar(ch('c')));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("xxxabc"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(3..6));
    }

    #[test]
    fn stack_limit_aborts_match() {
        // (?:a)* written as an explicit choicepoint loop
        let mut b = ProgramBuilder::new("(?:a)*", RegexFlags::empty());
        b.emit(Inst::Try(TryMixin { fail_label: Label(3) }));
        b.emit(Inst::MatchChar(ch('a')));
        b.emit(Inst::Jump(JumpMixin { target_label: Label(0) }));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        m.set_match_stack_limit(4);
        let input = u("aaaaaaaaaa");
        assert_eq!(m.match_at(&input, 0), Err(RegexError::MatchStackLimitOver));
        assert!(!m.was_last_match_successful());
        assert!(m.cont_stack().is_empty());
    }

    #[test]
    fn exhausted_literal_scanners_park_at_end() {
        let mut b = ProgramBuilder::new("foo|bar", RegexFlags::empty());
        let scanners = b.scanners(&[&u("foo"), &u("bar")], None);
        b.emit(Inst::SyncToLiteralsAndBackup(scanners, BackupMixin { backup: CountDomain::exactly(0) }));
        b.emit(Inst::Succ);
        let mut m = matcher(b);
        assert!(m.match_at(&u("xxbar"), 0).unwrap());
        assert_eq!(m.group_range(0), Some(2..2));
        assert_eq!(m.literal_next_sync_input_offsets[..2], [5, 2]);

        assert!(!m.match_at(&u("nothing"), 0).unwrap());
        assert_eq!(m.literal_next_sync_input_offsets[..2], [7, 7]);
    }

    #[test]
    fn clone_context_is_independent() {
        let program = Arc::new(Program::single_char("a", RegexFlags::empty(), b'a' as Char));
        let mut first = Matcher::new(program);
        let mut second = first.clone_context();
        assert!(first.match_at(&u("a"), 0).unwrap());
        assert!(!second.match_at(&u("b"), 0).unwrap());
        assert!(first.was_last_match_successful());
        assert!(Arc::ptr_eq(first.program(), second.program()));
    }
}
