// regcont.rs - Backtracking state: capture/loop records, continuations
// and the two explicit stacks.
//
// Backtracking never recurses natively. Every "what to try next" is a
// `Cont` record on the ContStack, popped strictly LIFO by the matcher's
// fail loop. Open lookarounds are tracked on the AssertionStack.

use std::fmt;

use smallvec::SmallVec;

use crate::error::RegexError;
use crate::reginst::{GroupId, LoopId};
use crate::regint::{CharCount, Label, INIT_ASSERTION_STACK_SIZE, INIT_CONT_STACK_SIZE};

// ============================================================================
// GroupInfo / LoopInfo / AssertionInfo
// ============================================================================

/// Capture of one group: `offset` plus a length that is `None` while undefined.
///
/// `reset` only clears the length; the last offset stays behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GroupInfo {
    pub offset: CharCount,
    pub length: Option<CharCount>,
}

impl GroupInfo {
    pub fn new(offset: CharCount, length: CharCount) -> Self {
        GroupInfo {
            offset,
            length: Some(length),
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.length.is_none()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.length = None;
    }

    /// Offset just past the capture, if defined.
    #[inline]
    pub fn end_offset(&self) -> Option<CharCount> {
        self.length.map(|len| self.offset + len)
    }
}

impl fmt::Display for GroupInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(len) => write!(f, "{{offset:{}, length:{}}}", self.offset, len),
            None => write!(f, "<undefined>"),
        }
    }
}

pub type FollowFirstOffsets = SmallVec<[CharCount; 4]>;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LoopInfo {
    /// Iterations completed so far.
    pub number: CharCount,
    pub start_input_offset: CharCount,
    /// Iteration counts at which the follow-first character was seen,
    /// ascending. Only maintained by `LoopSetWithFollowFirst`.
    pub offsets_of_follow_first: FollowFirstOffsets,
}

impl LoopInfo {
    pub fn reset(&mut self) {
        self.number = 0;
        self.start_input_offset = 0;
        self.offsets_of_follow_first.clear();
    }
}

/// Rollback checkpoint for one open lookaround.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssertionInfo {
    pub begin_label: Label,
    pub start_input_offset: CharCount,
    pub cont_stack_position: usize,
}

// ============================================================================
// Cont
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cont {
    /// Resume forward execution at a saved label and input offset.
    Resume {
        orig_input_offset: CharCount,
        orig_inst_label: Label,
    },
    RestoreLoop {
        loop_id: LoopId,
        orig_loop_info: LoopInfo,
    },
    RestoreGroup {
        group_id: GroupId,
        orig_group_info: GroupInfo,
    },
    ResetGroup {
        group_id: GroupId,
    },
    /// Reset every group in `from..=to`.
    ResetGroupRange {
        from_group_id: GroupId,
        to_group_id: GroupId,
    },
    /// Try one more iteration of a non-greedy loop.
    RepeatLoop {
        begin_label: Label,
        orig_input_offset: CharCount,
    },
    PopAssertion,
    RewindLoopFixed {
        begin_label: Label,
        trying_body: bool,
    },
    RewindLoopSet {
        begin_label: Label,
    },
    RewindLoopSetWithFollowFirst {
        begin_label: Label,
    },
    RewindLoopFixedGroupLastIteration {
        begin_label: Label,
        trying_body: bool,
    },
}

impl Cont {
    pub fn name(&self) -> &'static str {
        match self {
            Cont::Resume { .. } => "Resume",
            Cont::RestoreLoop { .. } => "RestoreLoop",
            Cont::RestoreGroup { .. } => "RestoreGroup",
            Cont::ResetGroup { .. } => "ResetGroup",
            Cont::ResetGroupRange { .. } => "ResetGroupRange",
            Cont::RepeatLoop { .. } => "RepeatLoop",
            Cont::PopAssertion => "PopAssertion",
            Cont::RewindLoopFixed { .. } => "RewindLoopFixed",
            Cont::RewindLoopSet { .. } => "RewindLoopSet",
            Cont::RewindLoopSetWithFollowFirst { .. } => "RewindLoopSetWithFollowFirst",
            Cont::RewindLoopFixedGroupLastIteration { .. } => "RewindLoopFixedGroupLastIteration",
        }
    }
}

impl fmt::Display for Cont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            Cont::Resume {
                orig_input_offset,
                orig_inst_label,
            } => write!(f, "(input:{}, label:{})", orig_input_offset, orig_inst_label),
            Cont::RestoreLoop {
                loop_id,
                orig_loop_info,
            } => write!(
                f,
                "(loop:{}, number:{}, start:{})",
                loop_id, orig_loop_info.number, orig_loop_info.start_input_offset
            ),
            Cont::RestoreGroup {
                group_id,
                orig_group_info,
            } => write!(f, "(group:{}, {})", group_id, orig_group_info),
            Cont::ResetGroup { group_id } => write!(f, "(group:{})", group_id),
            Cont::ResetGroupRange {
                from_group_id,
                to_group_id,
            } => write!(f, "(groups:{}-{})", from_group_id, to_group_id),
            Cont::RepeatLoop {
                begin_label,
                orig_input_offset,
            } => write!(f, "(begin:{}, input:{})", begin_label, orig_input_offset),
            Cont::PopAssertion => Ok(()),
            Cont::RewindLoopFixed {
                begin_label,
                trying_body,
            }
            | Cont::RewindLoopFixedGroupLastIteration {
                begin_label,
                trying_body,
            } => write!(f, "(begin:{}, tryingBody:{})", begin_label, trying_body),
            Cont::RewindLoopSet { begin_label } | Cont::RewindLoopSetWithFollowFirst { begin_label } => {
                write!(f, "(begin:{})", begin_label)
            }
        }
    }
}

// ============================================================================
// ContStack
// ============================================================================

/// LIFO stack of continuations. Growth failure and the configured depth
/// limit surface as errors rather than silently dropping records.
#[derive(Clone, Debug)]
pub struct ContStack {
    entries: Vec<Cont>,
    limit: u32,
    pushes: u64,
    pops: u64,
    high_water_mark: usize,
}

impl Default for ContStack {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ContStack {
    /// `limit` caps the number of records; 0 means unlimited.
    pub fn new(limit: u32) -> Self {
        ContStack {
            entries: Vec::with_capacity(INIT_CONT_STACK_SIZE),
            limit,
            pushes: 0,
            pops: 0,
            high_water_mark: 0,
        }
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[inline]
    pub fn push(&mut self, cont: Cont) -> Result<(), RegexError> {
        if self.limit != 0 && self.entries.len() >= self.limit as usize {
            return Err(RegexError::MatchStackLimitOver);
        }
        if self.entries.len() == self.entries.capacity() {
            self.entries.try_reserve(self.entries.len().max(INIT_CONT_STACK_SIZE))?;
        }
        self.entries.push(cont);
        self.pushes += 1;
        if self.entries.len() > self.high_water_mark {
            self.high_water_mark = self.entries.len();
        }
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Cont> {
        let cont = self.entries.pop();
        if cont.is_some() {
            self.pops += 1;
        }
        cont
    }

    #[inline]
    pub fn top(&self) -> Option<&Cont> {
        self.entries.last()
    }

    #[inline]
    pub fn top_mut(&mut self) -> Option<&mut Cont> {
        self.entries.last_mut()
    }

    /// Current depth, usable as a cut point for `pop_to`.
    #[inline]
    pub fn position(&self) -> usize {
        self.entries.len()
    }

    /// Drops every record above `position`.
    pub fn pop_to(&mut self, position: usize) {
        debug_assert!(position <= self.entries.len());
        self.entries.truncate(position);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Clears the push/pop counters and the high-water mark.
    pub fn reset_counters(&mut self) {
        self.pushes = 0;
        self.pops = 0;
        self.high_water_mark = self.entries.len();
    }

    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    pub fn pops(&self) -> u64 {
        self.pops
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Records from bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, Cont> {
        self.entries.iter()
    }
}

// ============================================================================
// AssertionStack
// ============================================================================

#[derive(Clone, Debug)]
pub struct AssertionStack {
    entries: Vec<AssertionInfo>,
}

impl Default for AssertionStack {
    fn default() -> Self {
        AssertionStack {
            entries: Vec::with_capacity(INIT_ASSERTION_STACK_SIZE),
        }
    }
}

impl AssertionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: AssertionInfo) -> Result<(), RegexError> {
        if self.entries.len() == self.entries.capacity() {
            self.entries.try_reserve(self.entries.len().max(INIT_ASSERTION_STACK_SIZE))?;
        }
        self.entries.push(info);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Option<AssertionInfo> {
        self.entries.pop()
    }

    #[inline]
    pub fn top(&self) -> Option<&AssertionInfo> {
        self.entries.last()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssertionInfo> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_reset_keeps_offset() {
        let mut info = GroupInfo::new(3, 2);
        assert_eq!(info.end_offset(), Some(5));
        info.reset();
        assert!(info.is_undefined());
        assert_eq!(info.offset, 3);
        assert_eq!(info.end_offset(), None);
        assert_eq!(info.to_string(), "<undefined>");
    }

    #[test]
    fn cont_stack_is_lifo() {
        let mut stack = ContStack::new(0);
        stack.push(Cont::ResetGroup { group_id: 1 }).unwrap();
        stack.push(Cont::PopAssertion).unwrap();
        assert_eq!(stack.position(), 2);
        assert_eq!(stack.pop(), Some(Cont::PopAssertion));
        assert_eq!(stack.pop(), Some(Cont::ResetGroup { group_id: 1 }));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.pushes(), 2);
        assert_eq!(stack.pops(), 2);
        assert_eq!(stack.high_water_mark(), 2);
    }

    #[test]
    fn cont_stack_pop_to_cuts() {
        let mut stack = ContStack::new(0);
        for id in 0..5 {
            stack.push(Cont::ResetGroup { group_id: id }).unwrap();
        }
        stack.pop_to(2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.top(), Some(&Cont::ResetGroup { group_id: 1 }));
    }

    #[test]
    fn cont_stack_limit() {
        let mut stack = ContStack::new(2);
        stack.push(Cont::PopAssertion).unwrap();
        stack.push(Cont::PopAssertion).unwrap();
        assert_eq!(stack.push(Cont::PopAssertion), Err(RegexError::MatchStackLimitOver));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn cont_stack_grows_past_initial_capacity() {
        let mut stack = ContStack::new(0);
        for i in 0..(INIT_CONT_STACK_SIZE * 3) {
            stack
                .push(Cont::Resume {
                    orig_input_offset: i as CharCount,
                    orig_inst_label: Label(0),
                })
                .unwrap();
        }
        assert_eq!(stack.len(), INIT_CONT_STACK_SIZE * 3);
    }

    #[test]
    fn assertion_stack() {
        let mut stack = AssertionStack::new();
        let info = AssertionInfo {
            begin_label: Label(2),
            start_input_offset: 4,
            cont_stack_position: 0,
        };
        stack.push(info).unwrap();
        assert_eq!(stack.top(), Some(&info));
        assert_eq!(stack.pop(), Some(info));
        assert!(stack.is_empty());
    }

    #[test]
    fn cont_display() {
        let cont = Cont::Resume {
            orig_input_offset: 3,
            orig_inst_label: Label(12),
        };
        assert_eq!(cont.to_string(), "Resume(input:3, label:L0012)");
        assert_eq!(
            Cont::ResetGroupRange {
                from_group_id: 1,
                to_group_id: 3
            }
            .to_string(),
            "ResetGroupRange(groups:1-3)"
        );
    }
}
