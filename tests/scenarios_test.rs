// scenarios_test.rs - End-to-end scenarios and matcher-wide properties.

use std::sync::Arc;

use regvm::charset::RuntimeCharSet;
use regvm::prelude::*;
use regvm::regcont::GroupInfo;
use regvm::reginst::{
    BackupMixin, BeginLoopMixin, BodyGroupsMixin, CharMixin, ChompBoundedMixin, FixedLengthMixin, GroupMixin,
    GroupRange, HardFailMixin, Inst, JumpMixin, NoNeedToSaveMixin, RepeatLoopMixin, SetMixin, SyncTarget,
    TryMixin,
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

/// `ab|ac`
fn alternation() -> Matcher {
    let mut b = ProgramBuilder::new("ab|ac", RegexFlags::empty());
    let alt = b.new_label();
    let done = b.new_label();
    b.emit(Inst::Try(TryMixin { fail_label: alt }));
    b.emit(Inst::MatchChar(ch('a')));
    b.emit(Inst::MatchChar(ch('b')));
    b.emit(Inst::Jump(JumpMixin { target_label: done }));
    b.bind(alt);
    b.emit(Inst::MatchChar(ch('a')));
    b.emit(Inst::MatchChar(ch('c')));
    b.bind(done);
    b.emit(Inst::Succ);
    matcher(b)
}

/// `(?!(foo))bar`, optionally sticky.
fn negative_lookahead(sticky: bool) -> Matcher {
    let mut b = ProgramBuilder::new("(?!(foo))bar", RegexFlags::empty());
    if sticky {
        b = b.sticky();
    }
    let g = b.new_group();
    let after = b.new_label();
    let foo = b.literal(&u("foo"));
    let bar = b.literal(&u("bar"));
    b.emit(Inst::BeginAssertion {
        is_negation: true,
        body: BodyGroupsMixin {
            body_groups: Some(GroupRange::single(g)),
        },
        next_label: after,
    });
    b.emit(Inst::BeginDefineGroup(GroupMixin { group_id: g }));
    b.emit(Inst::MatchLiteral(foo));
    b.emit(Inst::EndDefineGroup(
        GroupMixin { group_id: g },
        NoNeedToSaveMixin { no_need_to_save: false },
    ));
    b.emit(Inst::EndAssertion);
    b.bind(after);
    b.emit(Inst::MatchLiteral(bar));
    b.emit(Inst::Succ);
    matcher(b)
}

/// `(a)` followed by an anchor that hard fails on mismatch.
fn group_then_anchor(anchor: Inst, sticky: bool) -> Matcher {
    let mut b = ProgramBuilder::new("(a)", RegexFlags::empty());
    if sticky {
        b = b.sticky();
    }
    let g = b.new_group();
    b.emit(Inst::BeginDefineGroup(GroupMixin { group_id: g }));
    b.emit(Inst::MatchChar(ch('a')));
    b.emit(Inst::EndDefineGroup(
        GroupMixin { group_id: g },
        NoNeedToSaveMixin { no_need_to_save: false },
    ));
    b.emit(anchor);
    b.emit(Inst::Succ);
    matcher(b)
}

/// `(a)(b)c` with groups the compiler proved need no restore, optionally sticky.
fn unsaved_groups(sticky: bool) -> Matcher {
    let mut b = ProgramBuilder::new("(a)(b)c", RegexFlags::empty());
    if sticky {
        b = b.sticky();
    }
    for c in ['a', 'b'] {
        let g = b.new_group();
        b.emit(Inst::BeginDefineGroup(GroupMixin { group_id: g }));
        b.emit(Inst::MatchChar(ch(c)));
        b.emit(Inst::EndDefineGroup(
            GroupMixin { group_id: g },
            NoNeedToSaveMixin { no_need_to_save: true },
        ));
    }
    b.emit(Inst::MatchChar(ch('c')));
    b.emit(Inst::Succ);
    matcher(b)
}

// === Scenario A ===

#[test]
fn scenario_a_single_char_search() {
    let mut b = ProgramBuilder::new("a", RegexFlags::empty());
    b.emit(Inst::MatchChar(ch('a')));
    b.emit(Inst::Succ);
    let mut m = matcher(b);
    assert!(m.match_at(&u("ba"), 0).unwrap());
    assert!(m.was_last_match_successful());
    assert_eq!(m.group(0), Some(GroupInfo::new(1, 1)));
}

// === Scenario B ===

#[test]
fn scenario_b_alternation_backtracks_through_resume() {
    let mut m = alternation();
    m.enable_stats();
    assert!(m.match_at(&u("xac"), 0).unwrap());
    assert_eq!(m.group(0), Some(GroupInfo::new(1, 2)));
    let stats = m.stats().unwrap();
    assert_eq!(stats.num_attempts, 2);
    assert!(stats.num_pops >= 2);
}

// === Scenario C ===

#[test]
fn scenario_c_anchor_fails_immediately() {
    let mut b = ProgramBuilder::new("^abc", RegexFlags::empty());
    let abc = b.literal(&u("abc"));
    b.emit(Inst::BoiTest(HardFailMixin { can_hard_fail: true }));
    b.emit(Inst::MatchLiteral(abc));
    b.emit(Inst::Succ);
    let mut m = matcher(b);
    m.enable_stats();
    assert!(!m.match_at(&u("xabc"), 0).unwrap());
    // Offset 0 fails normally, offset 1 fails the anchor and ends the search.
    assert_eq!(m.stats().unwrap().num_attempts, 2);
    assert!(m.groups().iter().all(GroupInfo::is_undefined));
}

// === Scenario D ===

#[test]
fn scenario_d_bounded_greedy_loop() {
    // (?:a){2,4}
    let mut b = ProgramBuilder::new("a{2,4}", RegexFlags::empty());
    let lp = b.new_loop();
    let exit = b.new_label();
    let begin = b.emit(Inst::BeginLoop {
        begin: BeginLoopMixin {
            loop_id: lp,
            repeats: CountDomain::new(2, 4),
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
    b.emit(Inst::Succ);
    let mut m = matcher(b);
    assert!(m.match_at(&u("aaaaa"), 0).unwrap());
    assert_eq!(m.group(0), Some(GroupInfo::new(0, 4)));
}

#[test]
fn scenario_d_fixed_loop_agrees() {
    let mut b = ProgramBuilder::new("a{2,4}", RegexFlags::empty());
    let lp = b.new_loop();
    let exit = b.new_label();
    let begin = b.emit(Inst::BeginLoopFixed {
        begin: BeginLoopMixin {
            loop_id: lp,
            repeats: CountDomain::new(2, 4),
            has_outer_loops: false,
            has_inner_nondet: false,
            exit_label: exit,
        },
        length: FixedLengthMixin { length: 1 },
    });
    b.emit(Inst::MatchChar(ch('a')));
    b.emit(Inst::RepeatLoopFixed(RepeatLoopMixin { begin_label: begin }));
    b.bind(exit);
    b.emit(Inst::Succ);
    let mut m = matcher(b);
    assert!(m.match_at(&u("aaaaa"), 0).unwrap());
    assert_eq!(m.group(0), Some(GroupInfo::new(0, 4)));
}

#[test]
fn scenario_d_chomp_agrees() {
    let mut b = ProgramBuilder::new("a{2,4}", RegexFlags::empty());
    b.emit(Inst::ChompCharBounded(
        ch('a'),
        ChompBoundedMixin {
            repeats: CountDomain::new(2, 4),
        },
    ));
    b.emit(Inst::Succ);
    let mut m = matcher(b);
    assert!(m.match_at(&u("aaaaa"), 0).unwrap());
    assert_eq!(m.group(0), Some(GroupInfo::new(0, 4)));
}

// === Scenario E ===

#[test]
fn scenario_e_negative_lookahead_rejects_position() {
    let mut m = negative_lookahead(true);
    let input = u("xfoobar");
    assert!(!m.match_at(&input, 1).unwrap());
    assert!(!m.was_last_match_successful());
    // The group written inside the assertion is rolled back.
    assert!(m.group(1).unwrap().is_undefined());
    assert!(m.assertion_stack().is_empty());
}

#[test]
fn scenario_e_search_finds_later_bar() {
    let mut m = negative_lookahead(false);
    assert!(m.match_at(&u("xfoobar"), 0).unwrap());
    assert_eq!(m.group(0), Some(GroupInfo::new(4, 3)));
    assert!(m.group(1).unwrap().is_undefined());
}

// === Properties ===

fn assert_result_after_start_or_undefined(m: &mut Matcher, inputs: &[&str]) {
    for input in inputs {
        let input = u(input);
        for offset in 0..=input.len() + 1 {
            let found = m.match_at(&input, offset as CharCount).unwrap();
            if found {
                let g = m.group(0).unwrap();
                assert!(g.offset as usize >= offset);
                assert!(g.end_offset().unwrap() as usize <= input.len());
            } else {
                assert!(
                    m.groups().iter().all(GroupInfo::is_undefined),
                    "groups left bound on {:?} at {}: {:?}",
                    String::from_utf16_lossy(&input),
                    offset,
                    m.groups()
                );
            }
        }
    }
}

#[test]
fn result_is_after_start_offset_or_fully_undefined() {
    let inputs = ["", "a", "ab", "xacab", "acacac", "bbbb"];
    assert_result_after_start_or_undefined(&mut alternation(), &inputs);
}

#[test]
fn hard_fail_exits_leave_groups_undefined() {
    let inputs = ["", "a", "aa", "ab", "ba", "xab"];
    for sticky in [false, true] {
        // (a)^ stops the search outright
        let mut m = group_then_anchor(Inst::BoiTest(HardFailMixin { can_hard_fail: true }), sticky);
        assert_result_after_start_or_undefined(&mut m, &inputs);
        // (a)$ drops pending choicepoints and moves on
        let mut m = group_then_anchor(Inst::EoiTest(HardFailMixin { can_hard_fail: true }), sticky);
        assert_result_after_start_or_undefined(&mut m, &inputs);
    }

    let mut m = group_then_anchor(Inst::BoiTest(HardFailMixin { can_hard_fail: true }), false);
    assert!(!m.match_at(&u("a"), 0).unwrap());
    assert!(m.group(1).unwrap().is_undefined());

    let mut m = group_then_anchor(Inst::EoiTest(HardFailMixin { can_hard_fail: true }), true);
    assert!(!m.match_at(&u("ab"), 0).unwrap());
    assert!(m.group(1).unwrap().is_undefined());
    assert!(m.match_at(&u("a"), 0).unwrap());
    assert_eq!(m.group(1), Some(GroupInfo::new(0, 1)));
}

#[test]
fn unsaved_groups_are_undefined_after_no_match() {
    let inputs = ["", "a", "ab", "abc", "abx", "aabab", "xabc"];
    for sticky in [false, true] {
        assert_result_after_start_or_undefined(&mut unsaved_groups(sticky), &inputs);
    }

    let mut m = unsaved_groups(true);
    assert!(m.match_at(&u("abc"), 0).unwrap());
    assert_eq!(m.group(2), Some(GroupInfo::new(1, 1)));
    assert!(!m.match_at(&u("abd"), 0).unwrap());
    assert!(m.groups().iter().all(GroupInfo::is_undefined));
}

#[test]
fn repeated_calls_are_deterministic() {
    let mut reused = alternation();
    let input = u("zzab zac");
    let first = reused.match_at(&input, 3).unwrap();
    let first_groups = reused.groups().to_vec();
    for _ in 0..3 {
        assert_eq!(reused.match_at(&input, 3).unwrap(), first);
        assert_eq!(reused.groups(), &first_groups[..]);
    }
    let mut fresh = reused.clone_context();
    assert_eq!(fresh.match_at(&input, 3).unwrap(), first);
    assert_eq!(fresh.groups(), &first_groups[..]);
}

#[test]
fn bounded_backup_stays_within_domain() {
    // [a-z]{1,2}c found through the "c"
    let lower = RuntimeCharSet::from_ranges(&[(b'a' as Char, b'z' as Char)]);
    let backup = CountDomain::new(1, 2);
    let mut b = ProgramBuilder::new("[a-z]{1,2}c", RegexFlags::empty());
    b.emit(Inst::SyncToAndBackup(SyncTarget::Char(ch('c')), BackupMixin { backup }));
    b.emit(Inst::ChompSetBounded(SetMixin { set: lower }, ChompBoundedMixin { repeats: backup }));
    b.emit(Inst::MatchChar(ch('c')));
    b.emit(Inst::Succ);
    let mut m = matcher(b);

    assert!(m.match_at(&u("xx abc"), 0).unwrap());
    assert_eq!(m.group_range(0), Some(3..6));
    assert!(m.match_at(&u("abc"), 0).unwrap());
    assert_eq!(m.group_range(0), Some(0..3));
    // No room for the minimum backup before the only "c".
    assert!(!m.match_at(&u("c"), 0).unwrap());
}

#[test]
fn unbounded_backup_restarts_at_match_start() {
    // [ab]*c found through the "c"
    let ab = RuntimeCharSet::from_chars(&[b'a' as Char, b'b' as Char]);
    let mut b = ProgramBuilder::new("[ab]*c", RegexFlags::empty());
    b.emit(Inst::SyncToAndBackup(
        SyncTarget::Char(ch('c')),
        BackupMixin {
            backup: CountDomain::at_least(0),
        },
    ));
    b.emit(Inst::ChompSet(SetMixin { set: ab }, ChompMode::Star));
    b.emit(Inst::MatchChar(ch('c')));
    b.emit(Inst::Succ);
    let mut m = matcher(b);
    assert!(m.match_at(&u("  abc"), 0).unwrap());
    assert_eq!(m.group_range(0), Some(2..5));
}

#[test]
fn reset_keeps_group_offset() {
    let mut m = negative_lookahead(true);
    assert!(!m.match_at(&u("xfoobar"), 1).unwrap());
    let g = m.group(1).unwrap();
    assert!(g.is_undefined());
    assert_eq!(g.offset, 1);
}
