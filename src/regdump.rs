// regdump.rs - Human-readable listings of programs and matcher state.
//
// One line per instruction:
//   L0007: BeginLoop loop=0 repeats=[2-4] greedy exit=L0012 outer nondet
// Literal operands are shown as text when the literal buffer is at hand,
// otherwise as `lit@offset+length`.

use std::fmt::{self, Write};

use crate::reginst::{BodyGroupsMixin, Inst, LiteralMixin, SyncTarget};
use crate::regexec::Matcher;
use crate::regint::{Char, Label, EQUIV_CLASS_SIZE};
use crate::regprogram::{Program, ProgramRep};

fn write_char<W: Write>(w: &mut W, c: Char) -> fmt::Result {
    match char::from_u32(c as u32) {
        Some(ch) if ch.is_ascii_graphic() || ch == ' ' => write!(w, "'{}'", ch),
        _ => write!(w, "'\\u{:04x}'", c),
    }
}

fn write_text<W: Write>(w: &mut W, chars: &[Char]) -> fmt::Result {
    write!(w, "\"")?;
    for ch in char::decode_utf16(chars.iter().copied()) {
        match ch {
            Ok(ch) if !ch.is_control() => w.write_char(ch)?,
            Ok(ch) => write!(w, "\\u{:04x}", ch as u32)?,
            Err(e) => write!(w, "\\u{:04x}", e.unpaired_surrogate())?,
        }
    }
    write!(w, "\"")
}

fn write_literal<W: Write>(w: &mut W, lit: &LiteralMixin, equiv: bool, litbuf: &[Char]) -> fmt::Result {
    let span = if equiv { lit.equiv_span() } else { lit.span() };
    match litbuf.get(span) {
        Some(chars) if equiv => {
            // First member of each class is the pattern character.
            let pattern: Vec<Char> = chars.chunks_exact(EQUIV_CLASS_SIZE).map(|class| class[0]).collect();
            write!(w, " equiv ")?;
            write_text(w, &pattern)
        }
        Some(chars) => {
            write!(w, " ")?;
            write_text(w, chars)
        }
        None => write!(w, " lit@{}+{}", lit.offset, lit.length),
    }
}

fn write_body<W: Write>(w: &mut W, body: &BodyGroupsMixin) -> fmt::Result {
    match body.body_groups {
        Some(range) => write!(w, " groups={}-{}", range.from, range.to),
        None => Ok(()),
    }
}

fn write_sync_target<W: Write>(w: &mut W, target: &SyncTarget, litbuf: &[Char]) -> fmt::Result {
    match target {
        SyncTarget::Char(m) => {
            write!(w, " ")?;
            write_char(w, m.c)
        }
        SyncTarget::Char2Set(m) => {
            write!(w, " ")?;
            write_char(w, m.cs[0])?;
            write!(w, " ")?;
            write_char(w, m.cs[1])
        }
        SyncTarget::Set(m) | SyncTarget::NegatedSet(m) => write!(w, " {}", m.set),
        SyncTarget::Char2Literal(m) => write_literal(w, &m.literal, false, litbuf),
        SyncTarget::Literal(m) => write_literal(w, &m.literal, false, litbuf),
        SyncTarget::LinearLiteral(m) => write_literal(w, &m.literal, false, litbuf),
        SyncTarget::LiteralEquiv(m) | SyncTarget::LiteralEquivTrivialLastPatChar(m) => {
            write_literal(w, &m.literal, true, litbuf)
        }
    }
}

/// Writes the opcode name and operands of one instruction.
pub fn write_inst<W: Write>(w: &mut W, inst: &Inst, litbuf: &[Char]) -> fmt::Result {
    write!(w, "{}", inst.name())?;
    match inst {
        Inst::Fail | Inst::Succ | Inst::BolTest | Inst::EolTest | Inst::EndAssertion => Ok(()),
        Inst::Jump(j) => write!(w, " {}", j.target_label),
        Inst::JumpIfNotChar(c, j) | Inst::MatchCharOrJump(c, j) => {
            write!(w, " ")?;
            write_char(w, c.c)?;
            write!(w, " else={}", j.target_label)
        }
        Inst::JumpIfNotSet(s, j) | Inst::MatchSetOrJump(s, j) => {
            write!(w, " {} else={}", s.set, j.target_label)
        }
        Inst::Switch10(s) | Inst::Switch20(s) | Inst::SwitchAndConsume10(s) | Inst::SwitchAndConsume20(s) => {
            for case in s.cases.iter() {
                write!(w, " ")?;
                write_char(w, case.c)?;
                write!(w, "->{}", case.target_label)?;
            }
            Ok(())
        }
        Inst::BoiTest(h) | Inst::EoiTest(h) => {
            if h.can_hard_fail {
                write!(w, " hardfail")?;
            }
            Ok(())
        }
        Inst::WordBoundaryTest { is_negation } => {
            if *is_negation {
                write!(w, " not")?;
            }
            Ok(())
        }
        Inst::MatchChar(c) | Inst::OptMatchChar(c) => {
            write!(w, " ")?;
            write_char(w, c.c)
        }
        Inst::MatchChar2(m) => m.cs.iter().try_for_each(|&c| {
            write!(w, " ")?;
            write_char(w, c)
        }),
        Inst::MatchChar3(m) => m.cs.iter().try_for_each(|&c| {
            write!(w, " ")?;
            write_char(w, c)
        }),
        Inst::MatchChar4(m) => m.cs.iter().try_for_each(|&c| {
            write!(w, " ")?;
            write_char(w, c)
        }),
        Inst::MatchSet(s) | Inst::MatchNegatedSet(s) | Inst::OptMatchSet(s) => write!(w, " {}", s.set),
        Inst::MatchLiteral(lit) => write_literal(w, lit, false, litbuf),
        Inst::MatchLiteralEquiv(lit) => write_literal(w, lit, true, litbuf),
        Inst::MatchTrie(t) => write!(w, " {}", t.trie),
        Inst::SyncToAndContinue(t) | Inst::SyncToAndConsume(t) => write_sync_target(w, t, litbuf),
        Inst::SyncToAndBackup(t, b) => {
            write_sync_target(w, t, litbuf)?;
            write!(w, " backup={}", b.backup)
        }
        Inst::SyncToLiteralsAndBackup(s, b) => {
            for info in s.infos.iter() {
                let lit = LiteralMixin {
                    offset: info.offset,
                    length: info.length,
                };
                write_literal(w, &lit, info.is_equiv_class, litbuf)?;
            }
            write!(w, " backup={}", b.backup)
        }
        Inst::MatchGroup(g) | Inst::BeginDefineGroup(g) => write!(w, " group={}", g.group_id),
        Inst::EndDefineGroup(g, s) => {
            write!(w, " group={}", g.group_id)?;
            if s.no_need_to_save {
                write!(w, " nosave")?;
            }
            Ok(())
        }
        Inst::DefineGroupFixed(g, f, s) => {
            write!(w, " group={} length={}", g.group_id, f.length)?;
            if s.no_need_to_save {
                write!(w, " nosave")?;
            }
            Ok(())
        }
        Inst::BeginLoop { begin, body, is_greedy } => {
            write!(
                w,
                " loop={} repeats={} {} exit={}",
                begin.loop_id,
                begin.repeats,
                if *is_greedy { "greedy" } else { "lazy" },
                begin.exit_label
            )?;
            write_loop_flags(w, begin.has_outer_loops, begin.has_inner_nondet)?;
            write_body(w, body)
        }
        Inst::BeginLoopIfChar { c, begin, body } => {
            write!(w, " ")?;
            write_char(w, c.c)?;
            write!(w, " loop={} repeats={} exit={}", begin.loop_id, begin.repeats, begin.exit_label)?;
            write_loop_flags(w, begin.has_outer_loops, begin.has_inner_nondet)?;
            write_body(w, body)
        }
        Inst::BeginLoopIfSet { set, begin, body } => {
            write!(
                w,
                " {} loop={} repeats={} exit={}",
                set.set, begin.loop_id, begin.repeats, begin.exit_label
            )?;
            write_loop_flags(w, begin.has_outer_loops, begin.has_inner_nondet)?;
            write_body(w, body)
        }
        Inst::BeginLoopFixed { begin, length } => {
            write!(
                w,
                " loop={} repeats={} length={} exit={}",
                begin.loop_id, begin.repeats, length.length, begin.exit_label
            )?;
            write_loop_flags(w, begin.has_outer_loops, begin.has_inner_nondet)
        }
        Inst::BeginLoopFixedGroupLastIteration {
            begin,
            length,
            group,
            save,
        } => {
            write!(
                w,
                " loop={} repeats={} length={} group={} exit={}",
                begin.loop_id, begin.repeats, length.length, group.group_id, begin.exit_label
            )?;
            if save.no_need_to_save {
                write!(w, " nosave")?;
            }
            write_loop_flags(w, begin.has_outer_loops, begin.has_inner_nondet)
        }
        Inst::BeginGreedyLoopNoBacktrack { loop_id, exit_label } => {
            write!(w, " loop={} exit={}", loop_id, exit_label)
        }
        Inst::RepeatLoop(r)
        | Inst::RepeatLoopIfChar(r)
        | Inst::RepeatLoopIfSet(r)
        | Inst::RepeatLoopFixed(r)
        | Inst::RepeatLoopFixedGroupLastIteration(r)
        | Inst::RepeatGreedyLoopNoBacktrack(r) => write!(w, " begin={}", r.begin_label),
        Inst::LoopSet { set, lp } => {
            write!(w, " {} loop={} repeats={}", set.set, lp.loop_id, lp.repeats)?;
            write_loop_flags(w, lp.has_outer_loops, false)
        }
        Inst::LoopSetWithFollowFirst { set, lp, follow_first } => {
            write!(w, " {} loop={} repeats={} follow=", set.set, lp.loop_id, lp.repeats)?;
            write_char(w, *follow_first)?;
            write_loop_flags(w, lp.has_outer_loops, false)
        }
        Inst::ChompChar(c, _) => {
            write!(w, " ")?;
            write_char(w, c.c)
        }
        Inst::ChompSet(s, _) => write!(w, " {}", s.set),
        Inst::ChompCharGroup { c, group, save, .. } => {
            write!(w, " ")?;
            write_char(w, c.c)?;
            write!(w, " group={}", group.group_id)?;
            if save.no_need_to_save {
                write!(w, " nosave")?;
            }
            Ok(())
        }
        Inst::ChompSetGroup { set, group, save, .. } => {
            write!(w, " {} group={}", set.set, group.group_id)?;
            if save.no_need_to_save {
                write!(w, " nosave")?;
            }
            Ok(())
        }
        Inst::ChompCharBounded(c, b) => {
            write!(w, " ")?;
            write_char(w, c.c)?;
            write!(w, " repeats={}", b.repeats)
        }
        Inst::ChompSetBounded(s, b) => write!(w, " {} repeats={}", s.set, b.repeats),
        Inst::ChompSetBoundedGroupLastChar {
            set,
            repeats,
            group,
            save,
        } => {
            write!(w, " {} repeats={} group={}", set.set, repeats.repeats, group.group_id)?;
            if save.no_need_to_save {
                write!(w, " nosave")?;
            }
            Ok(())
        }
        Inst::Try(t) => write!(w, " else={}", t.fail_label),
        Inst::TryIfChar(c, t) | Inst::TryMatchChar(c, t) => {
            write!(w, " ")?;
            write_char(w, c.c)?;
            write!(w, " else={}", t.fail_label)
        }
        Inst::TryIfSet(s, t) | Inst::TryMatchSet(s, t) => write!(w, " {} else={}", s.set, t.fail_label),
        Inst::BeginAssertion {
            is_negation,
            body,
            next_label,
        } => {
            write!(w, " {} next={}", if *is_negation { "negative" } else { "positive" }, next_label)?;
            write_body(w, body)
        }
    }
}

fn write_loop_flags<W: Write>(w: &mut W, has_outer_loops: bool, has_inner_nondet: bool) -> fmt::Result {
    if has_outer_loops {
        write!(w, " outer")?;
    }
    if has_inner_nondet {
        write!(w, " nondet")?;
    }
    Ok(())
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_inst(f, self, &[])
    }
}

/// Writes a full program listing.
pub fn dump_program<W: Write>(w: &mut W, program: &Program) -> fmt::Result {
    writeln!(
        w,
        "Program /{}/ tag={} flags={:?} groups={} loops={}",
        program.source(),
        program.tag().name(),
        program.flags(),
        program.num_groups(),
        program.num_loops()
    )?;
    match program.rep() {
        ProgramRep::Instructions { insts, litbuf, .. } => {
            if !litbuf.is_empty() {
                write!(w, "litbuf: ")?;
                write_text(w, litbuf)?;
                writeln!(w)?;
            }
            for (idx, inst) in insts.iter().enumerate() {
                write!(w, "{}: ", Label(idx as u32))?;
                write_inst(w, inst, litbuf)?;
                writeln!(w)?;
            }
            Ok(())
        }
        ProgramRep::SingleChar { c } => {
            write!(w, "char ")?;
            write_char(w, *c)?;
            writeln!(w)
        }
        ProgramRep::BoundedWord => Ok(()),
        ProgramRep::LeadingTrailingSpaces {
            begin_min_match,
            end_min_match,
        } => writeln!(w, "begin min {} end min {}", begin_min_match, end_min_match),
        ProgramRep::Octoquad(matcher) => writeln!(w, "{}", matcher),
        ProgramRep::BoiLiteral2 { literal } => {
            write_text(w, literal)?;
            writeln!(w)
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dump_program(f, self)
    }
}

/// Writes the matcher's group, loop and stack state.
pub fn dump_matcher<W: Write>(w: &mut W, matcher: &Matcher) -> fmt::Result {
    writeln!(w, "groups:")?;
    for (id, info) in matcher.groups().iter().enumerate() {
        writeln!(w, "  {}: {}", id, info)?;
    }
    if !matcher.loops().is_empty() {
        writeln!(w, "loops:")?;
        for (id, info) in matcher.loops().iter().enumerate() {
            writeln!(w, "  {}: number={} start={}", id, info.number, info.start_input_offset)?;
        }
    }
    writeln!(w, "cont stack ({}):", matcher.cont_stack().len())?;
    for (depth, cont) in matcher.cont_stack().iter().enumerate() {
        writeln!(w, "  [{}] {}", depth, cont)?;
    }
    if !matcher.assertion_stack().is_empty() {
        writeln!(w, "assertions ({}):", matcher.assertion_stack().len())?;
        for info in matcher.assertion_stack().iter() {
            writeln!(
                w,
                "  begin={} input={} stack={}",
                info.begin_label, info.start_input_offset, info.cont_stack_position
            )?;
        }
    }
    if let Some(stats) = matcher.stats() {
        writeln!(w, "{}", stats)?;
    }
    Ok(())
}

impl Matcher {
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = dump_matcher(&mut out, self);
        out
    }
}
