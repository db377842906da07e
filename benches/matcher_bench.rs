// Criterion benchmark suite: instruction programs vs whole-program fast paths
//
// Run: cargo bench
// Specific group: cargo bench -- sync
// HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use regvm::charset::RuntimeCharSet;
use regvm::chartrie::RuntimeCharTrie;
use regvm::prelude::*;
use regvm::reginst::{
    BackupMixin, BeginLoopMixin, BodyGroupsMixin, CharMixin, ChompBoundedMixin, Inst, JumpMixin,
    RepeatLoopMixin, SetMixin, TrieMixin, TryMixin,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn u(s: &str) -> Vec<Char> {
    s.encode_utf16().collect()
}

fn haystack(filler: &str, needle: &str, repeat: usize) -> Vec<Char> {
    let mut text = filler.repeat(repeat);
    text.push_str(needle);
    u(&text)
}

fn run(m: &mut Matcher, text: &[Char]) -> bool {
    m.match_at(black_box(text), 0).unwrap_or(false)
}

fn plain_literal(lit: &str) -> Program {
    let mut b = ProgramBuilder::new(lit, RegexFlags::empty());
    let chars = u(lit);
    let literal = b.literal(&chars);
    b.emit(Inst::MatchLiteral(literal));
    b.emit(Inst::Succ);
    b.finish().unwrap()
}

fn synced_literal(lit: &str) -> Program {
    let mut b = ProgramBuilder::new(lit, RegexFlags::empty());
    let target = b.sync_literal(&u(lit));
    b.emit(Inst::SyncToAndConsume(target));
    b.emit(Inst::Succ);
    b.finish().unwrap()
}

// ---------------------------------------------------------------------------
// Sync vs plain start-offset loop
// ---------------------------------------------------------------------------

fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync");

    let cases: &[(&str, &str)] = &[("short", "needle"), ("long", "a_rather_long_needle_here")];
    for &(name, lit) in cases {
        let text = haystack("haystack ", lit, 500);
        let mut plain = Matcher::new(Arc::new(plain_literal(lit)));
        let mut synced = Matcher::new(Arc::new(synced_literal(lit)));

        group.bench_with_input(BenchmarkId::new("plain", name), &text[..], |b, text| {
            b.iter(|| run(&mut plain, text))
        });
        group.bench_with_input(BenchmarkId::new("synced", name), &text[..], |b, text| {
            b.iter(|| run(&mut synced, text))
        });
    }

    let text = haystack("haystack ", "dog", 500);
    let mut b = ProgramBuilder::new("cat|dog|cow", RegexFlags::empty());
    let scanners = b.scanners(&[&u("cat"), &u("dog"), &u("cow")], None);
    b.emit(Inst::SyncToLiteralsAndBackup(
        scanners,
        BackupMixin {
            backup: CountDomain::exactly(0),
        },
    ));
    b.emit(Inst::MatchTrie(TrieMixin {
        trie: RuntimeCharTrie::from_literals([u("cat"), u("dog"), u("cow")]),
    }));
    b.emit(Inst::Succ);
    let mut m = Matcher::new(Arc::new(b.finish().unwrap()));
    group.bench_with_input(BenchmarkId::new("literals", "three"), &text[..], |b, text| {
        b.iter(|| run(&mut m, text))
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

fn bench_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("loops");
    let text = haystack("a", "b", 1000);

    // (?:a)*b as a counted loop
    let mut b = ProgramBuilder::new("(?:a)*b", RegexFlags::empty());
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
    b.emit(Inst::MatchChar(CharMixin { c: b'a' as Char }));
    b.emit(Inst::RepeatLoop(RepeatLoopMixin { begin_label: begin }));
    b.bind(exit);
    b.emit(Inst::MatchChar(CharMixin { c: b'b' as Char }));
    b.emit(Inst::Succ);
    let mut counted = Matcher::new(Arc::new(b.finish().unwrap()));

    // (?:a)*b as raw choicepoints
    let mut b = ProgramBuilder::new("(?:a)*b", RegexFlags::empty());
    let top = b.here();
    let done = b.new_label();
    b.emit(Inst::Try(TryMixin { fail_label: done }));
    b.emit(Inst::MatchChar(CharMixin { c: b'a' as Char }));
    b.emit(Inst::Jump(JumpMixin { target_label: top }));
    b.bind(done);
    b.emit(Inst::MatchChar(CharMixin { c: b'b' as Char }));
    b.emit(Inst::Succ);
    let mut choicepoints = Matcher::new(Arc::new(b.finish().unwrap()));

    // a*b as a chomp
    let mut b = ProgramBuilder::new("a*b", RegexFlags::empty());
    b.emit(Inst::ChompChar(CharMixin { c: b'a' as Char }, ChompMode::Star));
    b.emit(Inst::MatchChar(CharMixin { c: b'b' as Char }));
    b.emit(Inst::Succ);
    let mut chomp = Matcher::new(Arc::new(b.finish().unwrap()));

    // [a-z]{0,1000}b as a bounded chomp
    let mut b = ProgramBuilder::new("[a-z]{0,1000}b", RegexFlags::empty());
    b.emit(Inst::ChompSetBounded(
        SetMixin {
            set: RuntimeCharSet::from_ranges(&[(b'a' as Char, b'z' as Char)]),
        },
        ChompBoundedMixin {
            repeats: CountDomain::new(0, 1000),
        },
    ));
    b.emit(Inst::MatchChar(CharMixin { c: b'b' as Char }));
    b.emit(Inst::Succ);
    let mut bounded = Matcher::new(Arc::new(b.finish().unwrap()));

    group.bench_with_input("counted", &text[..], |b, text| b.iter(|| run(&mut counted, text)));
    group.bench_with_input("choicepoints", &text[..], |b, text| b.iter(|| run(&mut choicepoints, text)));
    group.bench_with_input("chomp", &text[..], |b, text| b.iter(|| run(&mut chomp, text)));
    group.bench_with_input("bounded_chomp", &text[..], |b, text| b.iter(|| run(&mut bounded, text)));
    group.finish();
}

// ---------------------------------------------------------------------------
// Fast paths vs equivalent instruction programs
// ---------------------------------------------------------------------------

fn bench_fast_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("fast_paths");
    let text = haystack("   lorem ipsum ", "dolor", 200);

    let mut fast = Matcher::new(Arc::new(Program::single_char("z", RegexFlags::empty(), b'z' as Char)));
    let mut b = ProgramBuilder::new("z", RegexFlags::empty());
    b.emit(Inst::MatchChar(CharMixin { c: b'z' as Char }));
    b.emit(Inst::Succ);
    let mut general = Matcher::new(Arc::new(b.finish().unwrap()));
    group.bench_with_input(BenchmarkId::new("fast", "single_char"), &text[..], |b, text| {
        b.iter(|| run(&mut fast, text))
    });
    group.bench_with_input(BenchmarkId::new("general", "single_char"), &text[..], |b, text| {
        b.iter(|| run(&mut general, text))
    });

    let mut fast = Matcher::new(Arc::new(Program::bounded_word("\\b\\w+\\b", RegexFlags::empty())));
    let mut b = ProgramBuilder::new("\\b\\w+\\b", RegexFlags::empty());
    b.emit(Inst::WordBoundaryTest { is_negation: false });
    b.emit(Inst::ChompSet(
        SetMixin {
            set: regvm::stdchars::word_set(),
        },
        ChompMode::Plus,
    ));
    b.emit(Inst::WordBoundaryTest { is_negation: false });
    b.emit(Inst::Succ);
    let mut general = Matcher::new(Arc::new(b.finish().unwrap()));
    group.bench_with_input(BenchmarkId::new("fast", "bounded_word"), &text[..], |b, text| {
        b.iter(|| {
            let mut offset = 0;
            while fast.match_at(black_box(text), offset).unwrap_or(false) {
                offset = fast.group(0).and_then(|g| g.end_offset()).unwrap_or(CharCount::MAX);
            }
        })
    });
    group.bench_with_input(BenchmarkId::new("general", "bounded_word"), &text[..], |b, text| {
        b.iter(|| {
            let mut offset = 0;
            while general.match_at(black_box(text), offset).unwrap_or(false) {
                offset = general.group(0).and_then(|g| g.end_offset()).unwrap_or(CharCount::MAX);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sync, bench_loops, bench_fast_paths);
criterion_main!(benches);
