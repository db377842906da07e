// stdchars.rs - Standard character classes and case equivalence.
//
// Word, newline and whitespace predicates follow the ECMAScript
// definitions. Case-equivalence classes come from a provider trait so a
// host can plug in full Unicode tables; the built-in provider uses the
// simple (1:1, BMP-only) mappings from the standard library.

use smallvec::{smallvec, SmallVec};

use crate::charset::RuntimeCharSet;
use crate::regint::{Char, MappingSource, EQUIV_CLASS_SIZE};

// === Standard Classes ===

#[inline]
pub fn is_word(c: Char) -> bool {
    c < 128 && ((c as u8).is_ascii_alphanumeric() || c == b'_' as Char)
}

#[inline]
pub fn is_newline(c: Char) -> bool {
    matches!(c, 0x000a | 0x000d | 0x2028 | 0x2029)
}

#[inline]
pub fn is_whitespace_or_newline(c: Char) -> bool {
    matches!(
        c,
        0x0009..=0x000d
            | 0x0020
            | 0x00a0
            | 0x1680
            | 0x2000..=0x200a
            | 0x2028
            | 0x2029
            | 0x202f
            | 0x205f
            | 0x3000
            | 0xfeff
    )
}

const WORD_RANGES: &[(Char, Char)] = &[(0x30, 0x39), (0x41, 0x5a), (0x5f, 0x5f), (0x61, 0x7a)];
const NEWLINE_RANGES: &[(Char, Char)] = &[(0x0a, 0x0a), (0x0d, 0x0d), (0x2028, 0x2029)];
const WHITESPACE_RANGES: &[(Char, Char)] = &[
    (0x0009, 0x000d),
    (0x0020, 0x0020),
    (0x00a0, 0x00a0),
    (0x1680, 0x1680),
    (0x2000, 0x200a),
    (0x2028, 0x2029),
    (0x202f, 0x202f),
    (0x205f, 0x205f),
    (0x3000, 0x3000),
    (0xfeff, 0xfeff),
];

pub fn word_set() -> RuntimeCharSet {
    RuntimeCharSet::from_ranges(WORD_RANGES)
}

pub fn newline_set() -> RuntimeCharSet {
    RuntimeCharSet::from_ranges(NEWLINE_RANGES)
}

pub fn whitespace_set() -> RuntimeCharSet {
    RuntimeCharSet::from_ranges(WHITESPACE_RANGES)
}

// ============================================================================
// Case Equivalence
// ============================================================================

/// Source of case-equivalence classes for case-insensitive matching.
pub trait CaseEquivalence: Send + Sync {
    /// Equivalence class of `c`, with `c` first and unused slots repeating members.
    fn equivs(&self, source: MappingSource, c: Char) -> [Char; EQUIV_CLASS_SIZE];

    fn equals(&self, source: MappingSource, a: Char, b: Char) -> bool {
        a == b || self.equivs(source, a).contains(&b) || self.equivs(source, b).contains(&a)
    }
}

/// Built-in provider based on `char::to_lowercase`/`to_uppercase`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleCaseEquivalence;

// Folds that the 1:1 upper/lower round trip does not close over.
const EXTRA_FOLDS: &[(Char, Char)] = &[
    (0x0073, 0x017f),
    (0x0053, 0x017f),
    (0x006b, 0x212a),
    (0x004b, 0x212a),
    (0x00e5, 0x212b),
    (0x00c5, 0x212b),
    (0x03bc, 0x00b5),
    (0x039c, 0x00b5),
];

fn single_mapping<I: Iterator<Item = char>>(mut mapped: I, c: Char) -> Char {
    match (mapped.next(), mapped.next()) {
        (Some(m), None) => Char::try_from(m as u32).unwrap_or(c),
        _ => c,
    }
}

#[inline]
fn simple_lower(c: Char) -> Char {
    char::from_u32(c as u32).map_or(c, |ch| single_mapping(ch.to_lowercase(), c))
}

#[inline]
fn simple_upper(c: Char) -> Char {
    char::from_u32(c as u32).map_or(c, |ch| single_mapping(ch.to_uppercase(), c))
}

impl CaseEquivalence for SimpleCaseEquivalence {
    fn equivs(&self, source: MappingSource, c: Char) -> [Char; EQUIV_CLASS_SIZE] {
        let mut class = [c; EQUIV_CLASS_SIZE];
        let mut n = 1;
        let lower = simple_lower(c);
        let upper = simple_upper(c);
        let mut candidates: SmallVec<[Char; 8]> =
            smallvec![lower, upper, simple_lower(upper), simple_upper(lower)];
        if source == MappingSource::CaseFolding {
            for &(a, b) in EXTRA_FOLDS {
                if candidates.contains(&a) || c == a {
                    candidates.push(b);
                } else if c == b {
                    candidates.push(a);
                    candidates.push(simple_upper(a));
                }
            }
        }
        for e in candidates {
            // Legacy mappings never cross between ASCII and non-ASCII.
            if source == MappingSource::UnicodeData && (c < 128) != (e < 128) {
                continue;
            }
            if n < EQUIV_CLASS_SIZE && !class[..n].contains(&e) {
                class[n] = e;
                n += 1;
            }
        }
        class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char) -> Char {
        c as Char
    }

    #[test]
    fn word_chars() {
        assert!(is_word(ch('a')));
        assert!(is_word(ch('Z')));
        assert!(is_word(ch('0')));
        assert!(is_word(ch('_')));
        assert!(!is_word(ch('-')));
        assert!(!is_word(0xe9));
        assert!(word_set().contains(ch('_')));
    }

    #[test]
    fn newline_and_whitespace() {
        assert!(is_newline(0x0a));
        assert!(is_newline(0x2029));
        assert!(!is_newline(0x20));
        assert!(is_whitespace_or_newline(0x20));
        assert!(is_whitespace_or_newline(0xfeff));
        assert!(is_whitespace_or_newline(0x2005));
        assert!(!is_whitespace_or_newline(ch('x')));
        let ws = whitespace_set();
        for c in 0..=0xffffu32 {
            assert_eq!(ws.contains(c as Char), is_whitespace_or_newline(c as Char));
        }
    }

    #[test]
    fn ascii_equivalence() {
        let eq = SimpleCaseEquivalence;
        let class = eq.equivs(MappingSource::UnicodeData, ch('a'));
        assert_eq!(class[0], ch('a'));
        assert!(class.contains(&ch('A')));
        assert!(eq.equals(MappingSource::UnicodeData, ch('q'), ch('Q')));
        assert!(!eq.equals(MappingSource::UnicodeData, ch('q'), ch('r')));
        assert_eq!(eq.equivs(MappingSource::UnicodeData, ch('7')), [ch('7'); 4]);
    }

    #[test]
    fn legacy_mapping_stays_on_its_side_of_ascii() {
        let eq = SimpleCaseEquivalence;
        assert!(!eq.equals(MappingSource::UnicodeData, 0x017f, ch('s')));
        assert!(eq.equals(MappingSource::CaseFolding, 0x017f, ch('s')));
        assert!(eq.equals(MappingSource::CaseFolding, 0x212a, ch('k')));
        assert!(eq.equivs(MappingSource::CaseFolding, ch('k')).contains(&0x212a));
    }
}
