// scanner.rs - Literal scanners used by the sync instructions.
//
// Each scanner answers one question: starting at `input_offset`, where is
// the next occurrence of the literal? On success the offset is moved to
// the start of the occurrence. Literals live in the program's literal
// buffer, either one code unit per position or EQUIV_CLASS_SIZE code
// units per position (a case-equivalence class).

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::regint::{Char, CharCount, EQUIV_CLASS_SIZE, MAX_NUM_SYNC_LITERALS};

// ============================================================================
// Char2LiteralScanner
// ============================================================================

/// Scanner for a literal of exactly two code units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Char2LiteralScanner {
    pub cs: [Char; 2],
}

impl Char2LiteralScanner {
    pub fn new(c0: Char, c1: Char) -> Self {
        Char2LiteralScanner { cs: [c0, c1] }
    }

    pub fn find(&self, input: &[Char], input_offset: &mut CharCount) -> bool {
        let start = *input_offset as usize;
        if input.len() < 2 || start > input.len() - 2 {
            return false;
        }
        let [c0, c1] = self.cs;
        match input[start..]
            .windows(2)
            .position(|w| w[1] == c1 && w[0] == c0)
        {
            Some(pos) => {
                *input_offset = (start + pos) as CharCount;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Shift maps
// ============================================================================

/// Bad-character shift table of a Horspool scan.
pub trait CharShiftMap: Clone {
    fn new(default: CharCount) -> Self;
    fn set(&mut self, c: Char, shift: CharCount);
    fn get(&self, c: Char) -> CharCount;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashShiftMap {
    map: HashMap<Char, CharCount>,
    default: CharCount,
}

impl CharShiftMap for HashShiftMap {
    fn new(default: CharCount) -> Self {
        HashShiftMap {
            map: HashMap::new(),
            default,
        }
    }

    fn set(&mut self, c: Char, shift: CharCount) {
        self.map.insert(c, shift);
    }

    #[inline]
    fn get(&self, c: Char) -> CharCount {
        self.map.get(&c).copied().unwrap_or(self.default)
    }
}

pub const LINEAR_MAP_SIZE: usize = 128;

/// Direct table for literals made only of code units below 128.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearShiftMap {
    table: [CharCount; LINEAR_MAP_SIZE],
    default: CharCount,
}

impl CharShiftMap for LinearShiftMap {
    fn new(default: CharCount) -> Self {
        LinearShiftMap {
            table: [default; LINEAR_MAP_SIZE],
            default,
        }
    }

    fn set(&mut self, c: Char, shift: CharCount) {
        debug_assert!((c as usize) < LINEAR_MAP_SIZE);
        if let Some(slot) = self.table.get_mut(c as usize) {
            *slot = shift;
        }
    }

    #[inline]
    fn get(&self, c: Char) -> CharCount {
        match self.table.get(c as usize) {
            Some(&shift) => shift,
            None => self.default,
        }
    }
}

// ============================================================================
// TextbookBoyerMoore
// ============================================================================

/// Horspool variant of Boyer-Moore over a literal-buffer span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextbookBoyerMoore<M: CharShiftMap = HashShiftMap> {
    shifts: M,
    length: CharCount,
}

pub type TextbookBoyerMooreWithLinearMap = TextbookBoyerMoore<LinearShiftMap>;

/// True when every code unit of the literal fits the linear shift map.
pub fn fits_linear_map(pat: &[Char]) -> bool {
    pat.iter().all(|&c| (c as usize) < LINEAR_MAP_SIZE)
}

#[inline]
fn position_matches<const EQUIV: usize>(pat: &[Char], pos: usize, c: Char) -> bool {
    pat[pos * EQUIV..(pos + 1) * EQUIV].contains(&c)
}

impl<M: CharShiftMap> TextbookBoyerMoore<M> {
    /// `pat` holds `length * equiv` code units.
    pub fn new(pat: &[Char], length: CharCount, equiv: usize) -> Self {
        debug_assert_eq!(pat.len(), length as usize * equiv);
        let mut shifts = M::new(length.max(1));
        let n = length as usize;
        for i in 0..n.saturating_sub(1) {
            for &c in &pat[i * equiv..(i + 1) * equiv] {
                shifts.set(c, (n - 1 - i) as CharCount);
            }
        }
        TextbookBoyerMoore { shifts, length }
    }

    #[inline]
    pub fn literal_length(&self) -> CharCount {
        self.length
    }

    /// Finds the next occurrence at or after `*input_offset`.
    pub fn find<const EQUIV: usize>(
        &self,
        input: &[Char],
        input_offset: &mut CharCount,
        pat: &[Char],
    ) -> bool {
        self.scan(input, input_offset, |i, c| position_matches::<EQUIV>(pat, i, c))
    }

    /// Equivalence-class search whose last position matches only its first code unit.
    pub fn find_trivial_last_char(
        &self,
        input: &[Char],
        input_offset: &mut CharCount,
        pat: &[Char],
    ) -> bool {
        let last = (self.length as usize).saturating_sub(1);
        self.scan(input, input_offset, |i, c| {
            if i == last {
                c == pat[i * EQUIV_CLASS_SIZE]
            } else {
                position_matches::<EQUIV_CLASS_SIZE>(pat, i, c)
            }
        })
    }

    fn scan<F>(&self, input: &[Char], input_offset: &mut CharCount, matches: F) -> bool
    where
        F: Fn(usize, Char) -> bool,
    {
        let n = self.length as usize;
        let mut i = *input_offset as usize;
        if n == 0 {
            return i <= input.len();
        }
        while i + n <= input.len() {
            let mut j = n;
            while j > 0 && matches(j - 1, input[i + j - 1]) {
                j -= 1;
            }
            if j == 0 {
                *input_offset = i as CharCount;
                return true;
            }
            i += self.shifts.get(input[i + n - 1]) as usize;
        }
        false
    }
}

// ============================================================================
// Multi-literal sync
// ============================================================================

/// One literal of a multi-literal sync instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannerInfo {
    pub offset: CharCount,
    pub length: CharCount,
    pub is_equiv_class: bool,
    pub scanner: TextbookBoyerMoore,
}

impl ScannerInfo {
    pub fn new(litbuf: &[Char], offset: CharCount, length: CharCount, is_equiv_class: bool) -> Self {
        let equiv = if is_equiv_class { EQUIV_CLASS_SIZE } else { 1 };
        let start = offset as usize;
        let pat = &litbuf[start..start + length as usize * equiv];
        ScannerInfo {
            offset,
            length,
            is_equiv_class,
            scanner: TextbookBoyerMoore::new(pat, length, equiv),
        }
    }

    /// Width of the span in the literal buffer.
    pub fn buffer_len(&self) -> usize {
        let equiv = if self.is_equiv_class { EQUIV_CLASS_SIZE } else { 1 };
        self.length as usize * equiv
    }

    pub fn find(&self, input: &[Char], input_offset: &mut CharCount, litbuf: &[Char]) -> bool {
        let start = self.offset as usize;
        let pat = &litbuf[start..start + self.buffer_len()];
        if self.is_equiv_class {
            self.scanner.find::<EQUIV_CLASS_SIZE>(input, input_offset, pat)
        } else {
            self.scanner.find::<1>(input, input_offset, pat)
        }
    }
}

pub type ScannerInfos = SmallVec<[ScannerInfo; MAX_NUM_SYNC_LITERALS]>;

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Vec<Char> {
        s.encode_utf16().collect()
    }

    fn naive(input: &[Char], from: usize, pat: &[Char]) -> Option<usize> {
        (from..=input.len().saturating_sub(pat.len()))
            .find(|&i| i + pat.len() <= input.len() && input[i..i + pat.len()] == *pat)
    }

    #[test]
    fn char2_literal() {
        let scanner = Char2LiteralScanner::new(b'a' as Char, b'b' as Char);
        let input = u("xaxab");
        let mut offset = 0;
        assert!(scanner.find(&input, &mut offset));
        assert_eq!(offset, 3);
        let mut offset = 4;
        assert!(!scanner.find(&input, &mut offset));
        let mut offset = 0;
        assert!(!scanner.find(&u("a"), &mut offset));
    }

    #[test]
    fn boyer_moore_agrees_with_naive_search() {
        let text = u("the quick brown fox jumps over the lazy dog; the end");
        for pat in ["the", "dog", "end", "x", "he l", "zzz", "the end"] {
            let p = u(pat);
            let hash: TextbookBoyerMoore = TextbookBoyerMoore::new(&p, p.len() as CharCount, 1);
            let linear = TextbookBoyerMooreWithLinearMap::new(&p, p.len() as CharCount, 1);
            for from in [0usize, 1, 5, 30, 45] {
                let expected = naive(&text, from, &p);
                let mut a = from as CharCount;
                let found_a = hash.find::<1>(&text, &mut a, &p);
                let mut b = from as CharCount;
                let found_b = linear.find::<1>(&text, &mut b, &p);
                assert_eq!(found_a, expected.is_some(), "{} from {}", pat, from);
                assert_eq!(found_b, expected.is_some());
                if let Some(pos) = expected {
                    assert_eq!(a as usize, pos);
                    assert_eq!(b as usize, pos);
                }
            }
        }
    }

    #[test]
    fn equivalence_class_literal() {
        // "ab" with classes {a, A} and {b, B}
        let pat: Vec<Char> = u("aAaAbBbB");
        let scanner: TextbookBoyerMoore = TextbookBoyerMoore::new(&pat, 2, EQUIV_CLASS_SIZE);
        let input = u("xxAbyy");
        let mut offset = 0;
        assert!(scanner.find::<EQUIV_CLASS_SIZE>(&input, &mut offset, &pat));
        assert_eq!(offset, 2);

        let mut offset = 0;
        assert!(scanner.find_trivial_last_char(&input, &mut offset, &pat));
        let input = u("xxAByy");
        let mut offset = 0;
        assert!(!scanner.find_trivial_last_char(&input, &mut offset, &pat));
    }

    #[test]
    fn scanner_info_uses_its_span() {
        let litbuf = u("zzfoobar");
        let info = ScannerInfo::new(&litbuf, 2, 3, false);
        let input = u("..foo..");
        let mut offset = 0;
        assert!(info.find(&input, &mut offset, &litbuf));
        assert_eq!(offset, 2);
        assert_eq!(info.buffer_len(), 3);
    }

    #[test]
    fn linear_map_requires_ascii() {
        assert!(fits_linear_map(&u("abc")));
        assert!(!fits_linear_map(&u("a\u{e9}")));
    }
}
