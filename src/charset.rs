// charset.rs - Runtime character sets over UTF-16 code units.
//
// Code units below 256 live in a 256-bit bitmap; everything above is kept
// as sorted, disjoint, non-adjacent ranges searched by bisection.

use std::cmp::Ordering;
use std::fmt;

use crate::regint::{Char, MAX_UCHAR};

pub const DIRECT_SIZE: usize = 256;
pub const BITS_IN_ROOM: usize = 32;
pub const BITSET_REAL_SIZE: usize = DIRECT_SIZE / BITS_IN_ROOM;
pub type Bits = u32;
pub type BitSet = [Bits; BITSET_REAL_SIZE];

#[inline]
fn bs_room(pos: usize) -> usize {
    pos >> 5
}

#[inline]
fn bs_bit(pos: usize) -> u32 {
    1u32 << (pos & 0x1f)
}

#[inline]
fn bitset_at(bs: &BitSet, pos: usize) -> bool {
    (bs[bs_room(pos)] & bs_bit(pos)) != 0
}

#[inline]
fn bitset_set_bit(bs: &mut BitSet, pos: usize) {
    bs[bs_room(pos)] |= bs_bit(pos);
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct RuntimeCharSet {
    direct: BitSet,
    ranges: Vec<(Char, Char)>,
}

impl RuntimeCharSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chars(chars: &[Char]) -> Self {
        let mut set = Self::new();
        for &c in chars {
            set.add(c);
        }
        set
    }

    /// Builds a set from inclusive `(lo, hi)` pairs.
    pub fn from_ranges(ranges: &[(Char, Char)]) -> Self {
        let mut set = Self::new();
        for &(lo, hi) in ranges {
            set.add_range(lo, hi);
        }
        set
    }

    #[inline]
    pub fn add(&mut self, c: Char) {
        self.add_range(c, c);
    }

    pub fn add_range(&mut self, lo: Char, hi: Char) {
        if lo > hi {
            return;
        }
        let direct_hi = (hi as usize).min(DIRECT_SIZE - 1);
        for pos in (lo as usize)..=direct_hi {
            bitset_set_bit(&mut self.direct, pos);
        }
        if (hi as usize) < DIRECT_SIZE {
            return;
        }
        let lo = lo.max(DIRECT_SIZE as Char);
        self.ranges.push((lo, hi));
        self.normalize();
    }

    fn normalize(&mut self) {
        self.ranges.sort_unstable_by_key(|&(lo, _)| lo);
        let mut merged: Vec<(Char, Char)> = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            match merged.last_mut() {
                Some(last) if lo as u32 <= last.1 as u32 + 1 => {
                    last.1 = last.1.max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        self.ranges = merged;
    }

    #[inline]
    pub fn contains(&self, c: Char) -> bool {
        if (c as usize) < DIRECT_SIZE {
            return bitset_at(&self.direct, c as usize);
        }
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < c {
                    Ordering::Less
                } else if lo > c {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Number of code units in the set.
    pub fn count(&self) -> u32 {
        let direct: u32 = self.direct.iter().map(|b| b.count_ones()).sum();
        let upper: u32 = self
            .ranges
            .iter()
            .map(|&(lo, hi)| hi as u32 - lo as u32 + 1)
            .sum();
        direct + upper
    }

    pub fn is_empty(&self) -> bool {
        self.direct.iter().all(|&b| b == 0) && self.ranges.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.count() == MAX_UCHAR + 1
    }

    /// Returns the single member when the set has exactly one.
    pub fn singleton(&self) -> Option<Char> {
        if self.count() != 1 {
            return None;
        }
        self.iter_ranges().next().map(|(lo, _)| lo)
    }

    /// Inclusive ranges in ascending order, bitmap part first.
    pub fn iter_ranges(&self) -> impl Iterator<Item = (Char, Char)> + '_ {
        DirectRanges {
            direct: &self.direct,
            pos: 0,
        }
        .chain(self.ranges.iter().copied())
    }
}

struct DirectRanges<'a> {
    direct: &'a BitSet,
    pos: usize,
}

impl Iterator for DirectRanges<'_> {
    type Item = (Char, Char);

    fn next(&mut self) -> Option<(Char, Char)> {
        while self.pos < DIRECT_SIZE && !bitset_at(self.direct, self.pos) {
            self.pos += 1;
        }
        if self.pos >= DIRECT_SIZE {
            return None;
        }
        let lo = self.pos;
        while self.pos < DIRECT_SIZE && bitset_at(self.direct, self.pos) {
            self.pos += 1;
        }
        Some((lo as Char, (self.pos - 1) as Char))
    }
}

fn write_set_char(f: &mut fmt::Formatter<'_>, c: Char) -> fmt::Result {
    match char::from_u32(c as u32) {
        Some(ch) if ch.is_ascii_graphic() && !matches!(ch, '[' | ']' | '-' | '\\' | '^') => {
            write!(f, "{}", ch)
        }
        _ => write!(f, "\\u{:04x}", c),
    }
}

impl fmt::Display for RuntimeCharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (lo, hi) in self.iter_ranges() {
            write_set_char(f, lo)?;
            if hi > lo {
                write!(f, "-")?;
                write_set_char(f, hi)?;
            }
        }
        write!(f, "]")
    }
}

impl fmt::Debug for RuntimeCharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeCharSet{}", self)
    }
}
