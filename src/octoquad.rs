// octoquad.rs - Whole-program matcher for two 8-character patterns over a
// four-letter ASCII alphabet.
//
// Every pattern position is a 4-bit mask over the alphabet. A 32-bit
// window holds the last eight input characters, one nibble each, so a
// pattern matches when `window & pattern` leaves exactly one bit set in
// every nibble.

use std::fmt;

use crate::regint::{Char, CharCount, MappingSource};
use crate::stdchars::CaseEquivalence;

pub const ALPHA_COUNT: usize = 4;
pub const ASCII_TABLE_SIZE: usize = 128;
pub const PATTERN_LENGTH: usize = 8;
pub const NUM_PATTERNS: usize = 2;

#[inline]
fn one_bit_set_in_every_quad(x: u32) -> bool {
    let x = x.wrapping_sub(0x1111_1111);
    (x & 0x8888_8888) == 0
}

#[derive(Clone, PartialEq, Eq)]
pub struct OctoquadMatcher {
    code_to_char: [Char; ALPHA_COUNT],
    char_to_bits: [u8; ASCII_TABLE_SIZE],
    patterns: [u32; NUM_PATTERNS],
}

impl OctoquadMatcher {
    /// Builds a matcher from two patterns given as eight sets of allowed
    /// characters each. Returns `None` when the patterns need more than
    /// four distinct characters, contain non-ASCII characters or are not
    /// exactly eight positions long.
    pub fn new(
        equivalence: &dyn CaseEquivalence,
        source: MappingSource,
        patterns: [&[&[Char]]; NUM_PATTERNS],
    ) -> Option<Self> {
        let mut code_to_char: [Char; ALPHA_COUNT] = [0; ALPHA_COUNT];
        let mut num_codes = 0usize;
        let mut packed = [0u32; NUM_PATTERNS];

        for (pattern, bits_out) in patterns.iter().zip(packed.iter_mut()) {
            if pattern.len() != PATTERN_LENGTH {
                return None;
            }
            for position in pattern.iter() {
                let mut bits = 0u32;
                for &c in position.iter() {
                    if c as usize >= ASCII_TABLE_SIZE {
                        return None;
                    }
                    let code = match code_to_char[..num_codes].iter().position(|&x| x == c) {
                        Some(code) => code,
                        None if num_codes < ALPHA_COUNT => {
                            code_to_char[num_codes] = c;
                            num_codes += 1;
                            num_codes - 1
                        }
                        None => return None,
                    };
                    bits |= 1 << code;
                }
                *bits_out = (*bits_out << 4) | bits;
            }
        }

        let mut char_to_bits = [0u8; ASCII_TABLE_SIZE];
        for (i, &c) in code_to_char[..num_codes].iter().enumerate() {
            for e in equivalence.equivs(source, c) {
                if (e as usize) < ASCII_TABLE_SIZE {
                    char_to_bits[e as usize] = 1 << i;
                }
            }
        }

        Some(OctoquadMatcher {
            code_to_char,
            char_to_bits,
            patterns: packed,
        })
    }

    #[inline]
    fn bits(&self, c: Char) -> u32 {
        match self.char_to_bits.get(c as usize) {
            Some(&b) => b as u32,
            None => 0,
        }
    }

    /// Finds the first window at or after `*offset` matching either
    /// pattern and moves `*offset` to its start.
    pub fn match_at(&self, input: &[Char], offset: &mut CharCount) -> bool {
        let input_length = input.len();
        let start = *offset as usize;
        if input_length < PATTERN_LENGTH || start > input_length - PATTERN_LENGTH {
            return false;
        }

        let mut v = 0u32;
        for &c in &input[start..start + PATTERN_LENGTH] {
            v = (v << 4) | self.bits(c);
        }

        let [lp, rp] = self.patterns;
        let mut next = start + PATTERN_LENGTH;
        loop {
            if one_bit_set_in_every_quad(v & lp) || one_bit_set_in_every_quad(v & rp) {
                *offset = (next - PATTERN_LENGTH) as CharCount;
                return true;
            }
            if next >= input_length {
                return false;
            }
            v = (v << 4) | self.bits(input[next]);
            next += 1;
        }
    }
}

impl fmt::Display for OctoquadMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, &pattern) in self.patterns.iter().enumerate() {
            if n > 0 {
                write!(f, "|")?;
            }
            for pos in 0..PATTERN_LENGTH {
                let bits = (pattern >> (4 * (PATTERN_LENGTH - 1 - pos))) & 0xf;
                let members: Vec<char> = (0..ALPHA_COUNT)
                    .filter(|k| bits & (1 << k) != 0)
                    .map(|k| char::from_u32(self.code_to_char[k] as u32).unwrap_or('?'))
                    .collect();
                if members.len() == 1 {
                    write!(f, "{}", members[0])?;
                } else {
                    write!(f, "[{}]", members.iter().collect::<String>())?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OctoquadMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OctoquadMatcher({})", self)
    }
}
