// chartrie.rs - Prefix trie over code units for multi-literal alternations.
//
// Children are kept sorted so a lookup can stop at the first child whose
// character is greater than the input. A node without children accepts.

use std::fmt;

use crate::regint::{Char, CharCount};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct RuntimeCharTrie {
    children: Vec<RuntimeCharTrieEntry>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct RuntimeCharTrieEntry {
    pub c: Char,
    pub node: RuntimeCharTrie,
}

impl RuntimeCharTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a trie from literals none of which is a proper prefix of another.
    pub fn from_literals<I, L>(literals: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[Char]>,
    {
        let mut trie = Self::new();
        for lit in literals {
            trie.add(lit.as_ref());
        }
        trie
    }

    pub fn add(&mut self, literal: &[Char]) {
        let mut node = self;
        for &c in literal {
            let idx = match node.children.binary_search_by_key(&c, |e| e.c) {
                Ok(idx) => idx,
                Err(idx) => {
                    node.children.insert(
                        idx,
                        RuntimeCharTrieEntry {
                            c,
                            node: RuntimeCharTrie::new(),
                        },
                    );
                    idx
                }
            };
            node = &mut node.children[idx].node;
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[RuntimeCharTrieEntry] {
        &self.children
    }

    /// Walks the input from `*input_offset`; on reaching a leaf advances
    /// `*input_offset` past the matched literal and returns true.
    pub fn match_at(&self, input: &[Char], input_offset: &mut CharCount) -> bool {
        let mut node = self;
        let mut offset = *input_offset as usize;
        loop {
            if node.is_leaf() {
                *input_offset = offset as CharCount;
                return true;
            }
            let Some(&c) = input.get(offset) else {
                return false;
            };
            let mut next = None;
            for entry in &node.children {
                if entry.c == c {
                    next = Some(&entry.node);
                    break;
                }
                if entry.c > c {
                    break;
                }
            }
            match next {
                Some(child) => {
                    node = child;
                    offset += 1;
                }
                None => return false,
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            return Ok(());
        }
        write!(f, "{{")?;
        for (i, entry) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match char::from_u32(entry.c as u32) {
                Some(ch) if ch.is_ascii_graphic() => write!(f, "{}", ch)?,
                _ => write!(f, "\\u{:04x}", entry.c)?,
            }
            entry.node.fmt_node(f)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for RuntimeCharTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f)
    }
}

impl fmt::Debug for RuntimeCharTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeCharTrie{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Vec<Char> {
        s.encode_utf16().collect()
    }

    #[test]
    fn matches_each_literal() {
        let trie = RuntimeCharTrie::from_literals([u("cat"), u("car"), u("dog")]);
        for (text, end) in [("cat!", 3), ("cars", 3), ("dog", 3)] {
            let input = u(text);
            let mut offset = 0;
            assert!(trie.match_at(&input, &mut offset), "{}", text);
            assert_eq!(offset, end);
        }
    }

    #[test]
    fn fails_without_moving() {
        let trie = RuntimeCharTrie::from_literals([u("cat"), u("dog")]);
        let input = u("xcab");
        let mut offset = 1;
        assert!(!trie.match_at(&input, &mut offset));
        assert_eq!(offset, 1);
        let input = u("ca");
        let mut offset = 0;
        assert!(!trie.match_at(&input, &mut offset));
    }

    #[test]
    fn children_stay_sorted() {
        let trie = RuntimeCharTrie::from_literals([u("b"), u("a"), u("c")]);
        let chars: Vec<Char> = trie.children().iter().map(|e| e.c).collect();
        assert_eq!(chars, u("abc"));
        assert_eq!(trie.to_string(), "{a, b, c}");
    }
}
