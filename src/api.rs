// api.rs - Convenience API over compiled programs.
//
// Wraps Program + Matcher with Rust-native types: Regex, RegexBuilder,
// Match, Captures, FindIter. Input is UTF-16; `_str` helpers encode
// and decode at the boundary.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RegexError;
use crate::regexec::{Matcher, QueryContinueFn};
use crate::regint::{Char, CharCount, RegexFlags};
use crate::regprogram::Program;
use crate::stdchars::{CaseEquivalence, SimpleCaseEquivalence};

/// A compiled program plus the matcher settings used for every search.
///
/// Each search runs on a fresh [`Matcher`], so a `Regex` can be shared
/// between threads freely.
///
/// # Examples
///
/// ```
/// use regvm::api::Regex;
/// use regvm::regint::RegexFlags;
/// use regvm::regprogram::Program;
///
/// let re = Regex::new(Program::single_char("b", RegexFlags::empty(), b'b' as u16));
/// let m = re.find_str("abc").unwrap();
/// assert_eq!(m, "b");
/// ```
#[derive(Clone)]
pub struct Regex {
    program: Arc<Program>,
    equivalence: Arc<dyn CaseEquivalence>,
    match_stack_limit: Option<u32>,
    query_continue: Option<QueryContinueFn>,
    ticks_per_query_continue: Option<u32>,
    time_per_query_continue: Option<Duration>,
}

impl Regex {
    pub fn new(program: Program) -> Regex {
        Self::from_arc(Arc::new(program))
    }

    pub fn from_arc(program: Arc<Program>) -> Regex {
        RegexBuilder::new(program).build()
    }

    /// Create a [`RegexBuilder`] for fine-grained control over matching.
    pub fn builder(program: Program) -> RegexBuilder {
        RegexBuilder::new(Arc::new(program))
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Number of capture groups, excluding group 0.
    pub fn captures_len(&self) -> usize {
        self.program.num_groups() - 1
    }

    /// A matcher configured with this regex's settings.
    pub fn matcher(&self) -> Matcher {
        let mut m = Matcher::with_equivalence(Arc::clone(&self.program), Arc::clone(&self.equivalence));
        if let Some(limit) = self.match_stack_limit {
            m.set_match_stack_limit(limit);
        }
        if let Some(callback) = &self.query_continue {
            m.set_query_continue(Arc::clone(callback));
        }
        if let Some(ticks) = self.ticks_per_query_continue {
            m.set_ticks_per_query_continue(ticks);
        }
        if let Some(time) = self.time_per_query_continue {
            m.set_time_per_query_continue(time);
        }
        m
    }

    // === Search ===

    /// First match at or after `start`, reporting matcher aborts.
    pub fn try_find_at<'t>(&self, text: &'t [Char], start: usize) -> Result<Option<Match<'t>>, RegexError> {
        let mut m = self.matcher();
        Ok(search(&mut m, text, start)?.map(|range| Match::new(text, range)))
    }

    /// First match at or after `start`. Aborted searches count as no match.
    pub fn find_at<'t>(&self, text: &'t [Char], start: usize) -> Option<Match<'t>> {
        self.try_find_at(text, start).ok().flatten()
    }

    pub fn find<'t>(&self, text: &'t [Char]) -> Option<Match<'t>> {
        self.find_at(text, 0)
    }

    pub fn is_match(&self, text: &[Char]) -> bool {
        self.find(text).is_some()
    }

    /// First match with all capture groups, reporting matcher aborts.
    pub fn try_captures<'t>(&self, text: &'t [Char]) -> Result<Option<Captures<'t>>, RegexError> {
        let mut m = self.matcher();
        if search(&mut m, text, 0)?.is_none() {
            return Ok(None);
        }
        let groups = (0..m.num_groups()).map(|id| m.group_range(id)).collect();
        Ok(Some(Captures { text, groups }))
    }

    pub fn captures<'t>(&self, text: &'t [Char]) -> Option<Captures<'t>> {
        self.try_captures(text).ok().flatten()
    }

    /// Iterate over all non-overlapping matches in `text`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t [Char]) -> FindIter<'r, 't> {
        FindIter {
            regex: self,
            matcher: self.matcher(),
            text,
            last_end: 0,
        }
    }

    // === String helpers ===

    pub fn is_match_str(&self, text: &str) -> bool {
        self.is_match(&encode(text))
    }

    /// Text of the first match, decoded lossily.
    pub fn find_str(&self, text: &str) -> Option<String> {
        let input = encode(text);
        self.find(&input).map(|m| m.to_string_lossy())
    }

    /// Text of every capture group of the first match.
    pub fn captures_str(&self, text: &str) -> Option<Vec<Option<String>>> {
        let input = encode(text);
        let caps = self.captures(&input)?;
        Some(caps.iter().map(|m| m.map(|m| m.to_string_lossy())).collect())
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("source", &self.program.source())
            .field("tag", &self.program.tag())
            .finish_non_exhaustive()
    }
}

fn encode(text: &str) -> Vec<Char> {
    text.encode_utf16().collect()
}

fn search(m: &mut Matcher, text: &[Char], start: usize) -> Result<Option<Range<usize>>, RegexError> {
    let Ok(offset) = CharCount::try_from(start) else {
        return Ok(None);
    };
    if m.match_at(text, offset)? {
        Ok(m.group_range(0))
    } else {
        Ok(None)
    }
}

// === RegexBuilder ===

/// Builder for a [`Regex`] with non-default matcher settings.
///
/// # Examples
///
/// ```
/// use regvm::api::Regex;
/// use regvm::regint::RegexFlags;
/// use regvm::regprogram::Program;
///
/// let re = Regex::builder(Program::bounded_word("\\b\\w+\\b", RegexFlags::empty()))
///     .match_stack_limit(1000)
///     .build();
/// assert_eq!(re.find_str("  hello world").as_deref(), Some("hello"));
/// ```
pub struct RegexBuilder {
    program: Arc<Program>,
    equivalence: Arc<dyn CaseEquivalence>,
    match_stack_limit: Option<u32>,
    query_continue: Option<QueryContinueFn>,
    ticks_per_query_continue: Option<u32>,
    time_per_query_continue: Option<Duration>,
}

impl RegexBuilder {
    pub fn new(program: Arc<Program>) -> Self {
        RegexBuilder {
            program,
            equivalence: Arc::new(SimpleCaseEquivalence),
            match_stack_limit: None,
            query_continue: None,
            ticks_per_query_continue: None,
            time_per_query_continue: None,
        }
    }

    /// Case-equivalence provider for ignore-case programs.
    pub fn case_equivalence(mut self, equivalence: Arc<dyn CaseEquivalence>) -> Self {
        self.equivalence = equivalence;
        self
    }

    /// Continuation stack cap; 0 means unlimited. Defaults to the global setting.
    pub fn match_stack_limit(mut self, limit: u32) -> Self {
        self.match_stack_limit = Some(limit);
        self
    }

    pub fn query_continue(mut self, callback: QueryContinueFn) -> Self {
        self.query_continue = Some(callback);
        self
    }

    pub fn ticks_per_query_continue(mut self, ticks: u32) -> Self {
        self.ticks_per_query_continue = Some(ticks);
        self
    }

    pub fn time_per_query_continue(mut self, time: Duration) -> Self {
        self.time_per_query_continue = Some(time);
        self
    }

    pub fn build(self) -> Regex {
        Regex {
            program: self.program,
            equivalence: self.equivalence,
            match_stack_limit: self.match_stack_limit,
            query_continue: self.query_continue,
            ticks_per_query_continue: self.ticks_per_query_continue,
            time_per_query_continue: self.time_per_query_continue,
        }
    }
}

// === Match ===

/// A single match result referencing the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t [Char],
    start: usize,
    end: usize,
}

impl<'t> Match<'t> {
    fn new(text: &'t [Char], range: Range<usize>) -> Self {
        Match {
            text,
            start: range.start,
            end: range.end,
        }
    }

    /// Code-unit offset of the start of the match.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Code-unit offset of the end of the match (exclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn as_slice(&self) -> &'t [Char] {
        &self.text[self.start..self.end]
    }

    /// The matched text, with unpaired surrogates replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_slice())
    }

    /// Length of the match in code units.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl PartialEq<&str> for Match<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_slice().iter().copied().eq(other.encode_utf16())
    }
}

// === Captures ===

/// All capture groups from a single match.
///
/// Group 0 is the entire match.
pub struct Captures<'t> {
    text: &'t [Char],
    groups: Vec<Option<Range<usize>>>,
}

impl<'t> Captures<'t> {
    /// Get capture group `i`, or `None` if the group did not participate.
    pub fn get(&self, i: usize) -> Option<Match<'t>> {
        let range = self.groups.get(i)?.clone()?;
        Some(Match::new(self.text, range))
    }

    /// Number of capture groups (including group 0).
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> CapturesIter<'_, 't> {
        CapturesIter {
            captures: self,
            index: 0,
        }
    }
}

impl std::fmt::Debug for Captures<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for i in 0..self.len() {
            list.entry(&self.get(i).map(|m| m.range()));
        }
        list.finish()
    }
}

// === CapturesIter ===

/// Iterator over capture groups in a [`Captures`].
pub struct CapturesIter<'c, 't> {
    captures: &'c Captures<'t>,
    index: usize,
}

impl<'c, 't> Iterator for CapturesIter<'c, 't> {
    type Item = Option<Match<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.captures.len() {
            return None;
        }
        let m = self.captures.get(self.index);
        self.index += 1;
        Some(m)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.captures.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CapturesIter<'_, '_> {}

// === FindIter ===

/// Iterator over all non-overlapping matches in a text.
///
/// Reuses one matcher for the whole scan. Stops at the first aborted search.
pub struct FindIter<'r, 't> {
    regex: &'r Regex,
    matcher: Matcher,
    text: &'t [Char],
    last_end: usize,
}

impl FindIter<'_, '_> {
    /// Width of the character at `offset`: a surrogate pair counts as one
    /// character under the unicode flag.
    fn char_width(&self, offset: usize) -> usize {
        let unicode = self.regex.program.flags().contains(RegexFlags::UNICODE);
        match self.text.get(offset..offset + 2) {
            Some(&[hi, lo]) if unicode && (0xd800..0xdc00).contains(&hi) && (0xdc00..0xe000).contains(&lo) => 2,
            _ => 1,
        }
    }
}

impl<'r, 't> Iterator for FindIter<'r, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        if self.last_end > self.text.len() {
            return None;
        }

        let range = search(&mut self.matcher, self.text, self.last_end).ok()??;

        // Step past an empty match so the next search cannot report it again.
        self.last_end = if range.is_empty() {
            range.end + self.char_width(range.end)
        } else {
            range.end
        };

        Some(Match::new(self.text, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::RuntimeCharSet;
    use crate::regemit::ProgramBuilder;
    use crate::regint::ChompMode;
    use crate::reginst::{CharMixin, GroupMixin, Inst, NoNeedToSaveMixin, SetMixin};

    fn u(s: &str) -> Vec<Char> {
        s.encode_utf16().collect()
    }

    fn digits() -> Regex {
        // \d+
        let mut b = ProgramBuilder::new("\\d+", RegexFlags::empty());
        b.emit(Inst::ChompSet(
            SetMixin {
                set: RuntimeCharSet::from_ranges(&[(b'0' as Char, b'9' as Char)]),
            },
            ChompMode::Plus,
        ));
        b.emit(Inst::Succ);
        Regex::new(b.finish().unwrap())
    }

    fn optional_a(flags: RegexFlags) -> Regex {
        // a*
        let mut b = ProgramBuilder::new("a*", flags);
        b.emit(Inst::ChompChar(CharMixin { c: b'a' as Char }, ChompMode::Star));
        b.emit(Inst::Succ);
        Regex::new(b.finish().unwrap())
    }

    #[test]
    fn regex_find() {
        let re = digits();
        let text = u("hello 42 world");
        let m = re.find(&text).unwrap();
        assert_eq!(m, "42");
        assert_eq!(m.start(), 6);
        assert_eq!(m.end(), 8);
        assert_eq!(m.range(), 6..8);
        assert_eq!(m.len(), 2);
        assert!(!m.is_empty());
    }

    #[test]
    fn regex_no_match() {
        let re = digits();
        assert!(re.find(&u("no digits here")).is_none());
        assert!(!re.is_match_str("none"));
    }

    #[test]
    fn regex_find_at_skips_earlier_matches() {
        let re = digits();
        let text = u("1 22");
        assert_eq!(re.find_at(&text, 1).unwrap().range(), 2..4);
        assert!(re.find_at(&text, 10).is_none());
    }

    #[test]
    fn regex_captures() {
        // (\w+)
        let mut b = ProgramBuilder::new("(\\w+)", RegexFlags::empty());
        let g = b.new_group();
        b.emit(Inst::ChompSetGroup {
            set: SetMixin {
                set: crate::stdchars::word_set(),
            },
            group: GroupMixin { group_id: g },
            save: NoNeedToSaveMixin { no_need_to_save: false },
            mode: ChompMode::Plus,
        });
        b.emit(Inst::Succ);
        let re = Regex::new(b.finish().unwrap());
        assert_eq!(re.captures_len(), 1);
        let text = u("  key");
        let caps = re.captures(&text).unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.get(0).unwrap(), "key");
        assert_eq!(caps.get(1).unwrap().range(), 2..5);
        assert!(caps.get(2).is_none());
        assert_eq!(caps.iter().len(), 2);
        assert_eq!(
            re.captures_str("  key"),
            Some(vec![Some("key".to_string()), Some("key".to_string())])
        );
    }

    #[test]
    fn regex_find_iter() {
        let re = digits();
        let text = u("1 + 22 = 333");
        let matches: Vec<String> = re.find_iter(&text).map(|m| m.to_string_lossy()).collect();
        assert_eq!(matches, vec!["1", "22", "333"]);
    }

    #[test]
    fn empty_match_find_iter() {
        let re = optional_a(RegexFlags::empty());
        let text = u("bab");
        let ranges: Vec<_> = re.find_iter(&text).map(|m| m.range()).collect();
        assert_eq!(ranges, vec![0..0, 1..2, 2..2, 3..3]);
    }

    #[test]
    fn empty_match_steps_over_surrogate_pair_with_unicode_flag() {
        let text = u("\u{1F600}");
        let legacy: Vec<_> = optional_a(RegexFlags::empty()).find_iter(&text).map(|m| m.start()).collect();
        assert_eq!(legacy, vec![0, 1, 2]);
        let unicode: Vec<_> = optional_a(RegexFlags::UNICODE).find_iter(&text).map(|m| m.start()).collect();
        assert_eq!(unicode, vec![0, 2]);
    }

    #[test]
    fn debug_shows_source() {
        let re = Regex::new(Program::bounded_word("\\b\\w+\\b", RegexFlags::empty()));
        let text = format!("{:?}", re);
        assert!(text.contains("BoundedWord"));
    }
}
