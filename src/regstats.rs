// regstats.rs - Per-matcher execution counters.
//
// Collected only after `Matcher::enable_stats`. Counters accumulate over
// every `match_at` call until `reset`.

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Start offsets tried.
    pub num_attempts: u64,
    /// Instructions dispatched.
    pub num_insts: u64,
    /// Character comparisons performed by matching instructions.
    pub num_compares: u64,
    pub num_pushes: u64,
    pub num_pops: u64,
    pub stack_high_water_mark: usize,
    /// Length of the most recent input.
    pub input_length: usize,
    pub num_query_continues: u64,
}

impl MatchStats {
    pub fn reset(&mut self) {
        *self = MatchStats::default();
    }
}

impl fmt::Display for MatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input length:        {}", self.input_length)?;
        writeln!(f, "attempts:            {}", self.num_attempts)?;
        writeln!(f, "instructions:        {}", self.num_insts)?;
        writeln!(f, "compares:            {}", self.num_compares)?;
        writeln!(f, "cont pushes/pops:    {}/{}", self.num_pushes, self.num_pops)?;
        writeln!(f, "cont stack hwm:      {}", self.stack_high_water_mark)?;
        write!(f, "query continues:     {}", self.num_query_continues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_counter() {
        let stats = MatchStats {
            num_attempts: 2,
            num_pushes: 5,
            num_pops: 4,
            ..MatchStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("attempts:            2"));
        assert!(text.contains("cont pushes/pops:    5/4"));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn reset_clears() {
        let mut stats = MatchStats {
            num_insts: 9,
            ..MatchStats::default()
        };
        stats.reset();
        assert_eq!(stats, MatchStats::default());
    }
}
