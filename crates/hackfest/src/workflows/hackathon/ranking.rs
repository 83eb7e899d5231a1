use serde::Serialize;

use super::domain::{EventId, ScoreRecord, ShortlistEntry, TeamId};
use super::scoring::round2;

/// One leaderboard row. Rank is 1-based and assigned after sorting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub team_id: TeamId,
    pub total: f64,
    pub rank: usize,
    /// How many evaluator sheets contributed to `total`.
    pub score_count: usize,
}

/// Aggregates score records into stable-sorted leaderboards and top-N cuts.
///
/// Sorting is stable throughout: subjects with equal totals keep the order
/// they were fetched in, and no secondary tie-break key exists. Callers must
/// not assume any deterministic tie order beyond that stability.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankingSelector;

impl RankingSelector {
    pub const fn new() -> Self {
        Self
    }

    /// Screening leaderboard: one row per subject, sorted by total
    /// descending. Multiple evaluator sheets for one subject collapse to a
    /// simple mean, so a team scored by several evaluators still occupies
    /// exactly one row (and therefore at most one shortlist slot).
    pub fn screening_leaderboard(&self, records: &[ScoreRecord]) -> Vec<LeaderboardEntry> {
        Self::ranked(records)
    }

    /// Judging leaderboard: the same per-subject aggregation over the
    /// judging sheets.
    pub fn judging_leaderboard(&self, records: &[ScoreRecord]) -> Vec<LeaderboardEntry> {
        Self::ranked(records)
    }

    /// Collapse records to one entry per subject: a simple mean of the
    /// sheet totals, not weighted by evaluator. Grouping preserves
    /// first-appearance order so stability carries over from the fetch
    /// order.
    fn ranked(records: &[ScoreRecord]) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = Vec::new();

        for record in records {
            match entries
                .iter_mut()
                .find(|entry| entry.team_id == record.subject_id)
            {
                Some(entry) => {
                    entry.total += record.total;
                    entry.score_count += 1;
                }
                None => entries.push(LeaderboardEntry {
                    team_id: record.subject_id.clone(),
                    total: record.total,
                    rank: 0,
                    score_count: 1,
                }),
            }
        }

        for entry in &mut entries {
            entry.total = round2(entry.total / entry.score_count as f64);
        }

        Self::sort_and_rank(&mut entries);
        entries
    }

    /// Cut the top `target_count` rows into a shortlist snapshot. Exact ties
    /// at the boundary are resolved by stable order: the N-th row by fetch
    /// order wins the last slot.
    pub fn select_top(
        &self,
        event_id: &EventId,
        leaderboard: &[LeaderboardEntry],
        target_count: usize,
    ) -> Vec<ShortlistEntry> {
        leaderboard
            .iter()
            .take(target_count)
            .map(|entry| ShortlistEntry {
                event_id: event_id.clone(),
                team_id: entry.team_id.clone(),
                rank: entry.rank,
            })
            .collect()
    }

    fn sort_and_rank(entries: &mut [LeaderboardEntry]) {
        // Vec::sort_by is stable; equal totals retain fetch order.
        entries.sort_by(|a, b| b.total.total_cmp(&a.total));
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }
    }
}
