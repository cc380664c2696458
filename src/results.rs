//! Turning raw tallies into display-ready standings.

use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

use crate::api::ApiClient;
use crate::error::Result;
use crate::model::{CandidateId, Election, ElectionId, RawCount, ResultsPayload};

/// One candidate's line in the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub name: String,
    pub position: String,
    pub vote_count: u64,
    /// Whole percent of all votes, rounded half up.
    pub percentage: u32,
}

/// Order tallies for display and work out each candidate's share.
///
/// Highest count first; equal counts keep their input order, so the first of several
/// tied candidates is shown as the leader. With no votes at all every share is 0.
pub fn project(counts: &[RawCount]) -> Vec<CandidateResult> {
    let total: u128 = counts.iter().map(|c| u128::from(c.vote_count)).sum();

    let mut results: Vec<_> = counts
        .iter()
        .map(|count| CandidateResult {
            candidate_id: count.candidate_id.clone(),
            name: count.name.clone(),
            position: count.position.clone(),
            vote_count: count.vote_count,
            percentage: percentage(count.vote_count, total),
        })
        .collect();
    // `sort_by` is stable.
    results.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
    results
}

/// `round(count / total * 100)`, halves rounded up.
fn percentage(count: u64, total: u128) -> u32 {
    if total == 0 {
        return 0;
    }
    // floor(100c/t + 1/2) without leaving integers.
    ((200 * u128::from(count) + total) / (2 * total)) as u32
}

/// Which endpoint standings come from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResultsSource {
    /// Published results, visible to everyone once released.
    Published,
    /// The running count, visible to officers and admins.
    Live,
}

/// An election together with its projected results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standings {
    pub election: Election,
    pub results: Vec<CandidateResult>,
    pub total_votes: u64,
    pub source: ResultsSource,
}

impl Standings {
    pub fn new(payload: ResultsPayload, source: ResultsSource) -> Self {
        let results = project(&payload.results);
        let total_votes = results
            .iter()
            .fold(0u64, |total, r| total.saturating_add(r.vote_count));
        Self {
            election: payload.election,
            results,
            total_votes,
            source,
        }
    }

    pub async fn fetch(api: &ApiClient, election: &ElectionId, source: ResultsSource) -> Result<Self> {
        let payload = match source {
            ResultsSource::Published => api.votes().results(election).await?,
            ResultsSource::Live => api.votes().live_results(election).await?,
        };
        Ok(Self::new(payload, source))
    }

    /// The leading candidate. Nobody leads before the first vote.
    pub fn winner(&self) -> Option<&CandidateResult> {
        if self.total_votes == 0 {
            return None;
        }
        self.results.first()
    }

    /// Whether the leader shares the top count with someone else.
    pub fn is_tied(&self) -> bool {
        match self.results.as_slice() {
            [first, second, ..] => self.total_votes > 0 && first.vote_count == second.vote_count,
            _ => false,
        }
    }

    /// Published results of a closed election no longer change.
    pub fn is_final(&self) -> bool {
        self.source == ResultsSource::Published && self.election.results_published
    }
}

/// Re-fetches live standings on a fixed period.
pub struct LiveResults {
    api: ApiClient,
    election: ElectionId,
    period: Duration,
    interval: Option<Interval>,
}

impl LiveResults {
    pub fn new(api: ApiClient, election: ElectionId, period: Duration) -> Self {
        Self {
            api,
            election,
            period,
            interval: None,
        }
    }

    /// Wait for the next tick and fetch fresh standings. The first call returns at once.
    ///
    /// A failed fetch does not stop the poller; call again to retry on the next tick.
    pub async fn next(&mut self) -> Result<Standings> {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
        Standings::fetch(&self.api, &self.election, ResultsSource::Live).await
    }
}
