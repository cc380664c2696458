use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CandidateId, Election, ElectionId};

/// A ballot for a single-choice election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
}

/// What the server returns for a cast. `success` must be `true` for the vote to count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<VoteReceipt>,
}

/// Proof of a recorded vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    /// Token the voter can later use to check their vote was counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voted_at: Option<DateTime<Utc>>,
}

/// Response of `GET /votes/check/:electionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCheck {
    pub has_voted: bool,
}

/// A candidate's raw tally as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCount {
    #[serde(rename = "_id", alias = "candidateId", alias = "id")]
    pub candidate_id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub vote_count: u64,
}

/// Payload of both results endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsPayload {
    pub election: Election,
    pub results: Vec<RawCount>,
}

/// Response of `GET /votes/verify/:token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteVerification {
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election: Option<Election>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voted_at: Option<DateTime<Utc>>,
}
