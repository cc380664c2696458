use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{reference, CandidateId, ElectionId};

/// A candidate standing in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(rename = "_id", alias = "id")]
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifesto: Option<String>,
    #[serde(deserialize_with = "reference::one")]
    pub election: ElectionId,
    #[serde(default)]
    pub is_approved: bool,
    /// Only visible candidates appear on the ballot.
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub vote_count: u64,
}

/// The add/edit candidate form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateSpec {
    pub name: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    pub election: ElectionId,
}

impl CandidateSpec {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Candidate name is required".to_string()));
        }
        if self.position.trim().is_empty() {
            return Err(Error::Validation("Position is required".to_string()));
        }
        Ok(())
    }
}

/// Keep only the candidates a voter can choose between.
pub fn ballot(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.into_iter().filter(|c| c.is_visible).collect()
}
