use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{reference, CandidateId, ElectionId, UserId};

/// States in the election lifecycle. Only the server moves an election between them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Under construction, still editable.
    Draft,
    /// Open for voting.
    Active,
    /// Voting has ended; results may or may not be published.
    Closed,
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

/// An election as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    #[serde(rename = "_id", alias = "id")]
    pub id: ElectionId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: ElectionStatus,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub results_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_voting_type")]
    pub voting_type: String,
    #[serde(default, deserialize_with = "reference::many")]
    pub candidates: Vec<CandidateId>,
    #[serde(
        default,
        deserialize_with = "reference::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_by: Option<UserId>,
}

fn default_voting_type() -> String {
    SINGLE_CHOICE.to_string()
}

/// The only voting type the platform currently supports.
pub const SINGLE_CHOICE: &str = "single-choice";

impl Election {
    /// Ballots are only accepted while active.
    pub fn accepts_votes(&self) -> bool {
        self.status == ElectionStatus::Active
    }

    /// Only drafts may be edited.
    pub fn is_editable(&self) -> bool {
        self.status == ElectionStatus::Draft
    }

    /// Results can be published once, after the election has closed.
    pub fn can_publish_results(&self) -> bool {
        self.status == ElectionStatus::Closed && !self.results_published
    }

    /// Officers can follow the running count once voting has opened.
    pub fn has_live_scores(&self) -> bool {
        matches!(self.status, ElectionStatus::Active | ElectionStatus::Closed)
    }

    /// Reject a publish request locally rather than round-tripping a certain failure.
    pub fn ensure_publishable(&self) -> Result<()> {
        if self.status != ElectionStatus::Closed {
            return Err(Error::Validation(
                "Can only publish results for closed elections".to_string(),
            ));
        }
        if self.results_published {
            return Err(Error::Validation(
                "Results are already published".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject an edit locally if the election is past its draft stage.
    pub fn ensure_editable(&self) -> Result<()> {
        if !self.is_editable() {
            return Err(Error::Validation(
                "Only draft elections can be edited.".to_string(),
            ));
        }
        Ok(())
    }
}

/// The election create/edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub voting_type: String,
}

impl ElectionSpec {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation("Description is required".to_string()));
        }
        if self.end_date <= self.start_date {
            return Err(Error::Validation(
                "End date must be after start date".to_string(),
            ));
        }
        if self.voting_type != SINGLE_CHOICE {
            return Err(Error::Validation(format!(
                "Unsupported voting type '{}'",
                self.voting_type
            )));
        }
        Ok(())
    }
}
