//! Typed request and response shapes for every endpoint the client talks to.
//! Payloads are parsed into these types at the boundary; nothing downstream sees raw JSON.

pub mod admin;
pub mod candidate;
pub mod election;
pub mod envelope;
pub mod id;
pub mod reference;
pub mod user;
pub mod vote;

pub use admin::{AuditLog, AuditLogPage, AuditLogQuery, Settings, Severity, Stats};
pub use candidate::{Candidate, CandidateSpec};
pub use election::{Election, ElectionSpec, ElectionStatus};
pub use envelope::{Ack, Envelope};
pub use id::{CandidateId, ElectionId, LogId, UserId};
pub use user::{Identity, Role, VotingRecord};
pub use vote::{CastAck, RawCount, ResultsPayload, VoteReceipt};
