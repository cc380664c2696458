use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Declare an opaque, server-assigned string ID.
/// The server hands these out; the client never parses or generates them.
macro_rules! api_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:?}", self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

api_id!(
    /// Unique ID of a user account.
    UserId
);
api_id!(
    /// Unique ID of an election.
    ElectionId
);
api_id!(
    /// Unique ID of a candidate within an election.
    CandidateId
);
api_id!(
    /// Unique ID of an audit log entry.
    LogId
);
