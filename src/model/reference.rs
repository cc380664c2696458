//! The backend sometimes populates a reference into the full document and sometimes
//! sends the bare ID. These helpers accept either and keep only the ID.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Reference {
    Id(String),
    Populated {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl Reference {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) => id,
            Self::Populated { id } => id,
        }
    }
}

/// Deserialize a single reference.
pub fn one<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Reference::deserialize(deserializer).map(|r| T::from(r.into_id()))
}

/// Deserialize an optional reference; `null` and a missing field both map to `None`.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Option::<Reference>::deserialize(deserializer).map(|r| r.map(|r| T::from(r.into_id())))
}

/// Deserialize a list of references.
pub fn many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Vec::<Reference>::deserialize(deserializer)
        .map(|refs| refs.into_iter().map(|r| T::from(r.into_id())).collect())
}
