//! Identifier newtypes
//!
//! All ids are opaque strings (UUIDs in practice, but imports and seed
//! data may use readable codes). Newtypes keep them from being mixed up
//! at call sites.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a proposal
    ProposalId
);
string_id!(
    /// Unique identifier for a user (lecturer, manager, board member)
    UserId
);
string_id!(
    /// Unique identifier for a faculty (organizational unit)
    FacultyId
);
string_id!(
    /// Unique identifier for a review council
    CouncilId
);
