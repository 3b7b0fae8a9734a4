//! Identifier types and generators.
//!
//! Hub-side handles use a strongly-typed wrapper around [`Uuid`] so a sink
//! handle can never be confused with anything else at compile time. Event
//! identifiers stay plain strings on the wire because external publishers
//! are free to choose their own; [`new_event_id`] is what this workspace
//! uses when it mints one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Handle for one live observer sink registered with the hub.
    SinkId
}

/// Mint a fresh, globally unique event identifier.
///
/// The `label` is embedded for readability in logs and timelines
/// (`event-assessed-0190...`). Uniqueness comes from the UUID v7 suffix,
/// never from the label.
pub fn new_event_id(label: &str) -> String {
    let id = Uuid::now_v7().simple();
    if label.is_empty() {
        format!("event-{id}")
    } else {
        format!("event-{label}-{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_ids_are_unique() {
        let a = SinkId::new();
        let b = SinkId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn event_ids_never_repeat() {
        let ids: std::collections::BTreeSet<String> =
            (0..1000).map(|_| new_event_id("tip1")).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("event-tip1-")));
    }

    #[test]
    fn empty_label_is_omitted() {
        assert!(!new_event_id("").contains("--"));
    }
}
