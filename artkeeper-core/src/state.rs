//! Lifecycle states for queue entries, art items, and scan sessions.

use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Status of a queue entry (one library item awaiting artwork).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Completed,
    Skipped,
    Error,
}

string_enum!(QueueStatus {
    Pending => "pending",
    Completed => "completed",
    Skipped => "skipped",
    Error => "error",
});

impl QueueStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Status of one (queue entry, art type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtItemStatus {
    Pending,
    Completed,
    Stale,
    Skipped,
}

string_enum!(ArtItemStatus {
    Pending => "pending",
    Completed => "completed",
    Stale => "stale",
    Skipped => "skipped",
});

/// Which slots an art item may write. Only missing-slot review exists;
/// automatic processing refuses anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    MissingOnly,
}

string_enum!(ReviewMode {
    MissingOnly => "missing_only",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    MissingArt,
    ManualReview,
}

string_enum!(ScanType {
    MissingArt => "missing_art",
    ManualReview => "manual_review",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Cancelled,
}

string_enum!(SessionStatus {
    Running => "running",
    Paused => "paused",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_forms_parse_back() {
        for s in [QueueStatus::Pending, QueueStatus::Completed, QueueStatus::Skipped, QueueStatus::Error] {
            assert_eq!(QueueStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ScanType::parse("manual_review"), Some(ScanType::ManualReview));
        assert_eq!(ArtItemStatus::parse("stale"), Some(ArtItemStatus::Stale));
        assert_eq!(SessionStatus::parse("bogus"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!QueueStatus::Pending.is_terminal());
        assert!(QueueStatus::Skipped.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Paused.is_terminal());
    }
}
