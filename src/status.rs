//! Per-entry status classification.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an archived build is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The latest remote build could not be determined.
    Unresolved,
    UpdateAvailable,
    UpToDate,
}

impl Status {
    /// Return the stable string identifier used in JSON reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unresolved => "unresolved",
            Status::UpdateAvailable => "update_available",
            Status::UpToDate => "up_to_date",
        }
    }

    pub const ALL: [Status; 3] = [Status::UpdateAvailable, Status::UpToDate, Status::Unresolved];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an entry from its installed and latest build ids.
///
/// A missing installed build compares as `0`, so it never causes
/// `Unresolved` by itself.
pub fn classify(installed: Option<u64>, latest: Option<u64>) -> Status {
    match latest {
        None => Status::Unresolved,
        Some(latest) if latest > installed.unwrap_or(0) => Status::UpdateAvailable,
        Some(_) => Status::UpToDate,
    }
}
