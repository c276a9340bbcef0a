//! Snapshot identifiers of one archived day.

use std::fmt;

/// Seconds between two consecutive archive snapshots
pub const SNAPSHOT_INTERVAL_SECS: u32 = 5;

/// Number of snapshots in a full day
pub const SNAPSHOTS_PER_DAY: usize = (24 * 60 * 60 / SNAPSHOT_INTERVAL_SECS) as usize;

/// Name of one archived snapshot, `HHMMSSZ`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    fn from_hms(hour: u32, minute: u32, second: u32) -> Self {
        Self(format!("{:02}{:02}{:02}Z", hour, minute, second))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All snapshot identifiers of a day in chronological order, optionally
/// truncated to the first `limit` entries.
pub fn snapshot_ids(limit: Option<usize>) -> Vec<SnapshotId> {
    let count = limit.map_or(SNAPSHOTS_PER_DAY, |l| l.min(SNAPSHOTS_PER_DAY));

    (0..24)
        .flat_map(|h| (0..60).map(move |m| (h, m)))
        .flat_map(|(h, m)| {
            (0..60)
                .step_by(SNAPSHOT_INTERVAL_SECS as usize)
                .map(move |s| SnapshotId::from_hms(h, m, s))
        })
        .take(count)
        .collect()
}
