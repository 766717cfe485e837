//! Release grouping for published version distributions.

use crate::counters::Counts;

/// Default population below which a release group is not published.
pub const DEFAULT_RELEASE_THRESHOLD: u64 = 100;

/// Release key (`major.minor`) for a full version string.
pub fn release_of(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Group raw version counts by release and drop small groups.
///
/// Groups whose total is at or below `threshold` are removed entirely so
/// rare versions cannot fingerprint individual installations.
pub fn group_versions(versions: &Counts, threshold: u64) -> Counts {
    let mut releases = Counts::new();
    for (version, count) in versions {
        *releases.entry(release_of(version)).or_insert(0) += count;
    }
    releases.retain(|_, total| *total > threshold);
    releases
}
