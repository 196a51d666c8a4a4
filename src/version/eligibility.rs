//! Update eligibility for the stable and pre-release channels

use serde::Serialize;

use crate::version::normalize::NormalizedVersion;

/// Relationship between the installed version and the remote version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Remote version is newer and may be offered
    Outdated,
    /// Installed version equals the remote version
    Latest,
    /// Installed version is newer than the remote version
    Newer,
    /// Remote version is a pre-release and the pre-release channel is off
    PrereleaseWithheld,
}

impl VersionStatus {
    pub fn is_update_available(&self) -> bool {
        matches!(self, VersionStatus::Outdated)
    }
}

/// Classify the installed version against the remote version.
///
/// A pre-release remote is withheld whenever `allow_prerelease` is off,
/// regardless of ordering.
pub fn compare_versions(
    current: &NormalizedVersion,
    remote: &NormalizedVersion,
    allow_prerelease: bool,
) -> VersionStatus {
    if !allow_prerelease && remote.is_prerelease() {
        return VersionStatus::PrereleaseWithheld;
    }

    match current.cmp(remote) {
        std::cmp::Ordering::Less => VersionStatus::Outdated,
        std::cmp::Ordering::Equal => VersionStatus::Latest,
        std::cmp::Ordering::Greater => VersionStatus::Newer,
    }
}

/// Whether an update from `current` to `remote` should be offered
pub fn is_update_available(
    current: &NormalizedVersion,
    remote: &NormalizedVersion,
    allow_prerelease: bool,
) -> bool {
    compare_versions(current, remote, allow_prerelease).is_update_available()
}
