//! Version handling for update decisions
//!
//! # Modules
//!
//! - [`normalize`]: canonical, totally ordered versions from inconsistent spellings
//! - [`eligibility`]: stable / pre-release channel gating and comparison

pub mod eligibility;
pub mod normalize;

pub use eligibility::{VersionStatus, compare_versions, is_update_available};
pub use normalize::{NormalizedVersion, PreRelease, PreReleaseTag, normalize};
