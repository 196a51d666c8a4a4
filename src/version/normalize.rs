//! Version normalization
//!
//! Installed and remote versions come from hand-edited plugin headers, git
//! tags and metadata files, so their spelling is inconsistent (`v1.3`,
//! `1.3.0RC2`, `1.3.0_beta`, `1.3.0-pre.1+build.7`). Every version is
//! canonicalized into `major.minor.patch[-tag.ordinal]` before it is compared.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Leading numeric core (`2.0` in `2.0rc1`) and whatever follows it
static CORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)(.*)$").expect("core pattern is valid")
});

/// Attached, hyphenated or dotted pre-release spelling after a full core version
static PRERELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+\.\d+\.\d+)[.\-]?(alpha|a|beta|b|rc|dev|pre|preview)(?:[.\-]?(\d+))?$")
        .expect("pre-release pattern is valid")
});

/// Pre-release channel tag
///
/// Variant order is the ranking used for comparison: `dev` sorts before
/// `alpha`, which sorts before `beta`, which sorts before `rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseTag {
    Dev,
    Alpha,
    Beta,
    Rc,
}

impl PreReleaseTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreReleaseTag::Dev => "dev",
            PreReleaseTag::Alpha => "alpha",
            PreReleaseTag::Beta => "beta",
            PreReleaseTag::Rc => "rc",
        }
    }

    /// Map a spelling (including shorthands and synonyms) to its canonical tag
    fn from_spelling(spelling: &str) -> Option<Self> {
        match spelling.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Some(PreReleaseTag::Alpha),
            // pre/preview share the beta rank
            "b" | "beta" | "pre" | "preview" => Some(PreReleaseTag::Beta),
            "rc" => Some(PreReleaseTag::Rc),
            "dev" => Some(PreReleaseTag::Dev),
            _ => None,
        }
    }
}

/// Pre-release tag with its ordinal (`beta.2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub tag: PreReleaseTag,
    pub ordinal: u64,
}

/// Canonical, totally ordered version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<PreRelease>,
}

impl NormalizedVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    pub fn with_pre(mut self, tag: PreReleaseTag, ordinal: u64) -> Self {
        self.pre = Some(PreRelease { tag, ordinal });
        self
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for NormalizedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                // A release outranks every pre-release of the same core version
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for NormalizedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NormalizedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}.{}", pre.tag.as_str(), pre.ordinal)?;
        }
        Ok(())
    }
}

/// Canonicalize a raw version string into its textual normalized form.
///
/// Steps: strip build metadata after `+`, strip leading `v`/`V`, turn
/// underscores into hyphens, pad a numeric `x` or `x.y` core to three
/// components while keeping any suffix, then rewrite a recognized
/// pre-release spelling as `-tag.ordinal`. Input that does not fit these
/// shapes is returned otherwise untouched.
pub fn canonicalize(raw: &str) -> String {
    let mut v = raw.trim();
    if let Some((head, _build)) = v.split_once('+') {
        v = head;
    }
    let v = v.trim_start_matches(['v', 'V']).replace('_', "-");

    let padded = CORE_RE.captures(&v).and_then(|caps| {
        let (core, suffix) = (&caps[1], &caps[2]);
        match core.matches('.').count() {
            0 => Some(format!("{core}.0.0{suffix}")),
            1 => Some(format!("{core}.0{suffix}")),
            _ => None,
        }
    });
    let v = padded.unwrap_or(v);

    match PRERELEASE_RE.captures(&v) {
        Some(caps) => {
            let tag = PreReleaseTag::from_spelling(&caps[2]).unwrap_or(PreReleaseTag::Beta);
            let ordinal = caps.get(3).map_or("0", |m| m.as_str());
            format!("{}-{}.{}", &caps[1], tag.as_str(), ordinal)
        }
        None => v,
    }
}

/// Normalize a raw version string. Never fails: components that cannot be
/// read default to `0` and unrecognized pre-release suffixes are ignored.
pub fn normalize(raw: &str) -> NormalizedVersion {
    let canonical = canonicalize(raw);
    let (core, pre) = match canonical.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (canonical.as_str(), None),
    };

    let mut parts = core.split('.').map(leading_number);
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);

    NormalizedVersion {
        major,
        minor,
        patch,
        pre: pre.and_then(parse_prerelease),
    }
}

/// Parse a canonical `tag.ordinal` suffix
fn parse_prerelease(pre: &str) -> Option<PreRelease> {
    let (tag, ordinal) = match pre.split_once('.') {
        Some((tag, ordinal)) => (tag, ordinal),
        None => (pre, "0"),
    };
    let tag = match tag {
        "alpha" => PreReleaseTag::Alpha,
        "beta" => PreReleaseTag::Beta,
        "rc" => PreReleaseTag::Rc,
        "dev" => PreReleaseTag::Dev,
        _ => return None,
    };
    Some(PreRelease {
        tag,
        ordinal: ordinal.parse().unwrap_or(0),
    })
}

/// Numeric value of the leading digits of a component (`"3rc"` -> 3)
fn leading_number(s: &str) -> u64 {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", "1.2.3")]
    #[case("v1.2.3", "1.2.3")]
    #[case("V2.0", "2.0.0")]
    #[case("3", "3.0.0")]
    #[case("1.2.3+build.9", "1.2.3")]
    #[case("1.3.0alpha2", "1.3.0-alpha.2")]
    #[case("1.3.0-alpha", "1.3.0-alpha.0")]
    #[case("1.3.0.beta.4", "1.3.0-beta.4")]
    #[case("1.3.0_b1", "1.3.0-beta.1")]
    #[case("1.3.0a", "1.3.0-alpha.0")]
    #[case("1.3.0RC2", "1.3.0-rc.2")]
    #[case("1.3.0-pre", "1.3.0-beta.0")]
    #[case("1.3.0-preview-3", "1.3.0-beta.3")]
    #[case("1.3.0-dev.1", "1.3.0-dev.1")]
    #[case("v1.3.0-Beta.2+sha.abc", "1.3.0-beta.2")]
    #[case("2.0-rc1", "2.0.0-rc.1")]
    #[case("2.0rc1", "2.0.0-rc.1")]
    #[case("2.0beta", "2.0.0-beta.0")]
    #[case("2-alpha1", "2.0.0-alpha.1")]
    #[case("v3.1b2", "3.1.0-beta.2")]
    #[case("1.4.RC.3", "1.4.0-rc.3")]
    #[case("1.2-foo", "1.2.0-foo")]
    fn canonicalize_rewrites_known_spellings(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(canonicalize(raw), expected);
    }

    #[rstest]
    #[case("1.2.3", NormalizedVersion::new(1, 2, 3))]
    #[case("1.2", NormalizedVersion::new(1, 2, 0))]
    #[case("", NormalizedVersion::new(0, 0, 0))]
    #[case("garbage", NormalizedVersion::new(0, 0, 0))]
    #[case("1.2.3.4", NormalizedVersion::new(1, 2, 3))]
    #[case("1.x", NormalizedVersion::new(1, 0, 0))]
    #[case("1.0.0-foo", NormalizedVersion::new(1, 0, 0))]
    #[case("2.1.0rc", NormalizedVersion::new(2, 1, 0).with_pre(PreReleaseTag::Rc, 0))]
    #[case("2.0-rc1", NormalizedVersion::new(2, 0, 0).with_pre(PreReleaseTag::Rc, 1))]
    #[case("v3.1b2", NormalizedVersion::new(3, 1, 0).with_pre(PreReleaseTag::Beta, 2))]
    #[case("2-dev", NormalizedVersion::new(2, 0, 0).with_pre(PreReleaseTag::Dev, 0))]
    fn normalize_degrades_to_best_effort(#[case] raw: &str, #[case] expected: NormalizedVersion) {
        assert_eq!(normalize(raw), expected);
    }

    #[rstest]
    #[case("1.2.3")]
    #[case("v1.2")]
    #[case("1.3.0alpha2")]
    #[case("1.3.0-preview")]
    #[case("not a version")]
    #[case("1.2.3.4-beta")]
    #[case("2.0rc1")]
    #[case("1.x")]
    #[case("99999999999999999999999.1")]
    fn normalize_is_idempotent(#[case] raw: &str) {
        let once = normalize(raw);
        assert_eq!(normalize(&once.to_string()), once);
    }

    #[rstest]
    #[case("1.0.0", "1.0.0-rc.9")]
    #[case("1.0.0-rc.1", "1.0.0-beta.5")]
    #[case("1.0.0-beta.1", "1.0.0-alpha.7")]
    #[case("1.0.0-alpha.1", "1.0.0-dev.3")]
    #[case("1.0.0-beta.2", "1.0.0-beta.1")]
    #[case("1.0.1-dev", "1.0.0")]
    #[case("1.10.0", "1.9.9")]
    fn ordering_ranks_release_above_prerelease(#[case] higher: &str, #[case] lower: &str) {
        let higher = normalize(higher);
        let lower = normalize(lower);
        assert!(higher > lower);
        assert!(lower < higher);
        assert_ne!(higher, lower);
    }

    #[test]
    fn pre_and_preview_share_beta_rank() {
        assert_eq!(normalize("1.0.0-pre.1"), normalize("1.0.0-beta.1"));
        assert_eq!(normalize("1.0.0preview1"), normalize("1.0.0b1"));
    }

    #[test]
    fn display_emits_canonical_form() {
        let v = NormalizedVersion::new(4, 5, 6).with_pre(PreReleaseTag::Alpha, 0);
        assert_eq!(v.to_string(), "4.5.6-alpha.0");
        assert_eq!(NormalizedVersion::new(4, 5, 6).to_string(), "4.5.6");
    }
}
