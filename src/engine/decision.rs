//! Host-facing results of a resolution

use indexmap::IndexMap;
use serde::Serialize;

use crate::component::{ComponentConfig, ComponentKind};
use crate::fetch::error::FetchError;
use crate::metadata::UpdateMetadata;
use crate::version::VersionStatus;

/// Installed version is current (or the newer remote is not eligible)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpToDate {
    /// Slug the host knows the component by
    pub slug: String,
    pub kind: ComponentKind,
    pub current_version: String,
    pub status: VersionStatus,
    pub homepage: String,
    pub tested: String,
    pub requires: String,
    pub requires_php: String,
    pub icons: IndexMap<String, String>,
    pub banners: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// An eligible newer version and where to get it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOffer {
    pub slug: String,
    pub kind: ComponentKind,
    pub name: String,
    pub current_version: String,
    pub new_version: String,
    /// Package URL; empty when the source offered none
    pub package: String,
    pub homepage: String,
    pub tested: String,
    pub requires: String,
    pub requires_php: String,
    pub sections: IndexMap<String, String>,
    pub icons: IndexMap<String, String>,
    pub banners: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum UpdateDecision {
    UpToDate(UpToDate),
    UpdateAvailable(UpdateOffer),
}

impl UpdateDecision {
    pub(crate) fn new(
        component: &ComponentConfig,
        metadata: &UpdateMetadata,
        status: VersionStatus,
    ) -> Self {
        let slug = component.host_slug().to_string();
        if !status.is_update_available() {
            return UpdateDecision::UpToDate(UpToDate {
                slug,
                kind: component.kind,
                current_version: component.installed_version.clone(),
                status,
                homepage: metadata.homepage.clone(),
                tested: metadata.tested.clone(),
                requires: metadata.requires.clone(),
                requires_php: metadata.requires_php.clone(),
                icons: metadata.icons.clone(),
                banners: metadata.banners.clone(),
                screenshot: metadata.screenshot.clone(),
            });
        }

        let sections = match component.kind {
            ComponentKind::Plugin => metadata.sections.clone(),
            ComponentKind::Theme => IndexMap::new(),
        };
        UpdateDecision::UpdateAvailable(UpdateOffer {
            slug,
            kind: component.kind,
            name: component.display_name.clone(),
            current_version: component.installed_version.clone(),
            new_version: metadata.version.clone(),
            package: metadata.download_url.clone(),
            homepage: metadata.homepage.clone(),
            tested: metadata.tested.clone(),
            requires: metadata.requires.clone(),
            requires_php: metadata.requires_php.clone(),
            sections,
            icons: metadata.icons.clone(),
            banners: metadata.banners.clone(),
            screenshot: metadata.screenshot.clone(),
        })
    }

    pub fn is_update_available(&self) -> bool {
        matches!(self, UpdateDecision::UpdateAvailable(_))
    }

    /// Package URL when an update is offered
    pub fn package(&self) -> Option<&str> {
        match self {
            UpdateDecision::UpdateAvailable(offer) => Some(&offer.package),
            UpdateDecision::UpToDate(_) => None,
        }
    }
}

/// Why no decision was produced
#[derive(Debug)]
pub enum NoDecision {
    /// A failure is cached for the component; no fetch was attempted
    CachedFailure,
    FetchFailed(FetchError),
}

/// Outcome of one resolution call
#[derive(Debug)]
pub enum Resolution {
    Decided(UpdateDecision),
    NoDecision(NoDecision),
}

impl Resolution {
    pub fn decision(&self) -> Option<&UpdateDecision> {
        match self {
            Resolution::Decided(decision) => Some(decision),
            Resolution::NoDecision(_) => None,
        }
    }

    pub fn into_decision(self) -> Option<UpdateDecision> {
        match self {
            Resolution::Decided(decision) => Some(decision),
            Resolution::NoDecision(_) => None,
        }
    }

    pub fn is_update_available(&self) -> bool {
        self.decision()
            .is_some_and(UpdateDecision::is_update_available)
    }
}

/// Data for the host's "view details" popup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDetails {
    pub name: String,
    pub slug: String,
    pub version: String,
    pub author: String,
    pub author_homepage: String,
    pub requires: String,
    pub tested: String,
    pub requires_php: String,
    pub last_updated: String,
    pub download_link: String,
    pub homepage: String,
    pub sections: IndexMap<String, String>,
    pub icons: IndexMap<String, String>,
    pub banners: IndexMap<String, String>,
    pub screenshots: IndexMap<String, String>,
}

impl ComponentDetails {
    /// Themes only expose the changelog and the fields their popup shows.
    pub(crate) fn new(component: &ComponentConfig, metadata: &UpdateMetadata) -> Self {
        let details = Self {
            name: component.display_name.clone(),
            slug: component.host_slug().to_string(),
            version: metadata.version.clone(),
            author: metadata.author.clone(),
            author_homepage: metadata.author_homepage.clone(),
            requires: metadata.requires.clone(),
            tested: metadata.tested.clone(),
            requires_php: metadata.requires_php.clone(),
            last_updated: metadata.last_updated.clone(),
            download_link: metadata.download_url.clone(),
            homepage: metadata.homepage.clone(),
            sections: metadata.sections.clone(),
            icons: metadata.icons.clone(),
            banners: metadata.banners.clone(),
            screenshots: metadata.screenshots.clone(),
        };

        match component.kind {
            ComponentKind::Plugin => details,
            ComponentKind::Theme => Self {
                author: String::new(),
                author_homepage: String::new(),
                requires_php: String::new(),
                last_updated: String::new(),
                homepage: String::new(),
                sections: IndexMap::from([(
                    "changelog".to_string(),
                    metadata.changelog().to_string(),
                )]),
                screenshots: IndexMap::new(),
                ..details
            },
        }
    }
}
