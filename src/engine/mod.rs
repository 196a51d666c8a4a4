//! Update resolution engine
//!
//! For each tracked component the engine walks one state machine per call:
//!
//! - cached metadata: decide from it, no network
//! - cached failure marker (and no metadata): no decision, no network
//! - miss: pick JSON or GitHub Releases, fetch, cache (success TTL), decide
//! - failed fetch: cache a failure marker (error TTL), notify the observer,
//!   no decision
//!
//! Failures never escape [`UpdateResolutionEngine::resolve`]; they come back
//! as [`Resolution::NoDecision`].

pub mod decision;
pub mod recheck;

use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use tracing::{debug, info};

use crate::cache::error::CacheError;
use crate::cache::{CacheKeys, Clock, KeyValueStore, ResultCache, SystemClock};
use crate::component::ComponentConfig;
use crate::config::{DEFAULT_ERROR_TTL_SECS, DEFAULT_SUCCESS_TTL_SECS};
use crate::events::{FetchFailure, FetchObserver, TracingObserver};
use crate::fetch::MetadataFetcher;
use crate::fetch::asset::resolve_download_url;
use crate::fetch::download::download_headers;
use crate::fetch::error::FetchError;
use crate::fetch::github::{DEFAULT_API_BASE, latest_release_url};
use crate::fetch::json::build_request_url;
use crate::metadata::UpdateMetadata;
use crate::policy::{DefaultPolicy, ResolutionPolicy};
use crate::source::{GitHubRepo, ResolvedMode, decide_mode};
use crate::version::{compare_versions, normalize};

pub use decision::{ComponentDetails, NoDecision, Resolution, UpdateDecision, UpdateOffer, UpToDate};
pub use recheck::{RecheckError, RecheckGuard, RecheckRequest, SharedSecretGuard};

pub struct UpdateResolutionEngine<S: KeyValueStore> {
    cache: ResultCache<S>,
    fetcher: Arc<dyn MetadataFetcher>,
    policy: Arc<dyn ResolutionPolicy>,
    observer: Arc<dyn FetchObserver>,
    clock: Arc<dyn Clock>,
    github_api_base: String,
    site_host: String,
    success_ttl: u64,
    error_ttl: u64,
}

impl<S: KeyValueStore> UpdateResolutionEngine<S> {
    pub fn new(store: S, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self {
            cache: ResultCache::new(store),
            fetcher,
            policy: Arc::new(DefaultPolicy),
            observer: Arc::new(TracingObserver),
            clock: Arc::new(SystemClock),
            github_api_base: DEFAULT_API_BASE.to_string(),
            site_host: String::new(),
            success_ttl: DEFAULT_SUCCESS_TTL_SECS,
            error_ttl: DEFAULT_ERROR_TTL_SECS,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ResolutionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Clock used to timestamp failure markers
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_github_api_base(mut self, api_base: &str) -> Self {
        self.github_api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Host reported to JSON update servers as `domain`
    pub fn with_site_host(mut self, host: &str) -> Self {
        self.site_host = host.to_string();
        self
    }

    /// Default TTLs for components without their own
    pub fn with_ttls(mut self, success_ttl: u64, error_ttl: u64) -> Self {
        self.success_ttl = success_ttl;
        self.error_ttl = error_ttl;
        self
    }

    pub fn cache(&self) -> &ResultCache<S> {
        &self.cache
    }

    /// Resolve the update decision of `component`
    pub async fn resolve(&self, component: &ComponentConfig) -> Resolution {
        let slug = component.slug.as_str();
        let server = self.policy.server_url(slug, &component.source_url);
        let keys = self.cache_keys(component, &server);

        let metadata = match self.cache.get_metadata(&keys) {
            Some(metadata) => {
                debug!("Cache hit for {}: v{}", slug, metadata.version);
                metadata
            }
            None if self.cache.has_error(&keys) => {
                info!("Skipping update check for {}: previous failure cached", slug);
                return Resolution::NoDecision(NoDecision::CachedFailure);
            }
            None => match self.fetch_and_cache(component, &server, &keys).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    self.record_failure(component, &server, &keys, &e);
                    return Resolution::NoDecision(NoDecision::FetchFailed(e));
                }
            },
        };

        Resolution::Decided(self.decide(component, &metadata))
    }

    /// Clear cached metadata and failure state of `component`.
    ///
    /// GitHub sources also lose their cached release payload (current and
    /// legacy keys), so the next resolution fetches the release again.
    pub fn invalidate(&self, component: &ComponentConfig) -> Result<(), CacheError> {
        let server = self.policy.server_url(&component.slug, &component.source_url);
        let keys = self.cache_keys(component, &server);
        let include_release = server.contains("github.com")
            || decide_mode(&server, component.mode) == ResolvedMode::GitHubRelease;

        self.cache.invalidate(&keys, include_release)?;
        info!("Invalidated cached update state for {}", component.slug);
        Ok(())
    }

    /// Manual re-check: verify the request, then [`Self::invalidate`]
    pub fn manual_recheck(
        &self,
        component: &ComponentConfig,
        request: &RecheckRequest,
        guard: &dyn RecheckGuard,
    ) -> Result<(), RecheckError> {
        let requested = request.sanitized_slug();
        if requested != component.slug {
            return Err(RecheckError::SlugMismatch {
                requested,
                tracked: component.slug.clone(),
            });
        }

        guard.authorize(&component.slug, request)?;
        self.invalidate(component)?;
        Ok(())
    }

    /// Details popup data, from cached metadata only
    pub fn details(&self, component: &ComponentConfig) -> Option<ComponentDetails> {
        let server = self.policy.server_url(&component.slug, &component.source_url);
        let metadata = self
            .cache
            .get_metadata(&self.cache_keys(component, &server))?;
        Some(ComponentDetails::new(component, &metadata))
    }

    /// Headers to send when downloading `url` as the package of `component`
    pub fn download_headers(&self, component: &ComponentConfig, url: &str) -> HeaderMap {
        let token = self
            .policy
            .github_token(&component.slug, component.auth_token.as_deref());
        download_headers(url, token.as_deref(), HeaderMap::new())
    }

    fn cache_keys(&self, component: &ComponentConfig, server: &str) -> CacheKeys {
        let prefix = self
            .policy
            .cache_prefix(&component.slug, &component.cache_prefix);
        CacheKeys::new(&prefix, &component.slug, server)
    }

    fn success_ttl(&self, component: &ComponentConfig) -> u64 {
        self.policy.success_ttl(
            &component.slug,
            component.success_ttl.unwrap_or(self.success_ttl),
        )
    }

    fn error_ttl(&self, component: &ComponentConfig) -> u64 {
        self.policy
            .error_ttl(&component.slug, component.error_ttl.unwrap_or(self.error_ttl))
    }

    async fn fetch_and_cache(
        &self,
        component: &ComponentConfig,
        server: &str,
        keys: &CacheKeys,
    ) -> Result<UpdateMetadata, FetchError> {
        if server.trim().is_empty() {
            return Err(FetchError::NoSourceConfigured);
        }

        let mut metadata = match decide_mode(server, component.mode) {
            ResolvedMode::GitHubRelease => self.fetch_github(component, server, keys).await?,
            ResolvedMode::Json => self.fetch_json(component, server).await?,
        };

        let assets = self
            .policy
            .visual_assets(&component.slug, &component.assets);
        metadata.fill_visual_assets(&assets);

        self.cache
            .put_metadata(keys, &metadata, self.success_ttl(component));
        info!(
            "Cached metadata for {}: v{}",
            component.slug, metadata.version
        );
        Ok(metadata)
    }

    async fn fetch_json(
        &self,
        component: &ComponentConfig,
        server: &str,
    ) -> Result<UpdateMetadata, FetchError> {
        let slug = component.slug.as_str();
        let built = build_request_url(
            server,
            slug,
            component.key.as_deref().unwrap_or_default(),
            &self.site_host,
        );
        let url = self.policy.remote_url(slug, &built);

        info!("Fetching metadata for {}: {}", slug, url);
        let metadata = self.fetcher.fetch_metadata(&url).await?;
        Ok(self.policy.metadata_result(slug, metadata))
    }

    async fn fetch_github(
        &self,
        component: &ComponentConfig,
        server: &str,
        keys: &CacheKeys,
    ) -> Result<UpdateMetadata, FetchError> {
        let slug = component.slug.as_str();
        let repo_url = server.trim().trim_end_matches('/');
        let repo = GitHubRepo::from_url(repo_url)?;
        let token = self
            .policy
            .github_token(slug, component.auth_token.as_deref());

        let release = match self.cache.get_release(keys) {
            Some(release) => {
                debug!("Release cache hit for {} ({})", slug, repo);
                release
            }
            None => {
                let api_url = latest_release_url(&self.github_api_base, &repo);
                info!("Fetching latest release of {} for {}", repo, slug);
                let release = self
                    .fetcher
                    .fetch_release(&api_url, token.clone())
                    .await
                    .map_err(|e| FetchError::github(repo.path(), e))?;
                if release.tag().is_some() {
                    self.cache
                        .put_release(keys, &release, self.success_ttl(component));
                }
                release
            }
        };

        let tag = release.tag().ok_or_else(|| {
            FetchError::github(
                repo.path(),
                FetchError::InvalidPayload("release has no tag_name".to_string()),
            )
        })?;

        let download_url = resolve_download_url(
            &self.github_api_base,
            &repo,
            &release,
            component,
            token.is_some(),
        )
        .unwrap_or_default();

        Ok(UpdateMetadata {
            slug: Some(slug.to_string()),
            version: tag.trim().trim_start_matches('v').to_string(),
            download_url,
            homepage: release
                .html_url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| repo_url.to_string()),
            sections: IndexMap::from([(
                "changelog".to_string(),
                release.body.clone().unwrap_or_default(),
            )]),
            ..Default::default()
        })
    }

    fn record_failure(
        &self,
        component: &ComponentConfig,
        server: &str,
        keys: &CacheKeys,
        error: &FetchError,
    ) {
        let ttl = self.error_ttl(component);
        self.cache.put_error(keys, self.clock.now(), ttl);
        info!(
            "Caching failure state for {} for {}s: {}",
            component.slug, ttl, error
        );

        self.observer
            .on_fetch_failed(&FetchFailure::new(&component.slug, server, error));
    }

    fn decide(&self, component: &ComponentConfig, metadata: &UpdateMetadata) -> UpdateDecision {
        let slug = component.slug.as_str();
        let allow_prerelease = self
            .policy
            .allow_prerelease(slug, component.allow_prerelease);
        let current = normalize(&component.installed_version);
        let remote = normalize(&metadata.version);
        let status = compare_versions(&current, &remote, allow_prerelease);

        debug!(
            "Comparing {}: installed={} ({}) remote={} ({}) prerelease={} -> {:?}",
            slug,
            component.installed_version,
            current,
            metadata.version,
            remote,
            allow_prerelease,
            status
        );

        UpdateDecision::new(component, metadata, status)
    }
}
