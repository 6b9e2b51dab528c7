//! Multi-provider artwork fetch with write-through caching.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use artkeeper_core::{
    ArtMap, ArtType, LibraryHost, LibraryItem, MediaKind, Provider, merge_art,
    normalize_language_tag, rank_art_map,
};

use crate::audiodb::AudioDbClient;
use crate::cache::ArtworkCache;
use crate::credentials::ApiKeys;
use crate::error::ScrapeError;
use crate::fanart::FanartClient;
use crate::provider::{CommunityArt, ImageCatalog, MusicCatalog};
use crate::strategy::{FetchContext, ResolvedIds, strategy_for};
use crate::tmdb::TmdbClient;
use crate::ttl::get_cache_ttl;

/// Options for a single fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip the cache read and refetch from every provider.
    pub bypass_cache: bool,
}

/// Resolves an item's provider ids, reads the cache or queries providers,
/// and returns ranked candidates per art type.
#[derive(Clone)]
pub struct MultiSourceFetcher {
    ctx: FetchContext,
    cancel: Arc<AtomicBool>,
}

impl MultiSourceFetcher {
    /// A fetcher with no providers; add them with the `with_*` builders.
    pub fn new(host: Arc<dyn LibraryHost>, cache: ArtworkCache) -> Self {
        Self {
            ctx: FetchContext {
                host,
                tmdb: None,
                fanart: None,
                audiodb: None,
                cache,
                language: None,
            },
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the real provider clients for whichever keys are set.
    pub fn from_keys(
        host: Arc<dyn LibraryHost>,
        cache: ArtworkCache,
        keys: &ApiKeys,
        language: Option<&str>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, ScrapeError> {
        let mut fetcher = Self::new(host, cache)
            .with_language(language)
            .with_cancel(Arc::clone(&cancel));
        if let Some(key) = &keys.tmdb {
            fetcher = fetcher.with_tmdb(Arc::new(
                TmdbClient::new(key.clone(), language)?.with_cancel(Arc::clone(&cancel)),
            ));
        } else {
            log::warn!("No TMDB API key configured; movie and TV artwork will be limited");
        }
        if let Some(key) = &keys.fanart {
            fetcher = fetcher.with_fanart(Arc::new(
                FanartClient::new(key.clone())?.with_cancel(Arc::clone(&cancel)),
            ));
        } else {
            log::warn!("No fanart.tv API key configured");
        }
        fetcher = fetcher.with_audiodb(Arc::new(
            AudioDbClient::new(keys.audiodb.as_deref())?.with_cancel(cancel),
        ));
        Ok(fetcher)
    }

    pub fn with_tmdb(mut self, client: Arc<dyn ImageCatalog>) -> Self {
        self.ctx.tmdb = Some(client);
        self
    }

    pub fn with_fanart(mut self, client: Arc<dyn CommunityArt>) -> Self {
        self.ctx.fanart = Some(client);
        self
    }

    pub fn with_audiodb(mut self, client: Arc<dyn MusicCatalog>) -> Self {
        self.ctx.audiodb = Some(client);
        self
    }

    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.ctx.language = normalize_language_tag(language);
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cache(&self) -> &ArtworkCache {
        &self.ctx.cache
    }

    pub fn host(&self) -> &Arc<dyn LibraryHost> {
        &self.ctx.host
    }

    pub fn language(&self) -> Option<&str> {
        self.ctx.language.as_deref()
    }

    fn check_cancel(&self) -> Result<(), ScrapeError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(ScrapeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Candidates for a library item, keyed by art type and ranked best-first.
    ///
    /// An item that is gone from the library, or that carries no usable
    /// provider ids, yields an empty map.
    pub async fn fetch_all(
        &self,
        kind: MediaKind,
        dbid: i64,
        opts: FetchOptions,
    ) -> Result<ArtMap, ScrapeError> {
        self.check_cancel()?;
        let Some(item) = self.ctx.host.get_item(kind, dbid)? else {
            log::debug!("{kind} {dbid} is not in the library");
            return Ok(ArtMap::new());
        };
        self.fetch_for_item(&item, opts).await
    }

    /// [`fetch_all`](Self::fetch_all) for an item already read from the host.
    pub async fn fetch_for_item(
        &self,
        item: &LibraryItem,
        opts: FetchOptions,
    ) -> Result<ArtMap, ScrapeError> {
        self.check_cancel()?;
        let strategy = strategy_for(item.kind);
        let Some(mut ids) = strategy.resolve(&self.ctx, item).await? else {
            log::debug!("No provider ids for {} {} '{}'", item.kind, item.dbid, item.title);
            return Ok(ArtMap::new());
        };
        ids.sources.retain(|(p, _)| self.ctx.has_provider(*p));
        if ids.sources.is_empty() {
            log::debug!("No configured provider serves {} {}", item.kind, item.dbid);
            return Ok(ArtMap::new());
        }

        let providers: Vec<Provider> = ids.sources.iter().map(|(p, _)| *p).collect();
        if !opts.bypass_cache && self.ctx.cache.covers(item.kind, &ids.cache_key, &providers)? {
            let mut art = self
                .ctx
                .cache
                .load_batch(item.kind, &ids.sources, ArtType::all())?;
            log::debug!(
                "Cache hit for {} {} ({} art types)",
                item.kind,
                ids.cache_key,
                art.len()
            );
            rank_art_map(&mut art, self.language());
            return Ok(art);
        }

        self.check_cancel()?;
        let art = self.fetch_and_store(item.kind, &ids).await?;
        Ok(art)
    }

    /// Query providers, write every successful answer through, and mark the
    /// item complete only when all of them answered.
    async fn fetch_and_store(&self, kind: MediaKind, ids: &ResolvedIds) -> Result<ArtMap, ScrapeError> {
        let ttl = get_cache_ttl(ids.release_date);
        let providers: Vec<Provider> = ids.sources.iter().map(|(p, _)| *p).collect();
        let results = strategy_for(kind).fetch(&self.ctx, ids).await;

        let mut merged = ArtMap::new();
        let mut failure = None;
        for result in results {
            match result.outcome {
                Ok(art) => {
                    self.ctx.cache.put(
                        kind,
                        &result.cache_id,
                        result.provider,
                        &art,
                        ids.release_date,
                        ttl,
                    )?;
                    merge_art(&mut merged, art);
                }
                Err(e) => {
                    log::warn!(
                        "{} failed for {kind} {}: {e}",
                        result.provider,
                        ids.cache_key
                    );
                    if failure.is_none() || matches!(e, ScrapeError::Cancelled) {
                        failure = Some(e);
                    }
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        self.ctx
            .cache
            .mark_complete(kind, &ids.cache_key, &providers, ids.release_date, ttl)?;
        log::debug!(
            "Fetched {kind} {}: {} art types, cached for {}h",
            ids.cache_key,
            merged.len(),
            ttl.num_hours()
        );
        rank_art_map(&mut merged, self.language());
        Ok(merged)
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
