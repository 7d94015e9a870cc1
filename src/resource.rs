use futures::future::join_all;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ContextError;
use crate::forms::FormCode;
use crate::transport::{Fetched, Freshness, Transport};

/// The kind of a template resource, in the order the candidates are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A PDF whose first page is the background of the form.
    BackgroundDocument,
    /// A PNG image stretched over the page.
    BackgroundImage,
}

impl ResourceKind {
    pub const CANDIDATES: [ResourceKind; 2] =
        [ResourceKind::BackgroundDocument, ResourceKind::BackgroundImage];

    /// Infers the kind of a resource from the extension of its path.
    pub fn from_path(path: &str) -> ResourceKind {
        match path.rsplit_once('.') {
            Some((_, extension)) if extension.eq_ignore_ascii_case("pdf") => {
                ResourceKind::BackgroundDocument
            }
            _ => ResourceKind::BackgroundImage,
        }
    }
}

/// Identifies the templates of a form for a jurisdiction and a fiscal period.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub jurisdiction: String,
    pub period: String,
    pub form: FormCode,
}

impl TemplateKey {
    pub fn new(jurisdiction: impl Into<String>, period: impl Into<String>, form: FormCode) -> Self {
        TemplateKey {
            jurisdiction: jurisdiction.into(),
            period: period.into(),
            form,
        }
    }

    /// The candidate resources of the template, in priority order.
    pub fn candidates(&self) -> [ResourceKey; 2] {
        ResourceKind::CANDIDATES.map(|kind| ResourceKey {
            template: self.clone(),
            kind,
        })
    }
}

/// One concrete resource, which resolves to a storage path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub template: TemplateKey,
    pub kind: ResourceKind,
}

impl ResourceKey {
    pub fn path(&self) -> String {
        let TemplateKey {
            jurisdiction,
            period,
            form,
        } = &self.template;
        match self.kind {
            ResourceKind::BackgroundDocument => {
                format!("formato/{jurisdiction}/{period}/formatos/{}.pdf", form.as_str())
            }
            ResourceKind::BackgroundImage => {
                format!("formato/{jurisdiction}/{period}/imagenes/{}.png", form.as_str())
            }
        }
    }
}

/// A fetched template resource. The content is shared and never mutated once cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub path: String,
    pub bytes: Arc<Vec<u8>>,
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Hit(Resource),
    ConfirmedMiss,
}

/// The state of a template in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Never looked up, or looked up without a definitive answer.
    Unresolved,
    Hit,
    /// Every candidate was reported missing by the source.
    ConfirmedMiss,
}

/// What to remember of a template that no candidate could provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissPolicy {
    /// Record the miss until the cache is cleared, sparing repeated requests.
    #[default]
    Remember,
    /// Look the template up again on every request, so that a late upload is picked up.
    Retry,
}

impl std::str::FromStr for MissPolicy {
    type Err = ContextError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remember" => Ok(MissPolicy::Remember),
            "retry" => Ok(MissPolicy::Retry),
            _ => Err(ContextError::with_context(format!(
                "The miss policy {:?} is not supported",
                value
            ))),
        }
    }
}

/// Cache of template resources. Entries are created on first access and live until `clear`
/// is called, concurrent lookups of the same template share a single retrieval.
pub struct ResourceCache {
    transport: Arc<dyn Transport>,
    entries: Cache<TemplateKey, CacheEntry>,
    miss_policy: MissPolicy,
}

impl ResourceCache {
    pub fn new(transport: Arc<dyn Transport>, miss_policy: MissPolicy) -> Self {
        ResourceCache {
            transport,
            entries: Cache::builder().build(),
            miss_policy,
        }
    }

    /// Returns the background of the template, trying each candidate on the first access.
    pub async fn resolve(&self, key: &TemplateKey) -> Option<Resource> {
        let entry = self
            .entries
            .optionally_get_with(key.clone(), self.look_up(key))
            .await;
        match entry {
            Some(CacheEntry::Hit(resource)) => Some(resource),
            Some(CacheEntry::ConfirmedMiss) | None => None,
        }
    }

    async fn look_up(&self, key: &TemplateKey) -> Option<CacheEntry> {
        let mut unreachable = false;

        for candidate in key.candidates() {
            let path = candidate.path();
            match self.transport.fetch(&path, Freshness::Default).await {
                Ok(Fetched::Found(bytes)) => {
                    log::debug!("Loaded the template resource {:?}", path);
                    return Some(CacheEntry::Hit(Resource {
                        kind: ResourceKind::from_path(&path),
                        path,
                        bytes: Arc::new(bytes),
                    }));
                }
                Ok(Fetched::Missing) => continue,
                Err(error) => {
                    log::warn!("Unable to retrieve the template resource {:?}: {}", path, error);
                    unreachable = true;
                }
            }
        }

        log::warn!(
            "No template found for {} in {}/{}",
            key.form.as_str(),
            key.jurisdiction,
            key.period
        );
        match (unreachable, self.miss_policy) {
            (false, MissPolicy::Remember) => Some(CacheEntry::ConfirmedMiss),
            _ => None,
        }
    }

    pub async fn state(&self, key: &TemplateKey) -> EntryState {
        match self.entries.get(key).await {
            None => EntryState::Unresolved,
            Some(CacheEntry::Hit(_)) => EntryState::Hit,
            Some(CacheEntry::ConfirmedMiss) => EntryState::ConfirmedMiss,
        }
    }

    /// Resolves the templates of every form of a jurisdiction and period concurrently,
    /// returning how many of them were found.
    pub async fn preload(&self, jurisdiction: &str, period: &str) -> usize {
        let keys = FormCode::ALL.map(|form| TemplateKey::new(jurisdiction, period, form));
        let resolved = join_all(keys.iter().map(|key| self.resolve(key))).await;
        resolved.iter().filter(|resource| resource.is_some()).count()
    }

    /// Drops every entry, found and missing alike.
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }
}
