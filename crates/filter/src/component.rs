//! ACL stage of the search request pipeline
//!
//! Lifecycle: `AclComponent::init(config)` once, then `prepare` for every
//! request, `stats` on demand. The stage reads the configured principal
//! parameter, resolves one bitmap per segment of the request's snapshot
//! through the filter cache, and appends the resulting [`AclFilter`].
//!
//! Requests without the parameter are left untouched. A build failure
//! fails the request; it never degrades to "no filter".

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use strata_acl_core::{AclConfig, FilterSettings, PrincipalSet, Result};
use strata_acl_index::{IndexSnapshot, SegmentView};
use tracing::{debug, info, warn};

use crate::builder::FilterBuilder;
use crate::cache::{FilterCache, FilterKey};
use crate::observer::{BuildObserver, TracingObserver};
use crate::request::{AclFilter, SearchRequest};
use crate::stats::CacheStats;

/// A stage the host search pipeline runs before executing a query.
pub trait SearchComponent: Send + Sync {
    /// Stable component name used in statistics reports
    fn name(&self) -> &str;

    /// Inspect the request and append filters.
    fn prepare(&self, request: &mut SearchRequest, snapshot: &IndexSnapshot) -> Result<()>;

    /// Statistics report
    fn stats(&self) -> ComponentStats;
}

/// Statistics report for one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStats {
    /// Component name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Filter cache counters
    #[serde(flatten)]
    pub cache: CacheStats,
}

impl ComponentStats {
    /// Render as a JSON object
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Restricts results to documents readable by the requesting principals.
pub struct AclComponent {
    settings: FilterSettings,
    builder: FilterBuilder,
    cache: FilterCache,
}

impl AclComponent {
    /// Component name in statistics reports
    pub const NAME: &'static str = "acl";

    /// Validate `config` and create the component.
    ///
    /// # Errors
    ///
    /// `MissingConfig` / `InvalidConfig` if the configuration is unusable;
    /// the component must not start in that case.
    pub fn init(config: &AclConfig) -> Result<Self> {
        Self::init_with_observer(config, Arc::new(TracingObserver))
    }

    /// Like [`AclComponent::init`], reporting build measurements to `observer`.
    pub fn init_with_observer(config: &AclConfig, observer: Arc<dyn BuildObserver>) -> Result<Self> {
        let settings = config.validate()?;
        info!(
            target: "strata::acl",
            parameter = %settings.principals_parameter,
            field = %settings.principals_field,
            max_entries = settings.max_cache_entries,
            low_water_mark = settings.cache_low_water_mark,
            "ACL component initialised"
        );
        Ok(AclComponent {
            builder: FilterBuilder::with_observer(settings.principals_field.clone(), observer),
            cache: FilterCache::from_settings(&settings),
            settings,
        })
    }

    /// Validated settings
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// The shared filter cache
    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    /// Resolve the filter for `principals` over every segment of `snapshot`.
    ///
    /// Segments are resolved in parallel; each miss is built and cached
    /// independently. If any segment fails the whole filter fails, while
    /// bitmaps already built for other segments stay cached.
    pub fn filter_for(&self, principals: &PrincipalSet, snapshot: &IndexSnapshot) -> Result<AclFilter> {
        let key = principals.key();
        let segments = snapshot
            .segments()
            .par_iter()
            .map(|segment| -> Result<_> {
                let segment_key = segment.segment_key();
                let bitmap = self
                    .cache
                    .resolve(FilterKey::new(key.clone(), segment_key), || {
                        self.builder.build(principals, segment.as_ref())
                    })?;
                Ok((segment_key, bitmap))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(AclFilter::new(key, segments))
    }

    /// Prebuild filters for the most recently used principal sets against
    /// a new snapshot. Returns the number of bitmaps built.
    ///
    /// Failed builds are logged and skipped; nothing is cached for them, so
    /// a later request retries and fails on its own.
    pub fn warm(&self, snapshot: &IndexSnapshot) -> usize {
        let mut built = 0;
        for principals in self.cache.recent_principals(self.settings.autowarm_count) {
            let set = principals.to_set();
            for segment in snapshot.segments() {
                let key = FilterKey::new(principals.clone(), segment.segment_key());
                if self.cache.contains(&key) {
                    continue;
                }
                match self.builder.build(&set, segment.as_ref()) {
                    Ok(bitmap) => {
                        self.cache.put(key, Arc::new(bitmap));
                        built += 1;
                    }
                    Err(e) => {
                        warn!(target: "strata::acl", principals = %principals, error = %e, "Autowarm build failed");
                    }
                }
            }
        }
        if built > 0 {
            debug!(target: "strata::acl", built, "Autowarmed filter cache");
        }
        built
    }
}

impl SearchComponent for AclComponent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn prepare(&self, request: &mut SearchRequest, snapshot: &IndexSnapshot) -> Result<()> {
        let principals = match request.param(&self.settings.principals_parameter) {
            Some(raw) => PrincipalSet::parse(raw),
            None => return Ok(()),
        };

        let filter = if principals.is_empty() {
            debug!(target: "strata::acl", "Empty principal list, denying all documents");
            AclFilter::deny_all(principals.key())
        } else {
            self.filter_for(&principals, snapshot).map_err(|e| {
                warn!(target: "strata::acl", principals = %principals.key(), error = %e, "ACL filter construction failed");
                e
            })?
        };
        request.add_filter(Arc::new(filter));
        Ok(())
    }

    fn stats(&self) -> ComponentStats {
        ComponentStats {
            name: Self::NAME.to_string(),
            description: "Restricts results to documents readable by the requesting principals"
                .to_string(),
            cache: self.cache.stats(),
        }
    }
}

impl std::fmt::Debug for AclComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclComponent")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish()
    }
}
