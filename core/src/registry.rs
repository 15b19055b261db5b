use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::describe::SchemaDescriber;
use crate::error::Result;
use crate::manager::{EntityFactory, GenericEntityFactory, TableHandle, TableMeta};

/// Process-wide table descriptor cache.
///
/// One descriptor is built per table name; later requests return the
/// identical cached handle until it is explicitly invalidated. The cache
/// lock is held across a build, so concurrent requests for the same
/// uncached table are serialized and observe a single introspection.
///
/// Constructed explicitly and passed by reference to consumers; there is
/// deliberately no global instance.
pub struct MetaRegistry {
    describer: Arc<dyn SchemaDescriber>,
    factory: Arc<dyn EntityFactory>,
    cache: Mutex<BTreeMap<String, Arc<dyn TableHandle>>>,
}

impl MetaRegistry {
    pub fn new(describer: Arc<dyn SchemaDescriber>) -> Self {
        Self::with_factory(describer, Arc::new(GenericEntityFactory))
    }

    pub fn with_factory(describer: Arc<dyn SchemaDescriber>, factory: Arc<dyn EntityFactory>) -> Self {
        MetaRegistry {
            describer,
            factory,
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// Fetch the descriptor of `table`, introspecting and building it on
    /// first request. Idempotent until [`reset`](Self::reset) or
    /// [`reinit`](Self::reinit).
    pub async fn init(&self, table: &str) -> Result<Arc<dyn TableHandle>> {
        self.init_with(TableMeta::new(table)).await
    }

    /// Like [`init`](Self::init), with caller-accumulated field
    /// definitions. First build wins: when the table is already cached the
    /// supplied definitions are ignored and the cached handle returned.
    pub async fn init_with(&self, mut meta: TableMeta) -> Result<Arc<dyn TableHandle>> {
        let mut cache = self.cache.lock().await;
        if let Some(handle) = cache.get(meta.table_name()) {
            log::debug!("descriptor cache hit for table `{}`", meta.table_name());
            return Ok(handle.clone());
        }

        let handle = meta
            .build(self.describer.as_ref(), self.factory.as_ref())
            .await?;
        log::debug!("built descriptor for table `{}`", meta.table_name());
        cache.insert(meta.table_name().to_string(), handle.clone());
        Ok(handle)
    }

    /// Drop any cached descriptor of `table`, then build it fresh. A failed
    /// rebuild leaves the table uncached; the removed entry is never
    /// restored.
    pub async fn reinit(&self, table: &str) -> Result<Arc<dyn TableHandle>> {
        self.reinit_with(TableMeta::new(table)).await
    }

    /// [`reinit`](Self::reinit) with caller-accumulated field definitions.
    pub async fn reinit_with(&self, meta: TableMeta) -> Result<Arc<dyn TableHandle>> {
        self.reset(meta.table_name()).await;
        self.init_with(meta).await
    }

    /// Drop the cached descriptor of `table` without rebuilding. No-op when
    /// the table is not cached.
    pub async fn reset(&self, table: &str) {
        self.cache.lock().await.remove(table);
    }

    pub async fn contains(&self, table: &str) -> bool {
        self.cache.lock().await.contains_key(table)
    }
}
