//! The schema resolution engine
//!
//! A [`SchemaContext`] owns a cache of resolved schemas, an ordered list of
//! locaters, and an in-flight resolution table. Resolution runs a fixed
//! sequence per requested key: cache lookup, locater probe, graph build with
//! recursive reference resolution, then cache publication. Concurrent
//! asynchronous requests for equivalent keys coalesce onto one construction;
//! the synchronous path runs to completion on the calling thread and
//! converges with the asynchronous path through the cache's single mutation
//! point.
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::builder::SchemaBuilder;
use crate::cache::SchemaCache;
use crate::error::{Error, Result};
use crate::key::{SchemaKey, SchemaMatchType, SchemaVersion};
use crate::locater::SchemaLocater;
use crate::parser::{DocumentBody, JsonParser, SchemaDocument, XmlParser};
use crate::schema::Schema;

type ResolutionOutcome = std::result::Result<Option<Arc<Schema>>, Error>;
type SharedResolution = Shared<BoxFuture<'static, ResolutionOutcome>>;

type MissingReferenceHook = Box<dyn Fn(&SchemaKey) + Send + Sync>;

/// Normalized identity of one in-flight resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InFlightKey {
    name: String,
    version: SchemaVersion,
    match_type: SchemaMatchType,
}

impl InFlightKey {
    fn new(key: &SchemaKey, match_type: SchemaMatchType) -> Self {
        Self {
            name: key.name.to_ascii_lowercase(),
            version: key.version,
            match_type,
        }
    }
}

/// One claimed resolution: a detached task behind a shared future
struct Claim {
    id: u64,
    future: SharedResolution,
}

/// Claims plus the wait-for relation between them
///
/// Each resolution task awaits at most one other claim at a time, so the
/// relation is single-valued per claim and every walk terminates.
#[derive(Default)]
struct InFlightTable {
    claims: HashMap<InFlightKey, Claim>,
    // claim id -> claim id it is currently awaiting
    waiting: HashMap<u64, u64>,
}

impl InFlightTable {
    /// Whether awaiting `start` from claim `me` would close a wait loop
    fn closes_loop(&self, start: u64, me: u64) -> bool {
        let mut current = start;
        loop {
            if current == me {
                return true;
            }
            match self.waiting.get(&current) {
                Some(&next) => current = next,
                None => return false,
            }
        }
    }
}

struct ContextInner {
    cache: SchemaCache,
    locaters: RwLock<Vec<Arc<dyn SchemaLocater>>>,
    first_locater: RwLock<Option<Arc<dyn SchemaLocater>>>,
    missing_hook: RwLock<Option<MissingReferenceHook>>,
    in_flight: Mutex<InFlightTable>,
    next_claim: AtomicU64,
}

/// Owner of a locater set and a resolved-schema cache
///
/// Every context is an independent instance: two contexts never share
/// locaters, cache entries, or in-flight state. Cloning a `SchemaContext`
/// produces another handle onto the same instance; resolution tasks hold
/// such handles, so a context stays alive while work is in flight even when
/// the original caller stops awaiting.
///
/// Lifecycle: created empty, grows through [`SchemaContext::add_schema`] and
/// [`SchemaContext::get_schema`], never evicts. A failed resolution leaves
/// the cache untouched, so the same key can be retried after the caller
/// registers another locater.
#[derive(Clone)]
pub struct SchemaContext {
    inner: Arc<ContextInner>,
}

impl Default for SchemaContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cache: SchemaCache::new(),
                locaters: RwLock::new(Vec::new()),
                first_locater: RwLock::new(None),
                missing_hook: RwLock::new(None),
                in_flight: Mutex::new(InFlightTable::default()),
                next_claim: AtomicU64::new(0),
            }),
        }
    }

    /// Register a locater; locaters are probed in registration order
    pub fn add_locater(&self, locater: Arc<dyn SchemaLocater>) {
        self.inner.locaters.write().unwrap().push(locater);
    }

    /// Set the locater consulted before every registered locater
    pub fn set_first_locater(&self, locater: Arc<dyn SchemaLocater>) {
        *self.inner.first_locater.write().unwrap() = Some(locater);
    }

    /// Register a callback invoked once per reference no locater can satisfy
    ///
    /// The hook is diagnostic only; the resolution still fails with
    /// [`Error::ReferencedSchemaNotFound`] after the hook returns.
    pub fn set_missing_reference_hook(&self, hook: impl Fn(&SchemaKey) + Send + Sync + 'static) {
        *self.inner.missing_hook.write().unwrap() = Some(Box::new(hook));
    }

    /// Number of schemas currently cached
    pub fn schema_count(&self) -> usize {
        self.inner.cache.len()
    }

    /// Keys of every cached schema, ordered by name and version
    pub fn cached_keys(&self) -> Vec<SchemaKey> {
        self.inner.cache.keys()
    }

    /// Publish a programmatically built schema
    ///
    /// Pending references are resolved synchronously through the context's
    /// locaters, item links are verified, and the schema is cached. An
    /// identical key already held fails with [`Error::DuplicateSchema`].
    pub fn add_schema(&self, mut schema: Schema) -> Result<Arc<Schema>> {
        let own_key = schema.key().clone();
        let mut chain = vec![own_key.clone()];
        let pending: Vec<SchemaKey> = schema
            .references()
            .iter()
            .filter(|r| r.schema.is_none())
            .map(|r| r.key.clone())
            .collect();
        for ref_key in pending {
            match self.resolve_sync_inner(
                &ref_key,
                SchemaMatchType::LatestWriteCompatible,
                &mut chain,
            )? {
                Some(dep) => schema.attach_reference(&ref_key.name, dep)?,
                None => {
                    self.report_missing(&ref_key);
                    return Err(Error::ReferencedSchemaNotFound {
                        key: ref_key,
                        referenced_by: own_key,
                    });
                }
            }
        }
        schema.link()?;
        let published = Arc::new(schema);
        self.inner.cache.insert(Arc::clone(&published))?;
        Ok(published)
    }

    /// Parse, resolve, and cache a schema from canonical JSON text
    pub fn schema_from_json(&self, text: &str) -> Result<Arc<Schema>> {
        let schema = SchemaBuilder::build(&JsonParser::new(text)?)?;
        self.complete_sync(schema, &mut Vec::new())
    }

    /// Parse, resolve, and cache a schema from ECXML text
    pub fn schema_from_xml(&self, text: &str) -> Result<Arc<Schema>> {
        let schema = SchemaBuilder::build(&XmlParser::new(text)?)?;
        self.complete_sync(schema, &mut Vec::new())
    }

    /// Resolve a schema asynchronously
    ///
    /// `Ok(None)` means no locater could find the schema; `Err` means a
    /// document was found but is invalid. Concurrent calls for equivalent
    /// keys coalesce onto a single construction backed by a detached task,
    /// so abandoning a call never cancels work already started, and late
    /// callers observe the same completed resolution.
    pub async fn get_schema(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Result<Option<Arc<Schema>>> {
        self.resolve_future(key.clone(), match_type, None, Vec::new())
            .await
    }

    /// Resolve a schema synchronously, blocking on locater I/O
    ///
    /// Applies the same state machine as [`SchemaContext::get_schema`] but
    /// runs to completion on the calling thread and never touches the
    /// asynchronous in-flight table; the two paths converge through the
    /// cache, whose first insert per key wins.
    pub fn get_schema_sync(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
    ) -> Result<Option<Arc<Schema>>> {
        self.resolve_sync_inner(key, match_type, &mut Vec::new())
    }

    /// The asynchronous resolution state machine, boxed for recursion
    ///
    /// `waiting_from` carries the claim id of the resolution task requesting
    /// a dependency, so awaiting another task's claim can be refused when it
    /// would close a wait loop.
    fn resolve_future(
        &self,
        key: SchemaKey,
        match_type: SchemaMatchType,
        waiting_from: Option<u64>,
        chain: Vec<SchemaKey>,
    ) -> BoxFuture<'static, ResolutionOutcome> {
        let ctx = self.clone();
        async move {
            if let Some(hit) = ctx.inner.cache.get(&key, match_type) {
                return Ok(Some(hit));
            }

            let flight_key = InFlightKey::new(&key, match_type);
            let shared = {
                let mut table = ctx.inner.in_flight.lock().unwrap();
                match table.claims.get(&flight_key) {
                    Some(claim) => {
                        let (claim_id, shared) = (claim.id, claim.future.clone());
                        if let Some(from) = waiting_from {
                            if table.closes_loop(claim_id, from) {
                                let mut loop_chain = chain;
                                loop_chain.push(key);
                                return Err(Error::reference_cycle(&loop_chain));
                            }
                            table.waiting.insert(from, claim_id);
                        }
                        shared
                    }
                    None => {
                        let id = ctx.inner.next_claim.fetch_add(1, Ordering::Relaxed);
                        let task_ctx = ctx.clone();
                        let task_key = key.clone();
                        let task_flight = flight_key.clone();
                        let handle = tokio::spawn(async move {
                            let outcome =
                                task_ctx.build_graph(task_key, match_type, id, chain).await;
                            task_ctx.release_claim(&task_flight, id);
                            outcome
                        });
                        let shared = async move {
                            match handle.await {
                                Ok(outcome) => outcome,
                                Err(join) => Err(Error::Internal {
                                    message: "schema resolution task failed".to_string(),
                                    source: anyhow::anyhow!(join),
                                }),
                            }
                        }
                        .boxed()
                        .shared();
                        table.claims.insert(
                            flight_key,
                            Claim {
                                id,
                                future: shared.clone(),
                            },
                        );
                        if let Some(from) = waiting_from {
                            table.waiting.insert(from, id);
                        }
                        shared
                    }
                }
            };

            let outcome = shared.await;
            if let Some(from) = waiting_from {
                ctx.inner.in_flight.lock().unwrap().waiting.remove(&from);
            }
            outcome
        }
        .boxed()
    }

    /// Probe, parse, resolve references, link, and publish — the body of
    /// one claimed resolution task
    async fn build_graph(
        &self,
        key: SchemaKey,
        match_type: SchemaMatchType,
        claim_id: u64,
        chain: Vec<SchemaKey>,
    ) -> ResolutionOutcome {
        // A racing task may have published while this claim was queued.
        if let Some(hit) = self.inner.cache.get(&key, match_type) {
            return Ok(Some(hit));
        }
        let Some(document) = self.probe(&key, match_type).await else {
            debug!(schema = %key, "no locater produced a document");
            return Ok(None);
        };
        let mut schema = Self::parse_document(&document)?;
        if !key.matches(schema.key(), match_type) {
            return Err(Error::schema_read(
                &schema.key().name,
                format!(
                    "located document is '{}', which does not satisfy the request for '{}'",
                    schema.key(),
                    key
                ),
            ));
        }
        let own_key = schema.key().clone();
        if chain.iter().any(|k| k.compare_by_name(&own_key.name)) {
            let mut loop_chain = chain;
            loop_chain.push(own_key);
            return Err(Error::reference_cycle(&loop_chain));
        }
        let mut dep_chain = chain;
        dep_chain.push(own_key.clone());

        let reference_keys: Vec<SchemaKey> =
            schema.references().iter().map(|r| r.key.clone()).collect();
        for ref_key in reference_keys {
            let resolved = self
                .resolve_future(
                    ref_key.clone(),
                    SchemaMatchType::LatestWriteCompatible,
                    Some(claim_id),
                    dep_chain.clone(),
                )
                .await?;
            match resolved {
                Some(dep) => schema.attach_reference(&ref_key.name, dep)?,
                None => {
                    self.report_missing(&ref_key);
                    return Err(Error::ReferencedSchemaNotFound {
                        key: ref_key,
                        referenced_by: own_key,
                    });
                }
            }
        }
        schema.link()?;
        let published = self.inner.cache.insert_or_get(Arc::new(schema));
        debug!(schema = %published.key(), "resolved schema");
        Ok(Some(published))
    }

    /// The synchronous resolution state machine
    ///
    /// `chain` holds the keys currently being resolved on this call stack;
    /// revisiting a name in the chain is a reference cycle.
    fn resolve_sync_inner(
        &self,
        key: &SchemaKey,
        match_type: SchemaMatchType,
        chain: &mut Vec<SchemaKey>,
    ) -> Result<Option<Arc<Schema>>> {
        if let Some(hit) = self.inner.cache.get(key, match_type) {
            return Ok(Some(hit));
        }
        if chain.iter().any(|k| k.compare_by_name(&key.name)) {
            let mut loop_chain = chain.clone();
            loop_chain.push(key.clone());
            return Err(Error::reference_cycle(&loop_chain));
        }
        let Some(document) = self.probe_sync(key, match_type) else {
            debug!(schema = %key, "no locater produced a document");
            return Ok(None);
        };
        let schema = Self::parse_document(&document)?;
        if !key.matches(schema.key(), match_type) {
            return Err(Error::schema_read(
                &schema.key().name,
                format!(
                    "located document is '{}', which does not satisfy the request for '{}'",
                    schema.key(),
                    key
                ),
            ));
        }
        Ok(Some(self.complete_sync(schema, chain)?))
    }

    /// Resolve references, link, and publish a freshly built schema
    fn complete_sync(&self, mut schema: Schema, chain: &mut Vec<SchemaKey>) -> Result<Arc<Schema>> {
        let own_key = schema.key().clone();
        chain.push(own_key.clone());
        let reference_keys: Vec<SchemaKey> =
            schema.references().iter().map(|r| r.key.clone()).collect();
        for ref_key in reference_keys {
            match self.resolve_sync_inner(
                &ref_key,
                SchemaMatchType::LatestWriteCompatible,
                chain,
            )? {
                Some(dep) => schema.attach_reference(&ref_key.name, dep)?,
                None => {
                    self.report_missing(&ref_key);
                    return Err(Error::ReferencedSchemaNotFound {
                        key: ref_key,
                        referenced_by: own_key,
                    });
                }
            }
        }
        chain.pop();
        schema.link()?;
        let published = self.inner.cache.insert_or_get(Arc::new(schema));
        debug!(schema = %published.key(), "resolved schema");
        Ok(published)
    }

    async fn probe(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        let (first, locaters) = self.locater_snapshot();
        if let Some(first) = first {
            trace!(schema = %key, locater = first.name(), "probing first locater");
            if let Some(document) = first.locate(key, match_type).await {
                debug!(schema = %key, locater = first.name(), "located schema document");
                return Some(document);
            }
        }
        for locater in locaters {
            trace!(schema = %key, locater = locater.name(), "probing locater");
            if let Some(document) = locater.locate(key, match_type).await {
                debug!(schema = %key, locater = locater.name(), "located schema document");
                return Some(document);
            }
        }
        None
    }

    fn probe_sync(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
        let (first, locaters) = self.locater_snapshot();
        if let Some(first) = first {
            trace!(schema = %key, locater = first.name(), "probing first locater");
            if let Some(document) = first.locate_sync(key, match_type) {
                debug!(schema = %key, locater = first.name(), "located schema document");
                return Some(document);
            }
        }
        for locater in locaters {
            trace!(schema = %key, locater = locater.name(), "probing locater");
            if let Some(document) = locater.locate_sync(key, match_type) {
                debug!(schema = %key, locater = locater.name(), "located schema document");
                return Some(document);
            }
        }
        None
    }

    // Guards are released before any await point; locaters may be
    // registered while resolutions are in flight.
    fn locater_snapshot(
        &self,
    ) -> (
        Option<Arc<dyn SchemaLocater>>,
        Vec<Arc<dyn SchemaLocater>>,
    ) {
        let first = self.inner.first_locater.read().unwrap().clone();
        let locaters = self.inner.locaters.read().unwrap().clone();
        (first, locaters)
    }

    fn parse_document(document: &SchemaDocument) -> Result<Schema> {
        match &document.body {
            DocumentBody::Json(text) => SchemaBuilder::build(&JsonParser::new(text)?),
            DocumentBody::Xml(text) => SchemaBuilder::build(&XmlParser::new(text)?),
        }
    }

    fn report_missing(&self, key: &SchemaKey) {
        warn!(schema = %key, "referenced schema could not be located");
        if let Some(hook) = self.inner.missing_hook.read().unwrap().as_ref() {
            hook(key);
        }
    }

    fn release_claim(&self, flight_key: &InFlightKey, id: u64) {
        let mut table = self.inner.in_flight.lock().unwrap();
        if table.claims.get(flight_key).is_some_and(|c| c.id == id) {
            table.claims.remove(flight_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::parser::json::ECSCHEMA_JSON_URL;

    /// Locater over an in-test document set, counting probes
    struct MapLocater {
        label: String,
        documents: Vec<(SchemaKey, String)>,
        probes: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MapLocater {
        fn new(documents: Vec<(SchemaKey, String)>) -> Self {
            Self {
                label: "map".to_string(),
                documents,
                probes: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn probes(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }

        fn pick(&self, key: &SchemaKey, match_type: SchemaMatchType) -> Option<SchemaDocument> {
            self.documents
                .iter()
                .filter(|(held, _)| key.matches(held, match_type))
                .max_by_key(|(held, _)| held.version)
                .map(|(_, text)| SchemaDocument::json(text.clone()))
        }
    }

    #[async_trait]
    impl SchemaLocater for MapLocater {
        async fn locate(
            &self,
            key: &SchemaKey,
            match_type: SchemaMatchType,
        ) -> Option<SchemaDocument> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.pick(key, match_type)
        }

        fn locate_sync(
            &self,
            key: &SchemaKey,
            match_type: SchemaMatchType,
        ) -> Option<SchemaDocument> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.pick(key, match_type)
        }

        fn name(&self) -> &str {
            &self.label
        }
    }

    fn doc(name: &str, version: &str, references: &[(&str, &str)]) -> String {
        let mut root = json!({
            "$schema": ECSCHEMA_JSON_URL,
            "name": name,
            "version": version,
            "items": {
                "Widget": { "schemaItemType": "EntityClass" }
            }
        });
        if !references.is_empty() {
            root["references"] = json!(references
                .iter()
                .map(|(name, version)| json!({ "name": name, "version": version }))
                .collect::<Vec<_>>());
        }
        root.to_string()
    }

    fn entry(name: &str, version: &str, references: &[(&str, &str)]) -> (SchemaKey, String) {
        let key = SchemaKey::new(name, SchemaVersion::parse(version).unwrap());
        (key, doc(name, version, references))
    }

    fn key(name: &str, version: &str) -> SchemaKey {
        SchemaKey::new(name, SchemaVersion::parse(version).unwrap())
    }

    #[tokio::test]
    async fn test_latest_and_exact_selection() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![
            entry("Foo", "1.0.0", &[]),
            entry("Foo", "1.2.0", &[]),
        ])));

        let latest = context
            .get_schema(&key("Foo", "1.0.0"), SchemaMatchType::Latest)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.version(), SchemaVersion::new(1, 2, 0));

        let exact = context
            .get_schema(&key("Foo", "1.0.0"), SchemaMatchType::Exact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exact.version(), SchemaVersion::new(1, 0, 0));
    }

    #[tokio::test]
    async fn test_repeated_requests_return_the_cached_instance() {
        let context = SchemaContext::new();
        let locater = Arc::new(MapLocater::new(vec![entry("Foo", "1.0.0", &[])]));
        context.add_locater(Arc::clone(&locater) as Arc<dyn SchemaLocater>);

        let request = key("Foo", "1.0.0");
        let first = context
            .get_schema(&request, SchemaMatchType::Exact)
            .await
            .unwrap()
            .unwrap();
        let second = context
            .get_schema(&request, SchemaMatchType::Exact)
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(locater.probes(), 1);
    }

    #[tokio::test]
    async fn test_references_resolve_transitively() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![
            entry("App", "1.0.0", &[("Mid", "1.0.0")]),
            entry("Mid", "1.0.0", &[("Base", "1.0.0")]),
            entry("Base", "1.0.0", &[]),
        ])));

        let app = context
            .get_schema(&key("App", "1.0.0"), SchemaMatchType::Exact)
            .await
            .unwrap()
            .unwrap();
        assert!(app.reference_schema("Mid").is_some());
        assert_eq!(context.schema_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_reference_fires_hook_and_allows_retry() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![entry(
            "App",
            "1.0.0",
            &[("Base", "1.0.0")],
        )])));
        let reported: Arc<Mutex<Vec<SchemaKey>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        context.set_missing_reference_hook(move |missing| {
            sink.lock().unwrap().push(missing.clone());
        });

        let request = key("App", "1.0.0");
        let err = context
            .get_schema(&request, SchemaMatchType::Exact)
            .await
            .unwrap_err();
        match err {
            Error::ReferencedSchemaNotFound { key, referenced_by } => {
                assert!(key.compare_by_name("Base"));
                assert!(referenced_by.compare_by_name("App"));
            }
            other => panic!("expected ReferencedSchemaNotFound, got {other}"),
        }
        assert_eq!(reported.lock().unwrap().len(), 1);
        assert!(reported.lock().unwrap()[0].compare_by_name("Base"));
        // Failure never poisons the cache.
        assert_eq!(context.schema_count(), 0);

        context.add_locater(Arc::new(MapLocater::new(vec![entry("Base", "1.0.0", &[])])));
        let retried = context
            .get_schema(&request, SchemaMatchType::Exact)
            .await
            .unwrap();
        assert!(retried.is_some());
        assert_eq!(context.schema_count(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_ok_none() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(Vec::new())));
        let resolved = context
            .get_schema(&key("Nowhere", "1.0.0"), SchemaMatchType::Latest)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_first_locater_wins_over_registered() {
        let context = SchemaContext::new();
        let registered = json!({
            "$schema": ECSCHEMA_JSON_URL,
            "name": "Foo",
            "version": "01.00.00",
            "label": "from registered"
        })
        .to_string();
        let first = json!({
            "$schema": ECSCHEMA_JSON_URL,
            "name": "Foo",
            "version": "01.00.00",
            "label": "from first"
        })
        .to_string();
        context.add_locater(Arc::new(MapLocater::new(vec![(
            key("Foo", "1.0.0"),
            registered,
        )])));
        context.set_first_locater(Arc::new(MapLocater::new(vec![(
            key("Foo", "1.0.0"),
            first,
        )])));

        let schema = context
            .get_schema(&key("Foo", "1.0.0"), SchemaMatchType::Exact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schema.label.as_deref(), Some("from first"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce_to_one_probe() {
        let context = SchemaContext::new();
        let locater = Arc::new(
            MapLocater::new(vec![entry("Foo", "1.0.0", &[])])
                .with_delay(Duration::from_millis(20)),
        );
        context.add_locater(Arc::clone(&locater) as Arc<dyn SchemaLocater>);

        let request = key("Foo", "1.0.0");
        let calls = (0..8).map(|_| {
            let context = context.clone();
            let request = request.clone();
            async move { context.get_schema(&request, SchemaMatchType::Exact).await }
        });
        let outcomes = futures::future::join_all(calls).await;

        let mut instances = Vec::new();
        for outcome in outcomes {
            instances.push(outcome.unwrap().unwrap());
        }
        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }
        assert_eq!(locater.probes(), 1);
    }

    #[tokio::test]
    async fn test_sync_and_async_paths_converge() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![
            entry("App", "1.0.0", &[("Base", "1.0.0")]),
            entry("Base", "1.0.0", &[]),
        ])));

        let request = key("App", "1.0.0");
        let from_sync = context
            .get_schema_sync(&request, SchemaMatchType::Exact)
            .unwrap()
            .unwrap();
        let from_async = context
            .get_schema(&request, SchemaMatchType::Exact)
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&from_sync, &from_async));
        assert_eq!(from_sync.to_json(), from_async.to_json());
    }

    #[tokio::test]
    async fn test_reference_cycle_is_detected_async() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![
            entry("A", "1.0.0", &[("B", "1.0.0")]),
            entry("B", "1.0.0", &[("A", "1.0.0")]),
        ])));

        let err = context
            .get_schema(&key("A", "1.0.0"), SchemaMatchType::Exact)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle { .. }), "got {err}");
        assert_eq!(context.schema_count(), 0);
    }

    #[test]
    fn test_reference_cycle_is_detected_sync() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![
            entry("A", "1.0.0", &[("B", "1.0.0")]),
            entry("B", "1.0.0", &[("A", "1.0.0")]),
        ])));

        let err = context
            .get_schema_sync(&key("A", "1.0.0"), SchemaMatchType::Exact)
            .unwrap_err();
        match err {
            Error::ReferenceCycle { chain } => {
                assert!(chain.contains("A.01.00.00"), "chain was {chain}");
                assert!(chain.contains("B.01.00.00"), "chain was {chain}");
            }
            other => panic!("expected ReferenceCycle, got {other}"),
        }
    }

    #[test]
    fn test_contexts_are_isolated() {
        let populated = SchemaContext::new();
        populated.add_locater(Arc::new(MapLocater::new(vec![entry("Foo", "1.0.0", &[])])));
        populated
            .get_schema_sync(&key("Foo", "1.0.0"), SchemaMatchType::Exact)
            .unwrap()
            .unwrap();
        assert_eq!(populated.schema_count(), 1);

        let empty = SchemaContext::new();
        assert_eq!(empty.schema_count(), 0);
        let resolved = empty
            .get_schema_sync(&key("Foo", "1.0.0"), SchemaMatchType::Exact)
            .unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_schema_from_json_publishes_and_caches() {
        let context = SchemaContext::new();
        let first = context.schema_from_json(&doc("Plant", "1.0.0", &[])).unwrap();
        assert_eq!(context.schema_count(), 1);

        let again = context
            .get_schema_sync(&key("Plant", "1.0.0"), SchemaMatchType::Identical)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_add_schema_rejects_identical_duplicate() {
        let context = SchemaContext::new();
        let plant = Schema::new(key("Plant", "1.0.0"));
        context.add_schema(plant).unwrap();
        let err = context.add_schema(Schema::new(key("plant", "1.0.0"))).unwrap_err();
        assert!(matches!(err, Error::DuplicateSchema { .. }));
    }

    #[test]
    fn test_malformed_document_is_an_error_not_a_miss() {
        let context = SchemaContext::new();
        context.add_locater(Arc::new(MapLocater::new(vec![(
            key("Bad", "1.0.0"),
            "{ not json".to_string(),
        )])));
        let err = context
            .get_schema_sync(&key("Bad", "1.0.0"), SchemaMatchType::Exact)
            .unwrap_err();
        assert!(matches!(err, Error::SchemaRead { .. }));
        assert_eq!(context.schema_count(), 0);
    }
}
