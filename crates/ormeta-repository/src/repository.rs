//! Entity metadata repository
//!
//! Shared, mutable store of resolved metadata keyed by identity:
//!
//! - entities by qualified type name, each behind its own [`EntityEntry`]
//! - named queries and sequence generators by global name (first wins)
//! - package- and document-level resolution modes
//! - default (persistence-unit wide) listener callbacks
//!
//! The repository is handed around as `Arc<MetadataRepository>`; there is no
//! global state. Concurrent resolution of different types only contends on
//! the map shards; resolution of one type is serialized by that entry's
//! re-entrant populate lock.

use crate::diagnostics::{DiagnosticCode, DiagnosticLog};
use crate::error::RepositoryError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ormeta_model::{
    CallbackAdapter, EntityDescriptor, LifecycleEvent, QueryDescriptor, ResolutionModes,
    SequenceDescriptor,
};
use parking_lot::{
    ReentrantMutex, ReentrantMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One entity slot
///
/// `populate` is held for a whole resolution pass of the type; `descriptor`
/// is only locked for short read/write sections inside that pass.
#[derive(Debug)]
pub struct EntityEntry {
    descriptor: RwLock<EntityDescriptor>,
    populate: ReentrantMutex<()>,
}

impl EntityEntry {
    fn new(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor: RwLock::new(descriptor),
            populate: ReentrantMutex::new(()),
        }
    }

    /// Shared view of the descriptor
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, EntityDescriptor> {
        self.descriptor.read()
    }

    /// Exclusive view of the descriptor
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, EntityDescriptor> {
        self.descriptor.write()
    }

    /// Acquire the populate lock; re-entrant on the same thread
    #[inline]
    pub fn lock_populate(&self) -> ReentrantMutexGuard<'_, ()> {
        self.populate.lock()
    }

    /// Owned copy of the current descriptor
    #[must_use]
    pub fn snapshot(&self) -> EntityDescriptor {
        self.descriptor.read().clone()
    }
}

/// Shared metadata store
#[derive(Debug, Default)]
pub struct MetadataRepository {
    entities: DashMap<String, Arc<EntityEntry>>,
    queries: DashMap<String, QueryDescriptor>,
    sequences: DashMap<String, SequenceDescriptor>,
    package_modes: DashMap<String, ResolutionModes>,
    document_modes: DashMap<String, ResolutionModes>,
    default_listeners: RwLock<Vec<String>>,
    default_callbacks: RwLock<BTreeMap<LifecycleEvent, Vec<CallbackAdapter>>>,
    diagnostics: DiagnosticLog,
}

impl MetadataRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to a fresh repository
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Diagnostics recorded so far
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    // ---- entities ----

    /// Entry for a type, if one was ever created
    #[must_use]
    pub fn entry(&self, type_name: &str) -> Option<Arc<EntityEntry>> {
        self.entities.get(type_name).map(|e| Arc::clone(e.value()))
    }

    /// Fetch or create the entry for a type
    ///
    /// Returns the entry and whether it was created by this call.
    pub fn get_or_create(&self, type_name: &str) -> (Arc<EntityEntry>, bool) {
        match self.entities.entry(type_name.to_string()) {
            Entry::Occupied(occupied) => (Arc::clone(occupied.get()), false),
            Entry::Vacant(vacant) => {
                tracing::debug!(entity = type_name, "creating entity descriptor");
                let entry = Arc::new(EntityEntry::new(EntityDescriptor::new(type_name)));
                vacant.insert(Arc::clone(&entry));
                (entry, true)
            }
        }
    }

    /// Snapshot of an entity descriptor
    #[must_use]
    pub fn entity(&self, type_name: &str) -> Option<EntityDescriptor> {
        self.entry(type_name).map(|entry| entry.snapshot())
    }

    /// Entity whose alias matches, if any
    #[must_use]
    pub fn entity_by_alias(&self, alias: &str) -> Option<EntityDescriptor> {
        self.entities
            .iter()
            .map(|e| e.value().snapshot())
            .find(|entity| entity.alias == alias)
    }

    /// Registered type names, sorted
    #[must_use]
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entities.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Modes an entity has fully resolved (`NONE` when unknown)
    #[must_use]
    pub fn resolution_modes(&self, type_name: &str) -> ResolutionModes {
        self.entry(type_name)
            .map_or(ResolutionModes::NONE, |entry| entry.read().resolution_modes)
    }

    /// Mark modes fully resolved
    ///
    /// Idempotent; returns whether the resolved set grew.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UnknownEntity`] if the type has no entry.
    pub fn mark_resolved(
        &self,
        type_name: &str,
        modes: ResolutionModes,
    ) -> Result<bool, RepositoryError> {
        let entry = self
            .entry(type_name)
            .ok_or_else(|| RepositoryError::UnknownEntity(type_name.to_string()))?;
        let changed = entry.write().mark_resolved(modes);
        if changed {
            tracing::debug!(entity = type_name, modes = %modes, "marked resolved");
        }
        Ok(changed)
    }

    // ---- queries & sequences ----

    /// Register a named query; the first registration of a name wins
    ///
    /// Returns whether the query was stored.
    pub fn register_query(&self, query: QueryDescriptor) -> bool {
        match self.queries.entry(query.name.clone()) {
            Entry::Occupied(existing) => {
                self.diagnostics.record(
                    DiagnosticCode::DuplicateQuery,
                    &query.name,
                    format!(
                        "named query '{}' from {} ignored; already defined by {}",
                        query.name,
                        query.source,
                        existing.get().source
                    ),
                );
                false
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(query = %query.name, "registered named query");
                vacant.insert(query);
                true
            }
        }
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<QueryDescriptor> {
        self.queries.get(name).map(|q| q.value().clone())
    }

    /// Every registered query, sorted by name
    #[must_use]
    pub fn queries(&self) -> Vec<QueryDescriptor> {
        let mut all: Vec<_> = self.queries.iter().map(|q| q.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Register a sequence generator; the first registration of a name wins
    ///
    /// Returns whether the sequence was stored.
    pub fn register_sequence(&self, sequence: SequenceDescriptor) -> bool {
        match self.sequences.entry(sequence.name.clone()) {
            Entry::Occupied(existing) => {
                self.diagnostics.record(
                    DiagnosticCode::DuplicateSequence,
                    &sequence.name,
                    format!(
                        "sequence generator '{}' from {} ignored; already defined by {}",
                        sequence.name,
                        sequence.source,
                        existing.get().source
                    ),
                );
                false
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(sequence = %sequence.name, "registered sequence generator");
                vacant.insert(sequence);
                true
            }
        }
    }

    #[must_use]
    pub fn sequence(&self, name: &str) -> Option<SequenceDescriptor> {
        self.sequences.get(name).map(|s| s.value().clone())
    }

    /// Every registered sequence, sorted by name
    #[must_use]
    pub fn sequences(&self) -> Vec<SequenceDescriptor> {
        let mut all: Vec<_> = self.sequences.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    // ---- packages ----

    /// Modes already applied to a package
    #[must_use]
    pub fn package_modes(&self, package: &str) -> ResolutionModes {
        self.package_modes
            .get(package)
            .map_or(ResolutionModes::NONE, |m| *m.value())
    }

    /// Atomically claim modes for a package
    ///
    /// Returns the subset of `modes` not applied before; the caller must
    /// process exactly those.
    pub fn claim_package_modes(&self, package: &str, modes: ResolutionModes) -> ResolutionModes {
        let mut current = self.package_modes.entry(package.to_string()).or_default();
        let pending = modes.difference(*current);
        *current = current.union(modes);
        pending
    }

    /// Give back modes claimed for a package whose pass failed
    pub fn release_package_modes(&self, package: &str, modes: ResolutionModes) {
        if let Some(mut current) = self.package_modes.get_mut(package) {
            *current = current.difference(modes);
        }
    }

    /// Modes already applied to a document's global elements
    #[must_use]
    pub fn document_modes(&self, document: &str) -> ResolutionModes {
        self.document_modes
            .get(document)
            .map_or(ResolutionModes::NONE, |m| *m.value())
    }

    /// Atomically claim modes for a document's global elements
    ///
    /// Same contract as [`Self::claim_package_modes`].
    pub fn claim_document_modes(&self, document: &str, modes: ResolutionModes) -> ResolutionModes {
        let mut current = self.document_modes.entry(document.to_string()).or_default();
        let pending = modes.difference(*current);
        *current = current.union(modes);
        pending
    }

    /// Give back modes claimed for a document whose global pass failed
    pub fn release_document_modes(&self, document: &str, modes: ResolutionModes) {
        if let Some(mut current) = self.document_modes.get_mut(document) {
            *current = current.difference(modes);
        }
    }

    // ---- default listeners ----

    /// Add persistence-unit default listeners, keeping first-seen order
    pub fn add_default_listeners(
        &self,
        listeners: &[String],
        callbacks: BTreeMap<LifecycleEvent, Vec<CallbackAdapter>>,
    ) {
        let mut names = self.default_listeners.write();
        let mut added = HashSet::new();
        for listener in listeners {
            if !names.contains(listener) {
                names.push(listener.clone());
                added.insert(listener.as_str());
            }
        }
        let mut registered = self.default_callbacks.write();
        for (event, adapters) in callbacks {
            let bucket = registered.entry(event).or_default();
            bucket.extend(
                adapters
                    .into_iter()
                    .filter(|cb| added.contains(cb.target_type.as_str())),
            );
        }
    }

    /// Default listener types in registration order
    #[must_use]
    pub fn default_listeners(&self) -> Vec<String> {
        self.default_listeners.read().clone()
    }

    /// Default listener callbacks for an event
    #[must_use]
    pub fn default_callbacks(&self, event: LifecycleEvent) -> Vec<CallbackAdapter> {
        self.default_callbacks
            .read()
            .get(&event)
            .cloned()
            .unwrap_or_default()
    }

    /// Full invocation list for an event on an entity
    ///
    /// The entity's own callbacks come first, then those of persistent
    /// superclasses (minus overridden methods, and minus their listeners once
    /// a type excludes superclass listeners), then default listeners unless
    /// some type in the chain excludes them.
    #[must_use]
    pub fn callbacks_for(&self, type_name: &str, event: LifecycleEvent) -> Vec<CallbackAdapter> {
        let mut out = Vec::new();
        let mut seen_methods: HashSet<(String, Vec<String>)> = HashSet::new();
        let mut visited = HashSet::new();
        let mut inherit_listeners = true;
        let mut use_defaults = true;
        let mut is_root = true;
        let mut current = self.entity(type_name);

        while let Some(entity) = current {
            if !visited.insert(entity.type_name.clone()) {
                break;
            }
            for callback in entity.lifecycle.invocation_order(event) {
                if callback.listener {
                    if !is_root && !inherit_listeners {
                        continue;
                    }
                } else if !seen_methods.insert((callback.method.clone(), callback.params.clone())) {
                    continue;
                }
                out.push(callback.clone());
            }
            inherit_listeners &= !entity.exclude_superclass_listeners;
            use_defaults &= !entity.exclude_default_listeners;
            is_root = false;
            current = entity
                .persistent_superclass
                .as_deref()
                .and_then(|parent| self.entity(parent));
        }

        if use_defaults {
            out.extend(self.default_callbacks(event));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormeta_model::{CallbackBucket, MetadataSource, QueryLanguage};
    use std::thread;

    fn query(name: &str, text: &str) -> QueryDescriptor {
        QueryDescriptor::new(name, text, QueryLanguage::Jpql, MetadataSource::Directives)
    }

    #[test]
    fn get_or_create_once() {
        let repo = MetadataRepository::new();
        let (_, created) = repo.get_or_create("Order");
        assert!(created);
        let (_, created) = repo.get_or_create("Order");
        assert!(!created);
        assert_eq!(repo.entity_names(), ["Order"]);
    }

    #[test]
    fn first_query_wins() {
        let repo = MetadataRepository::new();
        assert!(repo.register_query(query("Order.all", "first")));
        assert!(!repo.register_query(query("Order.all", "second")));
        assert_eq!(repo.query("Order.all").unwrap().query, "first");
        assert_eq!(repo.diagnostics().count(DiagnosticCode::DuplicateQuery), 1);
    }

    #[test]
    fn first_sequence_wins() {
        let repo = MetadataRepository::new();
        let mut first = SequenceDescriptor::new("seq", MetadataSource::Directives);
        first.allocation_size = 10;
        assert!(repo.register_sequence(first));
        assert!(!repo.register_sequence(SequenceDescriptor::new(
            "seq",
            MetadataSource::Document("orm.yaml".into())
        )));
        assert_eq!(repo.sequence("seq").unwrap().allocation_size, 10);
        assert_eq!(repo.diagnostics().count(DiagnosticCode::DuplicateSequence), 1);
    }

    #[test]
    fn package_modes_claimed_once() {
        let repo = MetadataRepository::new();
        assert_eq!(
            repo.claim_package_modes("shop", ResolutionModes::META),
            ResolutionModes::META
        );
        assert_eq!(
            repo.claim_package_modes("shop", ResolutionModes::META | ResolutionModes::QUERY),
            ResolutionModes::QUERY
        );
        assert!(repo.claim_package_modes("shop", ResolutionModes::ALL).contains_all(ResolutionModes::MAPPING));
        assert_eq!(repo.package_modes("shop"), ResolutionModes::ALL);
    }

    #[test]
    fn document_modes_independent_of_packages() {
        let repo = MetadataRepository::new();
        repo.claim_package_modes("orm.yaml", ResolutionModes::META);
        assert_eq!(
            repo.claim_document_modes("orm.yaml", ResolutionModes::META),
            ResolutionModes::META
        );
        assert!(repo.claim_document_modes("orm.yaml", ResolutionModes::META).is_empty());
        assert_eq!(repo.document_modes("orm.yaml"), ResolutionModes::META);
    }

    #[test]
    fn released_modes_can_be_claimed_again() {
        let repo = MetadataRepository::new();
        let pending = repo.claim_package_modes("shop", ResolutionModes::META | ResolutionModes::QUERY);
        repo.release_package_modes("shop", pending);
        assert_eq!(repo.package_modes("shop"), ResolutionModes::NONE);
        assert_eq!(repo.claim_package_modes("shop", ResolutionModes::META), ResolutionModes::META);

        repo.claim_document_modes("orm.yaml", ResolutionModes::META);
        repo.release_document_modes("orm.yaml", ResolutionModes::META);
        assert_eq!(
            repo.claim_document_modes("orm.yaml", ResolutionModes::META),
            ResolutionModes::META
        );
        // unknown names are a no-op
        repo.release_document_modes("missing.yaml", ResolutionModes::ALL);
        assert_eq!(repo.document_modes("missing.yaml"), ResolutionModes::NONE);
    }

    #[test]
    fn mark_resolved_is_idempotent() {
        let repo = MetadataRepository::new();
        assert!(repo.mark_resolved("Order", ResolutionModes::META).is_err());
        repo.get_or_create("Order");
        assert!(repo.mark_resolved("Order", ResolutionModes::META).unwrap());
        assert!(!repo.mark_resolved("Order", ResolutionModes::META).unwrap());
        assert_eq!(repo.resolution_modes("Order"), ResolutionModes::META);
    }

    #[test]
    fn populate_lock_is_reentrant() {
        let repo = MetadataRepository::new();
        let (entry, _) = repo.get_or_create("Order");
        let _outer = entry.lock_populate();
        let _inner = entry.lock_populate();
        entry.write().alias = "O".into();
        assert_eq!(entry.read().alias, "O");
    }

    #[test]
    fn concurrent_registration_keeps_one() {
        let repo = MetadataRepository::shared();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || {
                    repo.get_or_create("Order");
                    repo.register_query(query("q", &format!("select {i}")))
                })
            })
            .collect();
        let stored = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|stored| *stored)
            .count();
        assert_eq!(stored, 1);
        assert_eq!(repo.entity_names().len(), 1);
        assert_eq!(repo.diagnostics().count(DiagnosticCode::DuplicateQuery), 7);
    }

    #[test]
    fn callbacks_compose_hierarchy_and_defaults() {
        let repo = MetadataRepository::new();
        let event = LifecycleEvent::PrePersist;

        let (base, _) = repo.get_or_create("Base");
        base.write().lifecycle.set_declared(
            event,
            CallbackBucket::new(
                vec![
                    CallbackAdapter::method("Base", "Base", "touch", vec![]),
                    CallbackAdapter::method("Base", "Base", "stamp", vec![]),
                ],
                vec![CallbackAdapter::listener("BaseListener", "BaseListener", "on", vec![])],
            ),
        );
        let (order, _) = repo.get_or_create("Order");
        {
            let mut order = order.write();
            order.persistent_superclass = Some("Base".into());
            order.lifecycle.set_declared(
                event,
                CallbackBucket::new(vec![CallbackAdapter::method("Order", "Order", "touch", vec![])], vec![]),
            );
        }
        repo.add_default_listeners(
            &["Audit".to_string()],
            BTreeMap::from([(event, vec![CallbackAdapter::listener("Audit", "Audit", "audit", vec![])])]),
        );

        let names = |repo: &MetadataRepository| -> Vec<String> {
            repo.callbacks_for("Order", event)
                .into_iter()
                .map(|cb| format!("{}.{}", cb.declaring_type, cb.method))
                .collect()
        };
        assert_eq!(
            names(&repo),
            ["Order.touch", "Base.stamp", "BaseListener.on", "Audit.audit"]
        );

        {
            let mut order = order.write();
            order.exclude_superclass_listeners = true;
            order.exclude_default_listeners = true;
        }
        assert_eq!(names(&repo), ["Order.touch", "Base.stamp"]);
    }

    mod properties {
        use super::*;
        use ormeta_model::ResolutionMode;
        use proptest::prelude::*;

        fn arb_modes() -> impl Strategy<Value = ResolutionModes> {
            proptest::collection::vec(
                prop_oneof![
                    Just(ResolutionMode::Meta),
                    Just(ResolutionMode::Mapping),
                    Just(ResolutionMode::Query)
                ],
                0..3,
            )
            .prop_map(|modes| modes.into_iter().collect())
        }

        proptest! {
            #[test]
            fn prop_package_claims_partition_requests(requests in proptest::collection::vec(arb_modes(), 1..6)) {
                let repo = MetadataRepository::new();
                let mut claimed = ResolutionModes::NONE;
                let mut requested = ResolutionModes::NONE;
                for request in requests {
                    let pending = repo.claim_package_modes("shop", request);
                    prop_assert!(!pending.intersects(claimed));
                    claimed = claimed | pending;
                    requested = requested | request;
                }
                prop_assert_eq!(claimed, requested);
                prop_assert_eq!(repo.package_modes("shop"), requested);
            }
        }
    }
}
