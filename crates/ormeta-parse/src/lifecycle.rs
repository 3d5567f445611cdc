//! Lifecycle callback merger
//!
//! Collects callback methods from a type hierarchy or an external listener
//! type, orders them and validates the one-method-per-event rule. Used by both
//! parsers; the document parser additionally builds single adapters from
//! `callbacks` maps.
//!
//! Ordering within one collection:
//! 1. declaring type, most specific first (unrelated types lexically)
//! 2. method name
//! 3. declaration index

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use ormeta_model::{
    CallbackAdapter, CallbackBucket, DirectiveKind, LifecycleDescriptor, LifecycleEvent,
    MethodDecl, TypeDecl, TypeIntrospector,
};
use ormeta_repository::{DiagnosticCode, DiagnosticLog};
use std::collections::{BTreeMap, HashSet};

/// Callbacks per event, in invocation order
pub type CallbackSet = BTreeMap<LifecycleEvent, Vec<CallbackAdapter>>;

/// Which part of a hierarchy a collection walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk<'a> {
    /// Only the named type
    TypeOnly,
    /// The named type and every declared supertype
    Hierarchy,
    /// Supertypes of the named type up to the first persistent one
    ///
    /// The optional name marks a supertype known to be persistent even
    /// without a root directive (declared by a document).
    NonPersistentSupertypes(Option<&'a str>),
}

struct Candidate<'d> {
    rank: usize,
    declaring: &'d TypeDecl,
    method: &'d MethodDecl,
    index: usize,
    event: LifecycleEvent,
}

/// Lifecycle callback collector
pub struct CallbackMerger<'a> {
    types: &'a dyn TypeIntrospector,
    config: &'a ResolverConfig,
    diagnostics: &'a DiagnosticLog,
}

impl<'a> CallbackMerger<'a> {
    #[must_use]
    pub fn new(
        types: &'a dyn TypeIntrospector,
        config: &'a ResolverConfig,
        diagnostics: &'a DiagnosticLog,
    ) -> Self {
        Self {
            types,
            config,
            diagnostics,
        }
    }

    /// Collect callbacks declared on `type_name` for `entity`
    ///
    /// Methods whose signature appears in `existing`, or on a more specific
    /// type of the walk, are skipped. With `listener` set the adapters target
    /// the listener type instead of the entity.
    ///
    /// # Errors
    ///
    /// [`ResolveError::UnknownType`] when `type_name` is not declared, and
    /// [`ResolveError::MultipleCallbacks`] when one declaring type has several
    /// methods for an event and the configuration does not allow it.
    pub fn collect_callbacks(
        &self,
        entity: &str,
        type_name: &str,
        existing: &CallbackSet,
        walk: Walk<'_>,
        listener: bool,
    ) -> Result<CallbackSet, ResolveError> {
        let decl = self
            .types
            .type_decl(type_name)
            .ok_or_else(|| ResolveError::UnknownType(type_name.to_string()))?;

        let mut seen: HashSet<(&str, &[String])> = existing
            .values()
            .flatten()
            .filter(|cb| !cb.listener)
            .map(CallbackAdapter::signature)
            .collect();

        let chain = self.chain(decl, walk);
        let mut candidates = Vec::new();
        for (rank, &(declaring, collect)) in chain.iter().enumerate() {
            // a subtype's method shadows every supertype method of that shape
            let mut own = Vec::new();
            for (index, method) in declaring.methods.iter().enumerate() {
                let signature = (method.name.as_str(), method.params.as_slice());
                if seen.contains(&signature) {
                    continue;
                }
                own.push(signature);
                if !collect {
                    continue;
                }
                for event in callback_events(method) {
                    candidates.push(Candidate {
                        rank,
                        declaring,
                        method,
                        index,
                        event,
                    });
                }
            }
            seen.extend(own);
        }

        candidates.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.declaring.name.cmp(&b.declaring.name))
                .then_with(|| a.method.name.cmp(&b.method.name))
                .then_with(|| a.index.cmp(&b.index))
        });

        self.check_multiplicity(entity, &candidates)?;

        let mut out = CallbackSet::new();
        for candidate in candidates {
            let params = candidate.method.params.clone();
            let adapter = if listener {
                CallbackAdapter::listener(type_name, &candidate.declaring.name, &candidate.method.name, params)
            } else {
                CallbackAdapter::method(entity, &candidate.declaring.name, &candidate.method.name, params)
            };
            out.entry(candidate.event).or_default().push(adapter);
        }
        Ok(out)
    }

    /// Full lifecycle of an entity from its in-code declarations
    ///
    /// The declared bucket holds the entity's own methods followed by the
    /// callbacks of each listener type in order; the superclass bucket holds
    /// methods inherited from non-persistent supertypes.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::collect_callbacks`] failures.
    pub fn entity_lifecycle(
        &self,
        entity: &str,
        listeners: &[String],
        persistent_superclass: Option<&str>,
    ) -> Result<LifecycleDescriptor, ResolveError> {
        let none = CallbackSet::new();
        let own = self.collect_callbacks(entity, entity, &none, Walk::TypeOnly, false)?;
        let mut from_listeners = self.listener_callbacks(entity, listeners)?;
        let inherited = self.collect_callbacks(
            entity,
            entity,
            &own,
            Walk::NonPersistentSupertypes(persistent_superclass),
            false,
        )?;

        let mut lifecycle = LifecycleDescriptor::default();
        for event in LifecycleEvent::ALL {
            lifecycle.set_declared(
                event,
                CallbackBucket::new(
                    own.get(&event).cloned().unwrap_or_default(),
                    from_listeners.remove(&event).unwrap_or_default(),
                ),
            );
            lifecycle.set_superclass(
                event,
                CallbackBucket::new(inherited.get(&event).cloned().unwrap_or_default(), Vec::new()),
            );
        }
        Ok(lifecycle)
    }

    /// Callbacks of every listener type, concatenated in order
    ///
    /// # Errors
    ///
    /// Propagates [`Self::collect_callbacks`] failures.
    pub fn listener_callbacks(&self, entity: &str, listeners: &[String]) -> Result<CallbackSet, ResolveError> {
        let none = CallbackSet::new();
        let mut out = CallbackSet::new();
        for listener in listeners {
            for (event, adapters) in self.collect_callbacks(entity, listener, &none, Walk::Hierarchy, true)? {
                out.entry(event).or_default().extend(adapters);
            }
        }
        Ok(out)
    }

    /// Adapter for a named method of `type_name` or one of its supertypes
    ///
    /// # Errors
    ///
    /// [`ResolveError::UnknownType`] or [`ResolveError::UnknownMethod`].
    pub fn named_callback(
        &self,
        entity: &str,
        type_name: &str,
        method: &str,
        listener: bool,
    ) -> Result<CallbackAdapter, ResolveError> {
        let decl = self
            .types
            .type_decl(type_name)
            .ok_or_else(|| ResolveError::UnknownType(type_name.to_string()))?;
        let (declaring, found) = std::iter::once(decl)
            .chain(self.types.supertypes(type_name))
            .find_map(|d| d.methods.iter().find(|m| m.name == method).map(|m| (d, m)))
            .ok_or_else(|| ResolveError::UnknownMethod {
                type_name: type_name.to_string(),
                method: method.to_string(),
            })?;
        let params = found.params.clone();
        Ok(if listener {
            CallbackAdapter::listener(type_name, &declaring.name, method, params)
        } else {
            CallbackAdapter::method(entity, &declaring.name, method, params)
        })
    }

    fn chain<'d>(&self, decl: &'d TypeDecl, walk: Walk<'_>) -> Vec<(&'d TypeDecl, bool)>
    where
        'a: 'd,
    {
        // the named type only shadows when its supertypes are walked for it
        let mut chain = vec![(decl, !matches!(walk, Walk::NonPersistentSupertypes(_)))];
        match walk {
            Walk::TypeOnly => {}
            Walk::Hierarchy => chain.extend(self.types.supertypes(&decl.name).into_iter().map(|d| (d, true))),
            Walk::NonPersistentSupertypes(stop) => {
                for sup in self.types.supertypes(&decl.name) {
                    if sup.has_directive("entity")
                        || sup.has_directive("mapped-superclass")
                        || Some(sup.name.as_str()) == stop
                    {
                        break;
                    }
                    chain.push((sup, true));
                }
            }
        }
        chain
    }

    fn check_multiplicity(&self, entity: &str, candidates: &[Candidate<'_>]) -> Result<(), ResolveError> {
        let mut per_type: BTreeMap<(LifecycleEvent, &str), Vec<String>> = BTreeMap::new();
        for candidate in candidates {
            per_type
                .entry((candidate.event, candidate.declaring.name.as_str()))
                .or_default()
                .push(candidate.method.name.clone());
        }
        for ((event, declaring_type), methods) in per_type {
            if methods.len() < 2 {
                continue;
            }
            if !self.config.allow_multiple_callbacks_per_event {
                return Err(ResolveError::MultipleCallbacks {
                    entity: entity.to_string(),
                    event,
                    declaring_type: declaring_type.to_string(),
                    methods,
                });
            }
            self.diagnostics.record(
                DiagnosticCode::MultipleCallbacks,
                entity,
                format!(
                    "{} methods handle '{event}' on '{declaring_type}': {}",
                    methods.len(),
                    methods.join(", ")
                ),
            );
        }
        Ok(())
    }
}

/// Lifecycle events a method is tagged with
fn callback_events(method: &MethodDecl) -> impl Iterator<Item = LifecycleEvent> + '_ {
    method
        .directives
        .iter()
        .filter_map(|tag| match DirectiveKind::from_name(&tag.name) {
            Some(DirectiveKind::Lifecycle(event)) => Some(event),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormeta_model::{DeclarationTable, DirectiveTag};

    fn callback(name: &str, event: &str) -> MethodDecl {
        MethodDecl::new(name).with_directive(DirectiveTag::new(event))
    }

    fn table() -> DeclarationTable {
        DeclarationTable::new()
            .with_type(
                TypeDecl::new("shop.Base")
                    .with_method(callback("audit", "pre-persist"))
                    .with_method(callback("stamp", "pre-update")),
            )
            .unwrap()
            .with_type(
                TypeDecl::new("shop.Order")
                    .with_supertype("shop.Base")
                    .with_directive(DirectiveTag::new("entity"))
                    .with_method(callback("audit", "pre-persist"))
                    .with_method(callback("loaded", "post-load")),
            )
            .unwrap()
            .with_type(
                TypeDecl::new("shop.AuditListener")
                    .with_method(callback("before", "pre-persist").with_params(["shop.Order"])),
            )
            .unwrap()
            .with_type(
                TypeDecl::new("shop.Greedy")
                    .with_method(callback("b", "pre-persist"))
                    .with_method(callback("a", "pre-persist")),
            )
            .unwrap()
    }

    fn names(callbacks: &[CallbackAdapter]) -> Vec<String> {
        callbacks.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn overridden_method_collected_once_from_subtype() {
        let table = table();
        let config = ResolverConfig::default();
        let log = DiagnosticLog::new();
        let merger = CallbackMerger::new(&table, &config, &log);
        let set = merger
            .collect_callbacks("shop.Order", "shop.Order", &CallbackSet::new(), Walk::Hierarchy, false)
            .unwrap();
        assert_eq!(names(&set[&LifecycleEvent::PrePersist]), ["shop.Order::audit()"]);
        assert_eq!(names(&set[&LifecycleEvent::PreUpdate]), ["shop.Base::stamp()"]);
    }

    #[test]
    fn entity_lifecycle_orders_own_then_listeners() {
        let table = table();
        let config = ResolverConfig::default();
        let log = DiagnosticLog::new();
        let merger = CallbackMerger::new(&table, &config, &log);
        let lifecycle = merger
            .entity_lifecycle("shop.Order", &["shop.AuditListener".into()], None)
            .unwrap();
        let order = lifecycle.invocation_order(LifecycleEvent::PrePersist);
        assert_eq!(
            order.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["shop.Order::audit()", "shop.AuditListener::before(shop.Order)"]
        );
        let declared = lifecycle.declared(LifecycleEvent::PrePersist).unwrap();
        assert_eq!(declared.listener_count, 1);
        // the base audit() is shadowed, only stamp() is inherited
        assert!(lifecycle.superclass(LifecycleEvent::PrePersist).is_none());
        assert_eq!(
            names(&lifecycle.superclass(LifecycleEvent::PreUpdate).unwrap().callbacks),
            ["shop.Base::stamp()"]
        );
    }

    #[test]
    fn multiple_callbacks_on_one_type_is_error_by_default() {
        let table = table();
        let config = ResolverConfig::default();
        let log = DiagnosticLog::new();
        let err = CallbackMerger::new(&table, &config, &log)
            .collect_callbacks("shop.Greedy", "shop.Greedy", &CallbackSet::new(), Walk::TypeOnly, false)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MultipleCallbacks { methods, .. } if methods == ["a", "b"]
        ));
    }

    #[test]
    fn multiple_callbacks_tolerated_when_allowed() {
        let table = table();
        let config = ResolverConfig::default().with_multiple_callbacks(true);
        let log = DiagnosticLog::new();
        let set = CallbackMerger::new(&table, &config, &log)
            .collect_callbacks("shop.Greedy", "shop.Greedy", &CallbackSet::new(), Walk::TypeOnly, false)
            .unwrap();
        assert_eq!(
            names(&set[&LifecycleEvent::PrePersist]),
            ["shop.Greedy::a()", "shop.Greedy::b()"]
        );
        assert_eq!(log.count(DiagnosticCode::MultipleCallbacks), 1);
    }

    #[test]
    fn named_callback_found_on_supertype() {
        let table = table();
        let config = ResolverConfig::default();
        let log = DiagnosticLog::new();
        let merger = CallbackMerger::new(&table, &config, &log);
        let adapter = merger.named_callback("shop.Order", "shop.Order", "stamp", false).unwrap();
        assert_eq!(adapter.declaring_type, "shop.Base");
        assert!(matches!(
            merger.named_callback("shop.Order", "shop.Order", "missing", false),
            Err(ResolveError::UnknownMethod { .. })
        ));
        assert!(matches!(
            merger.named_callback("shop.Order", "shop.Nope", "x", true),
            Err(ResolveError::UnknownType(_))
        ));
    }
}
