//! Override document parser
//!
//! Documents are loaded into immutable trees up front; resolution walks the
//! tree for one type at a time. Each phase first lets the directive parser
//! lay down the in-code base layer (unless the document or configuration
//! says its metadata is complete), then overlays the document values under
//! the configured override policy.

use super::model::{
    AttributeElement, AttributeKind, DocumentEntity, FetchGroupElement, ListenerElement,
    OverrideDocument, QueryElement, TypeElement,
};
use crate::apply::{apply_field, apply_type};
use crate::directives::DirectiveParser;
use crate::error::ResolveError;
use crate::lifecycle::{CallbackMerger, CallbackSet};
use crate::structure::{
    add_fetch_groups, ensure_fields, finish_meta, infer_missing_strategies, init_entity,
    query_descriptor, sequence_descriptor, Overlay,
};
use indexmap::IndexMap;
use ormeta_model::{
    AccessType, Directive, EntityDescriptor, EntityKind, FetchGroupDirective, LifecycleEvent,
    MetadataSource, QueryLanguage, ResolutionMode, ResolutionModes, SourceLocation,
    StrategyOrigin, TypeDecl,
};
use ormeta_repository::{DiagnosticCode, EntityEntry, MetadataRepository};
use parking_lot::RwLock;
use std::sync::Arc;

/// Parser for override documents layered over in-code directives
#[derive(Debug)]
pub struct DocumentParser {
    directives: DirectiveParser,
    documents: RwLock<IndexMap<String, Arc<OverrideDocument>>>,
}

impl DocumentParser {
    #[must_use]
    pub fn new(directives: DirectiveParser) -> Self {
        Self {
            directives,
            documents: RwLock::new(IndexMap::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn directives(&self) -> &DirectiveParser {
        &self.directives
    }

    fn repository(&self) -> &MetadataRepository {
        self.directives.repository()
    }

    /// Parse and register a document
    ///
    /// A type already defined by another loaded document keeps that
    /// definition; the later element is dropped with a duplicate-entity
    /// warning.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Document`] when the text does not parse or the name is
    /// already taken.
    pub fn load(&self, name: &str, text: &str) -> Result<Arc<OverrideDocument>, ResolveError> {
        let mut document = OverrideDocument::parse(name, text)?;
        let mut documents = self.documents.write();
        if documents.contains_key(name) {
            return Err(ResolveError::document(name, None, "document already loaded"));
        }
        document.entities.retain(|type_name, _| {
            let Some(owner) = documents.values().find(|d| d.entities.contains_key(type_name)) else {
                return true;
            };
            self.repository().diagnostics().record(
                DiagnosticCode::DuplicateEntity,
                type_name.as_str(),
                format!("already defined by '{}', ignoring the definition in '{name}'", owner.name),
            );
            false
        });
        tracing::info!(document = name, entities = document.entities.len(), "loaded override document");
        let document = Arc::new(document);
        documents.insert(name.to_string(), Arc::clone(&document));
        Ok(document)
    }

    #[must_use]
    pub fn document(&self, name: &str) -> Option<Arc<OverrideDocument>> {
        self.documents.read().get(name).cloned()
    }

    /// Document defining `type_name`, if any
    #[must_use]
    pub fn document_for(&self, type_name: &str) -> Option<Arc<OverrideDocument>> {
        self.documents
            .read()
            .values()
            .find(|d| d.entities.contains_key(type_name))
            .cloned()
    }

    /// Every type some loaded document defines, in load order
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        self.documents
            .read()
            .values()
            .flat_map(|d| d.entities.keys().cloned())
            .collect()
    }

    /// Resolve every type of a loaded document plus its document-level
    /// sequences, queries and default listeners
    ///
    /// # Errors
    ///
    /// [`ResolveError::Document`] for an unknown document, otherwise the
    /// first failure of a type; types resolved before it stay resolved.
    pub fn resolve(
        &self,
        document: &str,
        modes: ResolutionModes,
    ) -> Result<Vec<EntityDescriptor>, ResolveError> {
        let doc = self
            .document(document)
            .ok_or_else(|| ResolveError::document(document, None, "document not loaded"))?;
        self.resolve_globals(&doc, modes)?;
        doc.entities
            .iter()
            .map(|(type_name, target)| self.resolve_entity(&doc, type_name, target, modes))
            .collect()
    }

    /// Resolve one type from whichever sources describe it
    ///
    /// Without a document defining the type this is the directive parser
    /// alone. Document-level settings of every loaded document are applied
    /// first since default listeners reach every entity.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`]; the repository keeps the descriptor as it was
    /// before the call.
    pub fn resolve_type(
        &self,
        type_name: &str,
        modes: ResolutionModes,
    ) -> Result<Option<EntityDescriptor>, ResolveError> {
        let documents: Vec<_> = self.documents.read().values().cloned().collect();
        for doc in &documents {
            self.resolve_globals(doc, modes)?;
        }
        match documents.iter().find_map(|d| d.entity(type_name).map(|t| (d, t))) {
            Some((doc, target)) => self.resolve_entity(doc, type_name, target, modes).map(Some),
            None => self.directives.resolve(type_name, modes),
        }
    }

    /// Document-level sequences, default listeners and queries, once per
    /// document and mode
    ///
    /// A failed pass gives its modes back so a retry processes the document
    /// again.
    fn resolve_globals(&self, doc: &OverrideDocument, modes: ResolutionModes) -> Result<(), ResolveError> {
        let repository = self.repository();
        let pending = repository.claim_document_modes(&doc.name, modes);
        if pending.is_empty() {
            return Ok(());
        }
        self.apply_globals(doc, pending).inspect_err(|_| {
            repository.release_document_modes(&doc.name, pending);
        })
    }

    fn apply_globals(&self, doc: &OverrideDocument, pending: ResolutionModes) -> Result<(), ResolveError> {
        let repository = self.repository();
        let source = MetadataSource::Document(doc.name.clone());
        if pending.contains(ResolutionMode::Meta) {
            let listeners = &doc.unit.entity_listeners;
            // listener lookup can fail; do it before registering anything
            let defaults = if listeners.is_empty() {
                None
            } else {
                let names: Vec<String> = listeners.iter().map(|l| doc.qualify(l.class())).collect();
                Some((names, self.listener_set(&doc.name, doc, listeners)?))
            };
            for sequence in &doc.sequence_generators {
                repository.register_sequence(sequence_descriptor(
                    &sequence.to_directive(),
                    source.clone(),
                    Some(SourceLocation::file(&doc.name)),
                ));
            }
            if let Some((names, callbacks)) = defaults {
                tracing::debug!(document = %doc.name, listeners = ?names, "registering default listeners");
                repository.add_default_listeners(&names, callbacks);
            }
        }
        if pending.contains(ResolutionMode::Query) {
            let scope = doc.package.as_deref().unwrap_or(&doc.name);
            self.register_queries(doc, scope, &doc.named_queries, &doc.named_native_queries, None);
        }
        Ok(())
    }

    fn resolve_entity(
        &self,
        doc: &OverrideDocument,
        type_name: &str,
        target: &DocumentEntity,
        modes: ResolutionModes,
    ) -> Result<EntityDescriptor, ResolveError> {
        let decl = self
            .directives
            .types()
            .type_decl(type_name)
            .ok_or_else(|| ResolveError::UnknownType(type_name.to_string()))?;

        let (entry, _) = self.repository().get_or_create(type_name);
        let _populate = entry.lock_populate();
        let original = entry.snapshot();
        let source = MetadataSource::Document(doc.name.clone());
        let done = original.resolution_modes.union(original.modes_from(&source));
        if done.contains_all(modes) {
            self.repository().diagnostics().record(
                DiagnosticCode::DuplicateParse,
                type_name,
                format!("document '{}' already applied for {modes}", doc.name),
            );
            return Ok(original);
        }

        let mut pending = modes.difference(done);
        if pending.contains(ResolutionMode::Mapping) && !done.contains(ResolutionMode::Meta) {
            pending.insert(ResolutionMode::Meta);
        }
        tracing::debug!(entity = type_name, document = %doc.name, modes = %pending, "applying override document");

        self.apply_phases(doc, decl, target, pending, &entry).inspect_err(|_| {
            *entry.write() = original;
        })
    }

    fn apply_phases(
        &self,
        doc: &OverrideDocument,
        decl: &TypeDecl,
        target: &DocumentEntity,
        pending: ResolutionModes,
        entry: &EntityEntry,
    ) -> Result<EntityDescriptor, ResolveError> {
        let config = self.directives.config();
        let source = MetadataSource::Document(doc.name.clone());
        let complete = config.metadata_complete
            || doc.metadata_complete()
            || target.element.metadata_complete == Some(true);

        for mode in pending.iter() {
            let layered = entry.read().modes_from(&MetadataSource::Directives);
            if !complete && !layered.contains(mode) {
                self.directives.resolve_layer(&decl.name, ResolutionModes::only(mode))?;
            }
            let mut entity = entry.snapshot();
            match mode {
                ResolutionMode::Meta => self.meta_overlay(doc, decl, target, &mut entity)?,
                ResolutionMode::Mapping => self.mapping_overlay(doc, decl, &target.element, &mut entity)?,
                ResolutionMode::Query => self.query_overlay(doc, decl, target),
            }
            entity.record_source_modes(&source, ResolutionModes::only(mode));
            *entry.write() = entity;
        }

        let mut entity = entry.snapshot();
        if pending.contains(ResolutionMode::Meta) {
            finish_meta(&mut entity, self.directives.types().as_ref(), config)?;
        }
        entity.mark_resolved(pending);
        *entry.write() = entity.clone();
        Ok(entity)
    }

    fn overlay<'a>(&'a self, decl: &'a TypeDecl) -> Overlay<'a> {
        Overlay {
            entity: &decl.name,
            origin: StrategyOrigin::Document,
            replace: self.directives.config().override_mode,
            diagnostics: self.repository().diagnostics(),
        }
    }

    fn meta_overlay(
        &self,
        doc: &OverrideDocument,
        decl: &TypeDecl,
        target: &DocumentEntity,
        entity: &mut EntityDescriptor,
    ) -> Result<(), ResolveError> {
        let types = self.directives.types().as_ref();
        let overlay = self.overlay(decl);
        let element = &target.element;

        init_entity(entity, decl, target.kind, types, |name| {
            self.document_for(name).is_some() || self.repository().entry(name).is_some()
        });
        entity.location = Some(match target.line {
            Some(line) => SourceLocation::at_line(&doc.name, line),
            None => SourceLocation::file(&doc.name),
        });

        let root = match target.kind {
            EntityKind::Entity => Directive::Entity {
                name: element.name.clone(),
            },
            EntityKind::Embeddable => Directive::Embeddable,
            EntityKind::MappedSuperclass => Directive::MappedSuperclass,
        };
        apply_type(&overlay, entity, &root)?;
        if let Some(class) = &element.id_class {
            apply_type(&overlay, entity, &Directive::IdClass(doc.qualify(class)))?;
        }
        if element.exclude_default_listeners {
            apply_type(&overlay, entity, &Directive::ExcludeDefaultListeners)?;
        }
        if element.exclude_superclass_listeners {
            apply_type(&overlay, entity, &Directive::ExcludeSuperclassListeners)?;
        }
        if let Some(access) = element.access.as_deref().or(doc.access.as_deref()) {
            let access = match access {
                "field" => AccessType::Field,
                "property" => AccessType::Property,
                other => {
                    return Err(ResolveError::unsupported(
                        &decl.name,
                        "type",
                        "access",
                        format!("unsupported access type '{other}'"),
                    ))
                }
            };
            overlay.set("type", "access", &mut entity.access, access);
        }
        if let Some(sequence) = &element.sequence_generator {
            self.repository().register_sequence(sequence_descriptor(
                &sequence.to_directive(),
                MetadataSource::Document(doc.name.clone()),
                entity.location.clone(),
            ));
        }

        ensure_fields(entity, decl);
        for (kind, attribute) in element.attributes.iter() {
            for directive in self.attribute_directives(doc, decl, entity, kind, attribute, ResolutionMode::Meta)? {
                apply_field(&overlay, types, entity, &attribute.name, &directive)?;
            }
        }
        infer_missing_strategies(entity, types);

        let groups: Vec<FetchGroupDirective> = element.fetch_groups.iter().map(FetchGroupElement::to_directive).collect();
        add_fetch_groups(entity, &groups, &overlay)?;

        self.overlay_callbacks(doc, decl, element, entity, &overlay)
    }

    fn mapping_overlay(
        &self,
        doc: &OverrideDocument,
        decl: &TypeDecl,
        element: &TypeElement,
        entity: &mut EntityDescriptor,
    ) -> Result<(), ResolveError> {
        let overlay = self.overlay(decl);
        if let Some(table) = &element.table {
            apply_type(&overlay, entity, &Directive::Table(table.clone()))?;
        }
        for (kind, attribute) in element.attributes.iter() {
            for directive in self.attribute_directives(doc, decl, entity, kind, attribute, ResolutionMode::Mapping)? {
                apply_field(&overlay, self.directives.types().as_ref(), entity, &attribute.name, &directive)?;
            }
        }
        Ok(())
    }

    fn query_overlay(&self, doc: &OverrideDocument, decl: &TypeDecl, target: &DocumentEntity) {
        let location = target.line.map(|line| SourceLocation::at_line(&doc.name, line));
        self.register_queries(
            doc,
            &decl.name,
            &target.element.named_queries,
            &target.element.named_native_queries,
            location,
        );
    }

    fn register_queries(
        &self,
        doc: &OverrideDocument,
        scope: &str,
        queries: &[QueryElement],
        native: &[QueryElement],
        location: Option<SourceLocation>,
    ) {
        let location = location.or_else(|| Some(SourceLocation::file(&doc.name)));
        let all = queries
            .iter()
            .map(|q| q.to_directive(QueryLanguage::Jpql))
            .chain(native.iter().map(|q| q.to_directive(QueryLanguage::Sql)));
        for query in all {
            self.repository().register_query(query_descriptor(
                &query,
                MetadataSource::Document(doc.name.clone()),
                scope,
                location.clone(),
            ));
        }
    }

    /// Typed directives of one attribute element for `phase`
    fn attribute_directives(
        &self,
        doc: &OverrideDocument,
        decl: &TypeDecl,
        entity: &EntityDescriptor,
        kind: AttributeKind,
        attribute: &AttributeElement,
        phase: ResolutionMode,
    ) -> Result<Vec<Directive>, ResolveError> {
        if entity.field(&attribute.name).is_none() {
            return Err(ResolveError::UnknownField {
                entity: decl.name.clone(),
                field: attribute.name.clone(),
                document: doc.name.clone(),
            });
        }
        let directives = attribute.directives(kind, |class| doc.qualify(class)).map_err(|name| {
            ResolveError::unsupported(
                &decl.name,
                format!("field '{}'", attribute.name),
                kind.as_str(),
                format!("unknown cascade '{name}'"),
            )
        })?;
        Ok(directives
            .into_iter()
            .filter(|(mode, _)| *mode == phase)
            .map(|(_, directive)| directive)
            .collect())
    }

    /// Replace the listener or method subset of the declared buckets
    ///
    /// A subset already filled by directives is kept unless the document
    /// overrides.
    fn overlay_callbacks(
        &self,
        doc: &OverrideDocument,
        decl: &TypeDecl,
        element: &TypeElement,
        entity: &mut EntityDescriptor,
        overlay: &Overlay<'_>,
    ) -> Result<(), ResolveError> {
        let diagnostics = self.repository().diagnostics();
        if let Some(listeners) = &element.entity_listeners {
            let names: Vec<String> = listeners.iter().map(|l| doc.qualify(l.class())).collect();
            let mut callbacks = self.listener_set(&decl.name, doc, listeners)?;
            let untouched = LifecycleEvent::ALL
                .into_iter()
                .all(|event| entity.lifecycle.declared(event).map_or(true, |b| b.listeners().is_empty()));
            if overlay.replace || untouched {
                entity.listeners = names;
                for event in LifecycleEvent::ALL {
                    let mut bucket = entity.lifecycle.declared(event).cloned().unwrap_or_default();
                    bucket.replace_listeners(callbacks.remove(&event).unwrap_or_default());
                    entity.lifecycle.set_declared(event, bucket);
                }
            } else {
                diagnostics.record(
                    DiagnosticCode::OverrideIgnored,
                    decl.name.as_str(),
                    "entity-listeners ignored, keeping listener callbacks from directives",
                );
            }
        }

        if !element.callbacks.is_empty() {
            let merger = CallbackMerger::new(
                self.directives.types().as_ref(),
                self.directives.config(),
                diagnostics,
            );
            let mut methods = CallbackSet::new();
            for (event, method) in &element.callbacks {
                let adapter = merger.named_callback(&decl.name, &decl.name, method, false)?;
                methods.entry(*event).or_default().push(adapter);
            }
            let untouched = LifecycleEvent::ALL
                .into_iter()
                .all(|event| entity.lifecycle.declared(event).map_or(true, |b| b.methods().is_empty()));
            if overlay.replace || untouched {
                for event in LifecycleEvent::ALL {
                    let mut bucket = entity.lifecycle.declared(event).cloned().unwrap_or_default();
                    bucket.replace_methods(methods.remove(&event).unwrap_or_default());
                    entity.lifecycle.set_declared(event, bucket);
                }
            } else {
                diagnostics.record(
                    DiagnosticCode::OverrideIgnored,
                    decl.name.as_str(),
                    "callbacks ignored, keeping callback methods from directives",
                );
            }
        }
        Ok(())
    }

    /// Callbacks of listener elements, explicit methods taking priority over
    /// directive discovery
    fn listener_set(
        &self,
        entity: &str,
        doc: &OverrideDocument,
        listeners: &[ListenerElement],
    ) -> Result<CallbackSet, ResolveError> {
        let merger = CallbackMerger::new(
            self.directives.types().as_ref(),
            self.directives.config(),
            self.repository().diagnostics(),
        );
        let mut out = CallbackSet::new();
        for listener in listeners {
            let class = doc.qualify(listener.class());
            match listener.callbacks() {
                Some(callbacks) => {
                    for (event, method) in callbacks {
                        let adapter = merger.named_callback(entity, &class, method, true)?;
                        out.entry(*event).or_default().push(adapter);
                    }
                }
                None => {
                    for (event, adapters) in merger.listener_callbacks(entity, std::slice::from_ref(&class))? {
                        out.entry(event).or_default().extend(adapters);
                    }
                }
            }
        }
        Ok(out)
    }
}
