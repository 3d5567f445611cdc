//! Metadata engine
//!
//! The facade most callers need. Owns the declaration table, the shared
//! repository, the document parser (which wraps the directive parser) and the
//! hint resolver:
//! - Load override documents from text or files
//! - Resolve one type, one document, or every persistent type
//! - Query the repository for entities, queries, sequences and callbacks
//! - Apply hint maps against the configured fetch defaults

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use indexmap::{IndexMap, IndexSet};
use ormeta_hints::{HintApplication, HintExtension, HintResolver};
use ormeta_model::{
    CallbackAdapter, DeclarationTable, EntityDescriptor, LifecycleEvent, QueryDescriptor,
    ResolutionModes, SequenceDescriptor, TypeIntrospector,
};
use ormeta_parse::{DirectiveParser, DocumentParser, ExtensionHook, OverrideDocument};
use ormeta_repository::{DiagnosticLog, MetadataRepository};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Builder for [`MetadataEngine`]
pub struct EngineBuilder {
    types: Arc<DeclarationTable>,
    config: EngineConfig,
    repository: Option<Arc<MetadataRepository>>,
    hook: Option<Arc<dyn ExtensionHook>>,
    hint_extensions: Vec<Arc<dyn HintExtension>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve into an existing repository instead of a fresh one
    #[must_use]
    pub fn repository(mut self, repository: Arc<MetadataRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Handler for directive names outside the catalog
    #[must_use]
    pub fn extension_hook(mut self, hook: Arc<dyn ExtensionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    #[must_use]
    pub fn hint_extension(mut self, extension: Arc<dyn HintExtension>) -> Self {
        self.hint_extensions.push(extension);
        self
    }

    #[must_use]
    pub fn build(self) -> MetadataEngine {
        let repository = self.repository.unwrap_or_else(MetadataRepository::shared);
        let types: Arc<dyn TypeIntrospector> = Arc::clone(&self.types) as Arc<dyn TypeIntrospector>;
        let mut directives = DirectiveParser::new(types, repository, self.config.resolver.clone());
        if let Some(hook) = self.hook {
            directives = directives.with_extension_hook(hook);
        }
        let hints = self
            .hint_extensions
            .into_iter()
            .fold(HintResolver::new(self.config.hints.clone()), HintResolver::with_extension);
        MetadataEngine {
            types: self.types,
            documents: DocumentParser::new(directives),
            hints,
            config: self.config,
        }
    }
}

/// Entity metadata engine
#[derive(Debug)]
pub struct MetadataEngine {
    types: Arc<DeclarationTable>,
    documents: DocumentParser,
    hints: HintResolver,
    config: EngineConfig,
}

impl MetadataEngine {
    /// Engine with the given configuration and no extensions
    #[must_use]
    pub fn new(types: Arc<DeclarationTable>, config: EngineConfig) -> Self {
        Self::builder(types).config(config).build()
    }

    #[must_use]
    pub fn builder(types: Arc<DeclarationTable>) -> EngineBuilder {
        EngineBuilder {
            types,
            config: EngineConfig::default(),
            repository: None,
            hook: None,
            hint_extensions: Vec::new(),
        }
    }

    /// Engine over a declaration table file
    ///
    /// # Errors
    ///
    /// [`EngineError::Declarations`] when the table does not load.
    pub fn from_table_file(path: &Path, config: EngineConfig) -> Result<Self> {
        let table = DeclarationTable::load(path)?;
        tracing::info!(path = %path.display(), types = table.len(), "loaded declaration table");
        Ok(Self::new(Arc::new(table), config))
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn types(&self) -> &DeclarationTable {
        &self.types
    }

    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Arc<MetadataRepository> {
        self.documents.directives().repository()
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticLog {
        self.repository().diagnostics()
    }

    #[inline]
    #[must_use]
    pub fn hints(&self) -> &HintResolver {
        &self.hints
    }

    /// Register an override document
    ///
    /// # Errors
    ///
    /// Syntax errors and duplicate document names.
    pub fn load_document(&self, name: &str, text: &str) -> Result<Arc<OverrideDocument>> {
        Ok(self.documents.load(name, text)?)
    }

    /// Register an override document read from disk, named by its path
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] plus everything [`load_document`](Self::load_document) returns.
    pub fn load_document_file(&self, path: &Path) -> Result<Arc<OverrideDocument>> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_document(&path.display().to_string(), &text)
    }

    /// Resolve one type for `modes`
    ///
    /// Repeated calls for modes already resolved return the stored
    /// descriptor. `None` means the type has no persistence metadata.
    ///
    /// # Errors
    ///
    /// Any resolution failure; the stored descriptor is left untouched.
    pub fn resolve(&self, type_name: &str, modes: ResolutionModes) -> Result<Option<EntityDescriptor>> {
        let span = tracing::debug_span!("resolve", entity = type_name, %modes);
        let _guard = span.enter();
        match self.documents.resolve_type(type_name, modes) {
            Ok(resolved) => {
                if let Some(entity) = &resolved {
                    tracing::debug!(fields = entity.fields.len(), resolved = %entity.resolution_modes, "resolved");
                }
                Ok(resolved)
            }
            Err(err) => {
                tracing::warn!(error = %err, "resolution failed");
                Err(err.into())
            }
        }
    }

    /// Resolve every type a loaded document defines
    ///
    /// # Errors
    ///
    /// Unknown document or the first failing type.
    pub fn resolve_document(&self, name: &str, modes: ResolutionModes) -> Result<Vec<EntityDescriptor>> {
        Ok(self.documents.resolve(name, modes)?)
    }

    /// Types with persistence metadata: declared roots, then document-only
    /// types, each once
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        let mut names: IndexSet<String> = self
            .types
            .type_names()
            .into_iter()
            .filter(|name| {
                self.types
                    .type_decl(name)
                    .is_some_and(|decl| decl.is_persistent_root())
            })
            .collect();
        names.extend(self.documents.targets());
        names.into_iter().collect()
    }

    /// Resolve every candidate type
    ///
    /// # Errors
    ///
    /// The first failing type; earlier types stay resolved.
    pub fn resolve_all(&self, modes: ResolutionModes) -> Result<Vec<EntityDescriptor>> {
        let candidates = self.candidates();
        tracing::info!(types = candidates.len(), %modes, "resolving all persistent types");
        let mut resolved = Vec::with_capacity(candidates.len());
        for name in &candidates {
            if let Some(entity) = self.resolve(name, modes)? {
                resolved.push(entity);
            }
        }
        Ok(resolved)
    }

    #[must_use]
    pub fn entity(&self, type_name: &str) -> Option<EntityDescriptor> {
        self.repository().entity(type_name)
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<QueryDescriptor> {
        self.repository().query(name)
    }

    #[must_use]
    pub fn sequence(&self, name: &str) -> Option<SequenceDescriptor> {
        self.repository().sequence(name)
    }

    /// Invocation order of `event` callbacks for an entity
    #[must_use]
    pub fn callbacks_for(&self, type_name: &str, event: LifecycleEvent) -> Vec<CallbackAdapter> {
        self.repository().callbacks_for(type_name, event)
    }

    /// Apply hints to the configured fetch defaults
    #[must_use]
    pub fn apply_hints(&self, hints: &IndexMap<String, Value>) -> HintApplication {
        self.hints.apply_hints(&self.config.hints.fetch, hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormeta_model::{DirectiveTag, MemberDecl, TypeDecl, ValueType};
    use ormeta_parse::ResolverConfig;
    use serde_json::json;

    fn table() -> Arc<DeclarationTable> {
        let table = DeclarationTable::new()
            .with_type(
                TypeDecl::new("app.Note")
                    .with_directive(DirectiveTag::new("entity"))
                    .with_field(MemberDecl::new("id", ValueType::Long).with_directive(DirectiveTag::new("id")))
                    .with_field(MemberDecl::new("body", ValueType::Text)),
            )
            .unwrap()
            .with_type(TypeDecl::new("app.Util").with_field(MemberDecl::new("x", ValueType::Int)))
            .unwrap();
        Arc::new(table)
    }

    #[test]
    fn candidates_skip_plain_types() {
        let engine = MetadataEngine::new(table(), EngineConfig::default());
        assert_eq!(engine.candidates(), ["app.Note"]);
        let resolved = engine.resolve_all(ResolutionModes::ALL).unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(engine.resolve("app.Util", ResolutionModes::META).unwrap().is_none());
    }

    #[test]
    fn builder_passes_resolver_config() {
        let config = EngineConfig::default().with_resolver(ResolverConfig::default().with_override_mode(true));
        let engine = MetadataEngine::builder(table()).config(config).build();
        assert!(engine.config().resolver.override_mode);
    }

    #[test]
    fn apply_hints_starts_from_configured_fetch() {
        let mut config = EngineConfig::default();
        config.hints.fetch.fetch_batch_size = 25;
        let engine = MetadataEngine::new(table(), config);
        let mut hints = IndexMap::new();
        hints.insert("ormeta.FetchPlan.QueryTimeout".to_string(), json!(300));
        let applied = engine.apply_hints(&hints);
        assert_eq!(applied.config.fetch_batch_size, 25);
        assert_eq!(applied.config.query_timeout, 300);
    }

    #[test]
    fn undeclared_type_is_a_resolution_error() {
        let engine = MetadataEngine::new(table(), EngineConfig::default());
        let err = engine.resolve("app.Missing", ResolutionModes::META).unwrap_err();
        assert!(err.is_resolution());
    }
}
