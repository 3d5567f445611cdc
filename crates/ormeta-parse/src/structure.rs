//! Shared structural operations
//!
//! Both parsers build and refine descriptors through these helpers so the
//! precedence rules live in one place:
//!
//! - [`Overlay`]: how a source writes attributes that may already be set
//! - field population from declarations and default strategy inference
//! - fetch-group construction and validation
//! - end-of-resolution completeness check

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use ormeta_model::{
    infer_strategy, strategy_accepts, EntityDescriptor, EntityKind, FetchGroup,
    FetchGroupDirective, FieldDescriptor, Management, MetadataSource, NamedQueryDirective,
    QueryDescriptor, SequenceDescriptor, SequenceGeneratorDirective, SourceLocation, Strategy,
    StrategyOrigin, TypeDecl, TypeIntrospector,
};
use ormeta_repository::{DiagnosticCode, DiagnosticLog};
use std::collections::HashSet;
use std::fmt::Debug;

/// Write policy of one source
///
/// A replacing overlay (in-code directives, or a document in override mode)
/// overwrites attributes; otherwise values only fill unset attributes and
/// conflicts are recorded as ignored.
pub(crate) struct Overlay<'a> {
    pub(crate) entity: &'a str,
    pub(crate) origin: StrategyOrigin,
    pub(crate) replace: bool,
    pub(crate) diagnostics: &'a DiagnosticLog,
}

impl Overlay<'_> {
    /// Set an optional attribute under this overlay's policy
    pub(crate) fn set<T: PartialEq + Debug>(
        &self,
        element: &str,
        attr: &str,
        slot: &mut Option<T>,
        value: T,
    ) {
        match slot {
            Some(existing) if *existing == value => {}
            Some(existing) if !self.replace => {
                self.diagnostics.record(
                    DiagnosticCode::OverrideIgnored,
                    format!("{}.{element}", self.entity),
                    format!("{attr} {value:?} ignored, keeping {existing:?}"),
                );
            }
            _ => *slot = Some(value),
        }
    }

    /// Assign a strategy to a field
    ///
    /// Inferred strategies always yield. A strategy from the same origin that
    /// differs is a conflict; one from an earlier origin yields only when this
    /// overlay replaces. Returns `false` when the field keeps its earlier
    /// strategy, in which case the element's other attributes do not apply.
    pub(crate) fn assign_strategy(
        &self,
        field: &mut FieldDescriptor,
        strategy: Strategy,
        directive: &str,
    ) -> Result<bool, ResolveError> {
        if !strategy_accepts(strategy, field.declared_type()) {
            return Err(ResolveError::mismatch(
                self.entity,
                &field.name,
                directive,
                field.declared_type(),
            ));
        }
        match (field.strategy, field.strategy_origin) {
            (_, None | Some(StrategyOrigin::Inferred)) => {
                field.assign_strategy(strategy, self.origin);
            }
            (Some(current), Some(origin)) if origin == self.origin && current != strategy => {
                return Err(ResolveError::ConflictingStrategy {
                    entity: self.entity.to_string(),
                    field: field.name.clone(),
                    first: current.to_string(),
                    second: strategy.to_string(),
                });
            }
            (Some(current), Some(_)) if current == strategy => {
                field.explicit = true;
            }
            (current, Some(_)) => {
                if !self.replace {
                    self.diagnostics.record(
                        DiagnosticCode::OverrideIgnored,
                        format!("{}.{}", self.entity, field.name),
                        format!(
                            "strategy {strategy} ignored, keeping {}",
                            current.map_or_else(|| "none".to_string(), |s| s.to_string())
                        ),
                    );
                    return Ok(false);
                }
                field.assign_strategy(strategy, self.origin);
            }
        }
        Ok(true)
    }
}

/// First supertype that is itself persistent, if any
pub(crate) fn persistent_superclass(
    decl: &TypeDecl,
    types: &dyn TypeIntrospector,
    documented: impl Fn(&str) -> bool,
) -> Option<String> {
    types
        .supertypes(&decl.name)
        .into_iter()
        .find(|sup| {
            sup.has_directive("entity") || sup.has_directive("mapped-superclass") || documented(&sup.name)
        })
        .map(|sup| sup.name.clone())
}

/// Set class-level attributes derived from the declaration
pub(crate) fn init_entity(
    entity: &mut EntityDescriptor,
    decl: &TypeDecl,
    kind: EntityKind,
    types: &dyn TypeIntrospector,
    documented: impl Fn(&str) -> bool,
) {
    entity.kind = kind;
    entity.is_abstract = decl.is_abstract || kind == EntityKind::MappedSuperclass;
    entity.package = decl.package_name().map(str::to_string);
    entity.persistent_superclass = persistent_superclass(decl, types, documented);
}

/// Create descriptors for every declared non-static member
///
/// Keyword-transient members are recorded as unmanaged. Existing descriptors
/// are kept.
pub(crate) fn ensure_fields(entity: &mut EntityDescriptor, decl: &TypeDecl) {
    for (index, member) in decl.fields.iter().enumerate() {
        if member.is_static || entity.fields.contains_key(&member.name) {
            continue;
        }
        let mut field = FieldDescriptor::new(&member.name, index, member.value_type.clone());
        if member.is_transient {
            field.management = Management::None;
        }
        entity.add_field(field);
    }
}

/// Infer a strategy for every managed field that has none
///
/// Returns the names of the fields that received one.
pub fn infer_missing_strategies(
    entity: &mut EntityDescriptor,
    types: &dyn TypeIntrospector,
) -> Vec<String> {
    let mut inferred = Vec::new();
    for field in entity.fields.values_mut() {
        if field.management != Management::Persistent || field.strategy.is_some() {
            continue;
        }
        if let Some(strategy) = infer_strategy(field.declared_type(), types) {
            field.assign_strategy(strategy, StrategyOrigin::Inferred);
            inferred.push(field.name.clone());
        }
    }
    inferred
}

/// Every managed field must have a strategy
///
/// # Errors
///
/// Returns [`ResolveError::IncompleteResolution`] listing all offenders.
pub fn validate_complete(entity: &EntityDescriptor) -> Result<(), ResolveError> {
    let fields = entity.unresolved_fields();
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ResolveError::IncompleteResolution {
            entity: entity.type_name.clone(),
            fields,
        })
    }
}

/// Close the META phase of an entity
///
/// Infers remaining defaults, then checks strategy completeness and fetch
/// group references, then derives the identity kind.
///
/// # Errors
///
/// The first failed check.
pub fn finish_meta(
    entity: &mut EntityDescriptor,
    types: &dyn TypeIntrospector,
    config: &ResolverConfig,
) -> Result<(), ResolveError> {
    let inferred = infer_missing_strategies(entity, types);
    if !inferred.is_empty() {
        tracing::debug!(entity = %entity.type_name, fields = ?inferred, "inferred default strategies");
    }
    validate_complete(entity)?;
    validate_fetch_groups(entity, config)?;
    entity.finalize_identity();
    Ok(())
}

/// Build fetch groups from directives and add them to the entity
///
/// A group already present is replaced only when the overlay replaces.
pub(crate) fn add_fetch_groups(
    entity: &mut EntityDescriptor,
    groups: &[FetchGroupDirective],
    overlay: &Overlay<'_>,
) -> Result<(), ResolveError> {
    let mut seen = HashSet::new();
    for directive in groups {
        if directive.name.trim().is_empty() {
            return Err(ResolveError::InvalidFetchGroup {
                entity: entity.type_name.clone(),
                group: directive.name.clone(),
                reason: "name must not be empty".into(),
            });
        }
        if !seen.insert(directive.name.as_str()) || FetchGroup::is_builtin(&directive.name) {
            return Err(ResolveError::InvalidFetchGroup {
                entity: entity.type_name.clone(),
                group: directive.name.clone(),
                reason: "name is already used".into(),
            });
        }
        let mut group = FetchGroup::new(&directive.name);
        group.post_load = directive.post_load;
        group.includes = directive.includes.clone();
        for attribute in &directive.attributes {
            let persistent = entity
                .field(&attribute.name)
                .is_some_and(FieldDescriptor::is_persistent);
            if !persistent {
                return Err(ResolveError::UnknownFetchGroupField {
                    entity: entity.type_name.clone(),
                    group: directive.name.clone(),
                    field: attribute.name.clone(),
                });
            }
            group.add_field(&attribute.name, attribute.recursion_depth);
        }
        match entity.fetch_groups.get(&group.name) {
            Some(existing) if *existing == group => {}
            Some(_) if !overlay.replace => {
                overlay.diagnostics.record(
                    DiagnosticCode::OverrideIgnored,
                    format!("{}.{}", entity.type_name, group.name),
                    format!("fetch group '{}' already defined, keeping first", group.name),
                );
            }
            _ => {
                entity.fetch_groups.insert(group.name.clone(), group);
            }
        }
    }
    Ok(())
}

/// Check cross references of the entity's fetch groups
///
/// Group fields must still be persistent; includes and load-fetch-group
/// references must name declared or built-in groups.
///
/// # Errors
///
/// Returns the first invalid reference found.
pub fn validate_fetch_groups(
    entity: &EntityDescriptor,
    config: &ResolverConfig,
) -> Result<(), ResolveError> {
    let known = |name: &str| FetchGroup::is_builtin(name) || entity.fetch_groups.contains_key(name);
    for group in entity.fetch_groups.values() {
        for field in &group.fields {
            if !entity.field(field).is_some_and(FieldDescriptor::is_persistent) {
                return Err(ResolveError::UnknownFetchGroupField {
                    entity: entity.type_name.clone(),
                    group: group.name.clone(),
                    field: field.clone(),
                });
            }
        }
        if config.validate_fetch_group_includes {
            if let Some(missing) = group.includes.iter().find(|name| !known(name)) {
                return Err(ResolveError::InvalidFetchGroup {
                    entity: entity.type_name.clone(),
                    group: group.name.clone(),
                    reason: format!("includes unknown group '{missing}'"),
                });
            }
        }
    }
    if config.validate_fetch_group_includes {
        for field in entity.fields.values() {
            if let Some(group) = field.load_fetch_group.as_deref().filter(|g| !known(g)) {
                return Err(ResolveError::InvalidFetchGroup {
                    entity: entity.type_name.clone(),
                    group: group.to_string(),
                    reason: format!("load fetch group of field '{}' is not defined", field.name),
                });
            }
        }
    }
    Ok(())
}

/// Map keys must name a member of the element type when it is declared
pub(crate) fn check_map_key(
    entity: &str,
    field: &FieldDescriptor,
    key: &str,
    types: &dyn TypeIntrospector,
) -> Result<(), ResolveError> {
    if !field.declared_type().is_container() {
        return Err(ResolveError::mismatch(entity, &field.name, "map-key", field.declared_type()));
    }
    let element = field
        .element
        .as_ref()
        .map(|e| &e.declared_type)
        .and_then(|t| t.referenced_type());
    let Some(element) = element else {
        return Ok(());
    };
    let Some(decl) = types.type_decl(element) else {
        return Ok(());
    };
    let declared = std::iter::once(decl)
        .chain(types.supertypes(element))
        .any(|d| d.member(key).is_some());
    if declared {
        Ok(())
    } else {
        Err(ResolveError::UnknownMapKey {
            entity: entity.to_string(),
            field: field.name.clone(),
            key: key.to_string(),
            element_type: element.to_string(),
        })
    }
}

/// Version fields need a numeric or timestamp value
pub(crate) fn check_version(entity: &str, field: &FieldDescriptor) -> Result<(), ResolveError> {
    if field.declared_type().is_version_compatible() {
        Ok(())
    } else {
        Err(ResolveError::mismatch(entity, &field.name, "version", field.declared_type()))
    }
}

/// Query descriptor for a named-query directive
pub(crate) fn query_descriptor(
    directive: &NamedQueryDirective,
    source: MetadataSource,
    scope: &str,
    location: Option<SourceLocation>,
) -> QueryDescriptor {
    let mut query = QueryDescriptor::new(&directive.name, &directive.query, directive.language, source)
        .with_defining_type(scope)
        .with_location(location);
    query.hints.clone_from(&directive.hints);
    query.lock_mode.clone_from(&directive.lock_mode);
    query.result_type.clone_from(&directive.result_type);
    query
}

/// Sequence descriptor for a sequence-generator directive
pub(crate) fn sequence_descriptor(
    directive: &SequenceGeneratorDirective,
    source: MetadataSource,
    location: Option<SourceLocation>,
) -> SequenceDescriptor {
    let mut sequence = SequenceDescriptor::new(&directive.name, source);
    sequence.sequence_name.clone_from(&directive.sequence_name);
    if let Some(initial) = directive.initial_value {
        sequence.initial_value = initial;
    }
    if let Some(size) = directive.allocation_size {
        sequence.allocation_size = size;
    }
    sequence.location = location;
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormeta_model::{
        DeclarationTable, DirectiveTag, FetchAttribute, MemberDecl, ValueType,
    };

    fn order() -> EntityDescriptor {
        let decl = TypeDecl::new("shop.Order")
            .with_field(MemberDecl::new("id", ValueType::Long))
            .with_field(MemberDecl::new("notes", ValueType::object("shop.Plain")))
            .with_field(MemberDecl::new("cache", ValueType::Text).with_transient())
            .with_field(MemberDecl::new("COUNT", ValueType::Int).with_static());
        let mut entity = EntityDescriptor::new("shop.Order");
        ensure_fields(&mut entity, &decl);
        entity
    }

    fn overlay(log: &DiagnosticLog, origin: StrategyOrigin, replace: bool) -> Overlay<'_> {
        Overlay {
            entity: "shop.Order",
            origin,
            replace,
            diagnostics: log,
        }
    }

    fn group(name: &str, fields: &[&str]) -> FetchGroupDirective {
        FetchGroupDirective {
            name: name.into(),
            post_load: false,
            attributes: fields
                .iter()
                .map(|f| FetchAttribute {
                    name: (*f).to_string(),
                    recursion_depth: None,
                })
                .collect(),
            includes: vec![],
        }
    }

    #[test]
    fn ensure_fields_skips_static_and_unmanages_transient() {
        let entity = order();
        assert_eq!(entity.fields.keys().collect::<Vec<_>>(), ["id", "notes", "cache"]);
        assert_eq!(entity.field("cache").unwrap().management, Management::None);
    }

    #[test]
    fn inference_leaves_plain_types_unresolved() {
        let mut entity = order();
        let table = DeclarationTable::new();
        assert_eq!(infer_missing_strategies(&mut entity, &table), ["id"]);
        let err = validate_complete(&entity).unwrap_err();
        assert!(matches!(err, ResolveError::IncompleteResolution { fields, .. } if fields == ["notes"]));
    }

    #[test]
    fn same_origin_conflict_is_fatal() {
        let log = DiagnosticLog::new();
        let directives = overlay(&log, StrategyOrigin::Directive, true);
        let mut field = FieldDescriptor::new("notes", 0, ValueType::object("Note"));
        directives.assign_strategy(&mut field, Strategy::ManyToOne, "many-to-one").unwrap();
        let err = directives
            .assign_strategy(&mut field, Strategy::Embedded, "embedded")
            .unwrap_err();
        assert!(matches!(err, ResolveError::ConflictingStrategy { .. }));
    }

    #[test]
    fn document_yields_to_directive_unless_replacing() {
        let log = DiagnosticLog::new();
        let mut field = FieldDescriptor::new("total", 0, ValueType::Decimal);
        field.assign_strategy(Strategy::Basic, StrategyOrigin::Directive);

        assert!(!overlay(&log, StrategyOrigin::Document, false)
            .assign_strategy(&mut field, Strategy::Transient, "transient")
            .unwrap());
        assert_eq!(field.strategy, Some(Strategy::Basic));
        assert_eq!(log.count(DiagnosticCode::OverrideIgnored), 1);

        assert!(overlay(&log, StrategyOrigin::Document, true)
            .assign_strategy(&mut field, Strategy::Transient, "transient")
            .unwrap());
        assert_eq!(field.strategy, Some(Strategy::Transient));
        assert_eq!(field.strategy_origin, Some(StrategyOrigin::Document));
    }

    #[test]
    fn inferred_strategy_always_yields() {
        let log = DiagnosticLog::new();
        let mut field = FieldDescriptor::new("address", 0, ValueType::object("Address"));
        field.assign_strategy(Strategy::Basic, StrategyOrigin::Inferred);
        overlay(&log, StrategyOrigin::Document, false)
            .assign_strategy(&mut field, Strategy::Embedded, "embedded")
            .unwrap();
        assert_eq!(field.strategy, Some(Strategy::Embedded));
    }

    #[test]
    fn relationship_on_scalar_is_mismatch() {
        let log = DiagnosticLog::new();
        let mut field = FieldDescriptor::new("total", 0, ValueType::Decimal);
        let err = overlay(&log, StrategyOrigin::Directive, true)
            .assign_strategy(&mut field, Strategy::OneToMany, "one-to-many")
            .unwrap_err();
        assert!(matches!(err, ResolveError::StructuralMismatch { directive, .. } if directive == "one-to-many"));
    }

    #[test]
    fn set_respects_policy() {
        let log = DiagnosticLog::new();
        let mut slot = Some("a".to_string());
        overlay(&log, StrategyOrigin::Document, false).set("f", "order-by", &mut slot, "b".to_string());
        assert_eq!(slot.as_deref(), Some("a"));
        overlay(&log, StrategyOrigin::Document, true).set("f", "order-by", &mut slot, "b".to_string());
        assert_eq!(slot.as_deref(), Some("b"));
    }

    #[test]
    fn fetch_group_with_unknown_field_names_both() {
        let log = DiagnosticLog::new();
        let mut entity = order();
        let err = add_fetch_groups(
            &mut entity,
            &[group("detail", &["id", "missing"])],
            &overlay(&log, StrategyOrigin::Directive, true),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnknownFetchGroupField { group, field, .. } if group == "detail" && field == "missing"
        ));
    }

    #[test]
    fn fetch_group_rejects_transient_members_and_bad_names() {
        let log = DiagnosticLog::new();
        let replace = overlay(&log, StrategyOrigin::Directive, true);
        let mut entity = order();
        assert!(add_fetch_groups(&mut entity, &[group("g", &["cache"])], &replace).is_err());
        assert!(add_fetch_groups(&mut entity, &[group("", &["id"])], &replace).is_err());
        assert!(add_fetch_groups(&mut entity, &[group("g", &["id"]), group("g", &["id"])], &replace).is_err());
        assert!(add_fetch_groups(&mut entity, &[group("default", &["id"])], &replace).is_err());
    }

    #[test]
    fn includes_must_exist() {
        let log = DiagnosticLog::new();
        let mut entity = order();
        let mut detail = group("detail", &["id"]);
        detail.includes = vec!["summary".into()];
        add_fetch_groups(&mut entity, &[detail], &overlay(&log, StrategyOrigin::Directive, true)).unwrap();
        let config = ResolverConfig::default();
        assert!(matches!(
            validate_fetch_groups(&entity, &config),
            Err(ResolveError::InvalidFetchGroup { .. })
        ));
        assert!(validate_fetch_groups(&entity, &config.with_fetch_group_include_validation(false)).is_ok());
    }

    #[test]
    fn map_key_checked_against_element_members() {
        let table = DeclarationTable::new()
            .with_type(
                TypeDecl::new("shop.LineItem")
                    .with_directive(DirectiveTag::new("entity"))
                    .with_field(MemberDecl::new("sku", ValueType::Text)),
            )
            .unwrap();
        let field = FieldDescriptor::new(
            "lines",
            0,
            ValueType::map(ValueType::Text, ValueType::object("shop.LineItem")),
        );
        assert!(check_map_key("Order", &field, "sku", &table).is_ok());
        assert!(matches!(
            check_map_key("Order", &field, "nope", &table),
            Err(ResolveError::UnknownMapKey { key, .. }) if key == "nope"
        ));
    }
}
