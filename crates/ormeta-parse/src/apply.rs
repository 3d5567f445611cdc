//! Typed directive application
//!
//! Both parsers reduce their input to [`Directive`] values and apply them
//! here under an [`Overlay`]. Directives with repository side effects
//! (sequences, queries), deferred ones (fetch groups) and extension or
//! unsupported kinds are handled by the callers before reaching these
//! functions.

use crate::error::ResolveError;
use crate::structure::{check_map_key, check_version, Overlay};
use ormeta_model::{
    simple_name, Directive, EntityDescriptor, FetchType, FieldDescriptor, NullHandling,
    RelationDirective, Strategy, TypeIntrospector,
};

/// Apply a type-level directive
pub(crate) fn apply_type(
    overlay: &Overlay<'_>,
    entity: &mut EntityDescriptor,
    directive: &Directive,
) -> Result<(), ResolveError> {
    match directive {
        Directive::Entity { name } => {
            if let Some(name) = name {
                let default = simple_name(&entity.type_name);
                if overlay.replace || entity.alias == default {
                    entity.alias.clone_from(name);
                } else if entity.alias != *name {
                    let mut alias = Some(entity.alias.clone());
                    overlay.set("type", "name", &mut alias, name.clone());
                }
            }
        }
        Directive::Embeddable | Directive::MappedSuperclass => {}
        Directive::IdClass(class) => overlay.set("type", "id-class", &mut entity.id_class, class.clone()),
        Directive::DataStoreId(generated) => {
            entity.data_store_identity = true;
            overlay.set("type", "data-store-id", &mut entity.surrogate, generated.clone());
        }
        Directive::DetachedState(state) => entity.detached_state = state.clone(),
        Directive::EntityListeners(listeners) => {
            if overlay.replace || entity.listeners.is_empty() {
                entity.listeners.clone_from(listeners);
            } else if entity.listeners != *listeners {
                let mut current = Some(entity.listeners.clone());
                overlay.set("type", "entity-listeners", &mut current, listeners.clone());
            }
        }
        Directive::ExcludeDefaultListeners => entity.exclude_default_listeners = true,
        Directive::ExcludeSuperclassListeners => entity.exclude_superclass_listeners = true,
        Directive::Table(table) => overlay.set("type", "table", &mut entity.table, table.clone()),
        Directive::FetchGroups(_)
        | Directive::NamedQueries(_)
        | Directive::SequenceGenerator(_)
        | Directive::Basic(_)
        | Directive::Relation(_)
        | Directive::Embedded { .. }
        | Directive::Transient
        | Directive::Lob
        | Directive::Enumerated(_)
        | Directive::Temporal(_)
        | Directive::Id
        | Directive::GeneratedValue(_)
        | Directive::Version
        | Directive::OrderBy(_)
        | Directive::MapKey(_)
        | Directive::LoadFetchGroup(_)
        | Directive::NullValue(_)
        | Directive::Column(_)
        | Directive::JoinColumn(_)
        | Directive::Callback(_)
        | Directive::Unsupported(_)
        | Directive::Extension(_) => {
            return Err(ResolveError::unsupported(
                &entity.type_name,
                "type",
                directive_name(directive),
                "not applicable to a type",
            ))
        }
    }
    Ok(())
}

/// Apply a field-level directive to the named field
pub(crate) fn apply_field(
    overlay: &Overlay<'_>,
    types: &dyn TypeIntrospector,
    entity: &mut EntityDescriptor,
    field_name: &str,
    directive: &Directive,
) -> Result<(), ResolveError> {
    let entity_name = entity.type_name.clone();
    let Some(field) = entity.field_mut(field_name) else {
        return Err(ResolveError::unsupported(
            entity_name,
            field_name,
            directive_name(directive),
            "field is static or not declared",
        ));
    };
    let element = field_name;
    match directive {
        Directive::Basic(basic) => {
            if overlay.assign_strategy(field, Strategy::Basic, "basic")? {
                apply_fetch(overlay, field, basic.fetch);
                apply_optional(overlay, field, basic.optional);
            }
        }
        Directive::Relation(relation) => apply_relation(overlay, field, relation)?,
        Directive::Embedded { primary_key } => {
            let name = if *primary_key { "embedded-id" } else { "embedded" };
            if overlay.assign_strategy(field, Strategy::Embedded, name)? {
                field.primary_key |= *primary_key;
            }
        }
        Directive::Transient => {
            overlay.assign_strategy(field, Strategy::Transient, "transient")?;
        }
        Directive::Lob => field.lob = true,
        Directive::Enumerated(kind) => overlay.set(element, "enumerated", &mut field.enumerated, *kind),
        Directive::Temporal(kind) => {
            if !field.declared_type().is_temporal() {
                return Err(ResolveError::mismatch(&entity_name, element, "temporal", field.declared_type()));
            }
            overlay.set(element, "temporal", &mut field.temporal, *kind);
        }
        Directive::Id => field.primary_key = true,
        Directive::GeneratedValue(generated) => {
            overlay.set(element, "generated-value", &mut field.generated, generated.clone());
        }
        Directive::Version => {
            check_version(&entity_name, field)?;
            field.version = true;
        }
        Directive::OrderBy(order) => {
            if !field.declared_type().is_container() {
                return Err(ResolveError::mismatch(&entity_name, element, "order-by", field.declared_type()));
            }
            overlay.set(element, "order-by", &mut field.order_by, order.clone());
        }
        Directive::MapKey(key) => {
            if !field.declared_type().is_map() {
                return Err(ResolveError::mismatch(&entity_name, element, "map-key", field.declared_type()));
            }
            if let Some(key) = key {
                check_map_key(&entity_name, field, key, types)?;
                overlay.set(element, "map-key", &mut field.map_key, key.clone());
            }
        }
        Directive::LoadFetchGroup(group) => {
            overlay.set(element, "load-fetch-group", &mut field.load_fetch_group, group.clone());
        }
        Directive::NullValue(handling) => set_null_handling(overlay, field, *handling),
        Directive::Column(column) => overlay.set(element, "column", &mut field.column, column.clone()),
        Directive::JoinColumn(column) => {
            if !field.strategy.is_some_and(Strategy::is_relationship) {
                return Err(ResolveError::mismatch(&entity_name, element, "join-column", field.declared_type()));
            }
            overlay.set(element, "join-column", &mut field.join_column, column.clone());
        }
        Directive::Entity { .. }
        | Directive::Embeddable
        | Directive::MappedSuperclass
        | Directive::IdClass(_)
        | Directive::DataStoreId(_)
        | Directive::DetachedState(_)
        | Directive::EntityListeners(_)
        | Directive::ExcludeDefaultListeners
        | Directive::ExcludeSuperclassListeners
        | Directive::FetchGroups(_)
        | Directive::NamedQueries(_)
        | Directive::SequenceGenerator(_)
        | Directive::Table(_)
        | Directive::Callback(_)
        | Directive::Unsupported(_)
        | Directive::Extension(_) => {
            return Err(ResolveError::unsupported(
                entity_name,
                element,
                directive_name(directive),
                "not applicable to a field",
            ))
        }
    }
    Ok(())
}

fn apply_relation(
    overlay: &Overlay<'_>,
    field: &mut FieldDescriptor,
    relation: &RelationDirective,
) -> Result<(), ResolveError> {
    if let Some(target) = &relation.target {
        if overlay.replace || !field.has_declared_strategy() {
            field.set_target_type(target);
        }
    }
    if !overlay.assign_strategy(field, relation.strategy, relation.strategy.as_str())? {
        return Ok(());
    }
    if let Some(mapped_by) = &relation.mapped_by {
        overlay.set(&field.name.clone(), "mapped-by", &mut field.mapped_by, mapped_by.clone());
    }
    apply_fetch(overlay, field, relation.fetch);
    apply_optional(overlay, field, relation.optional);

    // cascades on a container field apply to its elements
    match field.element.as_mut() {
        Some(element) => {
            element.cascades = element
                .cascades
                .union(relation.cascades)
                .union(relation.element_cascades);
        }
        None => {
            if !relation.element_cascades.is_empty() || !relation.key_cascades.is_empty() {
                return Err(ResolveError::mismatch(
                    overlay.entity,
                    &field.name,
                    "element-cascade",
                    field.declared_type(),
                ));
            }
            field.value.cascades = field.value.cascades.union(relation.cascades);
        }
    }
    if !relation.key_cascades.is_empty() {
        let Some(key) = field.key.as_mut() else {
            return Err(ResolveError::mismatch(
                overlay.entity,
                &field.name,
                "key-cascade",
                field.declared_type(),
            ));
        };
        key.cascades = key.cascades.union(relation.key_cascades);
    }
    Ok(())
}

fn apply_fetch(overlay: &Overlay<'_>, field: &mut FieldDescriptor, fetch: Option<FetchType>) {
    if let Some(fetch) = fetch {
        let name = field.name.clone();
        overlay.set(&name, "fetch", &mut field.default_fetch_group, fetch == FetchType::Eager);
    }
}

fn apply_optional(overlay: &Overlay<'_>, field: &mut FieldDescriptor, optional: Option<bool>) {
    if optional == Some(false) {
        set_null_handling(overlay, field, NullHandling::Exception);
    }
}

fn set_null_handling(overlay: &Overlay<'_>, field: &mut FieldDescriptor, handling: NullHandling) {
    if overlay.replace || field.null_handling == NullHandling::None {
        field.null_handling = handling;
    } else if field.null_handling != handling {
        let mut current = Some(field.null_handling);
        let name = field.name.clone();
        overlay.set(&name, "null-value", &mut current, handling);
    }
}

/// Catalog name of a directive, for messages
pub(crate) fn directive_name(directive: &Directive) -> String {
    match directive {
        Directive::Entity { .. } => "entity".into(),
        Directive::Embeddable => "embeddable".into(),
        Directive::MappedSuperclass => "mapped-superclass".into(),
        Directive::IdClass(_) => "id-class".into(),
        Directive::DataStoreId(_) => "data-store-id".into(),
        Directive::DetachedState(_) => "detached-state".into(),
        Directive::EntityListeners(_) => "entity-listeners".into(),
        Directive::ExcludeDefaultListeners => "exclude-default-listeners".into(),
        Directive::ExcludeSuperclassListeners => "exclude-superclass-listeners".into(),
        Directive::FetchGroups(_) => "fetch-groups".into(),
        Directive::NamedQueries(_) => "named-queries".into(),
        Directive::SequenceGenerator(_) => "sequence-generator".into(),
        Directive::Table(_) => "table".into(),
        Directive::Basic(_) => "basic".into(),
        Directive::Relation(relation) => relation.strategy.to_string(),
        Directive::Embedded { primary_key: true } => "embedded-id".into(),
        Directive::Embedded { primary_key: false } => "embedded".into(),
        Directive::Transient => "transient".into(),
        Directive::Lob => "lob".into(),
        Directive::Enumerated(_) => "enumerated".into(),
        Directive::Temporal(_) => "temporal".into(),
        Directive::Id => "id".into(),
        Directive::GeneratedValue(_) => "generated-value".into(),
        Directive::Version => "version".into(),
        Directive::OrderBy(_) => "order-by".into(),
        Directive::MapKey(_) => "map-key".into(),
        Directive::LoadFetchGroup(_) => "load-fetch-group".into(),
        Directive::NullValue(_) => "null-value".into(),
        Directive::Column(_) => "column".into(),
        Directive::JoinColumn(_) => "join-column".into(),
        Directive::Callback(event) => event.to_string(),
        Directive::Unsupported(kind) => kind.to_string(),
        Directive::Extension(tag) => tag.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormeta_model::{
        Cascades, DeclarationTable, StrategyOrigin, TemporalKind, TypeDecl, ValueType,
    };
    use ormeta_repository::{DiagnosticCode, DiagnosticLog};

    fn entity() -> EntityDescriptor {
        let mut entity = EntityDescriptor::new("shop.Order");
        entity.add_field(FieldDescriptor::new("id", 0, ValueType::Long));
        entity.add_field(FieldDescriptor::new(
            "items",
            1,
            ValueType::collection(ValueType::object("shop.LineItem")),
        ));
        entity.add_field(FieldDescriptor::new("customer", 2, ValueType::object("shop.Customer")));
        entity.add_field(FieldDescriptor::new("placed", 3, ValueType::Temporal(TemporalKind::Timestamp)));
        entity
    }

    fn relation(strategy: Strategy) -> RelationDirective {
        RelationDirective {
            strategy,
            target: None,
            mapped_by: None,
            fetch: None,
            optional: None,
            cascades: Cascades::default(),
            element_cascades: Cascades::default(),
            key_cascades: Cascades::default(),
        }
    }

    fn directives(log: &DiagnosticLog) -> Overlay<'_> {
        Overlay {
            entity: "shop.Order",
            origin: StrategyOrigin::Directive,
            replace: true,
            diagnostics: log,
        }
    }

    #[test]
    fn to_many_cascades_land_on_elements() {
        let log = DiagnosticLog::new();
        let table = DeclarationTable::new();
        let mut entity = entity();
        let mut items = relation(Strategy::OneToMany);
        items.cascades = Cascades::ALL;
        items.mapped_by = Some("order".into());
        apply_field(&directives(&log), &table, &mut entity, "items", &Directive::Relation(items)).unwrap();
        let field = entity.field("items").unwrap();
        assert_eq!(field.strategy, Some(Strategy::OneToMany));
        assert_eq!(field.element.as_ref().unwrap().cascades, Cascades::ALL);
        assert!(field.value.cascades.is_empty());
        assert_eq!(field.mapped_by.as_deref(), Some("order"));
        assert!(!field.in_default_fetch_group());
    }

    #[test]
    fn to_one_with_optional_false_rejects_nulls() {
        let log = DiagnosticLog::new();
        let table = DeclarationTable::new();
        let mut entity = entity();
        let mut customer = relation(Strategy::ManyToOne);
        customer.optional = Some(false);
        customer.fetch = Some(FetchType::Lazy);
        apply_field(&directives(&log), &table, &mut entity, "customer", &Directive::Relation(customer)).unwrap();
        let field = entity.field("customer").unwrap();
        assert_eq!(field.null_handling, NullHandling::Exception);
        assert_eq!(field.default_fetch_group, Some(false));
    }

    #[test]
    fn target_entity_retargets_before_structural_check() {
        let log = DiagnosticLog::new();
        let table = DeclarationTable::new();
        let mut entity = EntityDescriptor::new("shop.Order");
        entity.add_field(FieldDescriptor::new("owner", 0, ValueType::Text));
        let mut owner = relation(Strategy::ManyToOne);
        owner.target = Some("shop.Customer".into());
        apply_field(&directives(&log), &table, &mut entity, "owner", &Directive::Relation(owner)).unwrap();
        assert_eq!(
            entity.field("owner").unwrap().declared_type(),
            &ValueType::object("shop.Customer")
        );
    }

    #[test]
    fn version_and_temporal_need_compatible_types() {
        let log = DiagnosticLog::new();
        let table = DeclarationTable::new();
        let mut entity = entity();
        let overlay = directives(&log);
        apply_field(&overlay, &table, &mut entity, "placed", &Directive::Version).unwrap();
        assert!(entity.field("placed").unwrap().version);
        assert!(matches!(
            apply_field(&overlay, &table, &mut entity, "customer", &Directive::Version),
            Err(ResolveError::StructuralMismatch { .. })
        ));
        assert!(apply_field(&overlay, &table, &mut entity, "id", &Directive::Temporal(TemporalKind::Date)).is_err());
    }

    #[test]
    fn join_column_requires_relationship() {
        let log = DiagnosticLog::new();
        let table = DeclarationTable::new();
        let mut entity = entity();
        let overlay = directives(&log);
        let column = ormeta_model::ColumnMapping {
            name: Some("CUSTOMER_ID".into()),
            ..Default::default()
        };
        assert!(apply_field(&overlay, &table, &mut entity, "id", &Directive::JoinColumn(column.clone())).is_err());
        apply_field(&overlay, &table, &mut entity, "customer", &Directive::Relation(relation(Strategy::ManyToOne)))
            .unwrap();
        apply_field(&overlay, &table, &mut entity, "customer", &Directive::JoinColumn(column)).unwrap();
        assert!(entity.field("customer").unwrap().join_column.is_some());
    }

    #[test]
    fn type_directives_respect_overlay() {
        let log = DiagnosticLog::new();
        let mut entity = EntityDescriptor::new("shop.Order");
        apply_type(&directives(&log), &mut entity, &Directive::Entity { name: Some("Purchase".into()) }).unwrap();
        assert_eq!(entity.alias, "Purchase");

        let additive = Overlay {
            entity: "shop.Order",
            origin: StrategyOrigin::Document,
            replace: false,
            diagnostics: &log,
        };
        apply_type(&additive, &mut entity, &Directive::Entity { name: Some("Sale".into()) }).unwrap();
        assert_eq!(entity.alias, "Purchase");
        assert_eq!(log.count(DiagnosticCode::OverrideIgnored), 1);
        assert!(apply_type(&additive, &mut entity, &Directive::Id).is_err());
    }

    #[test]
    fn map_key_checked_on_declared_elements() {
        let log = DiagnosticLog::new();
        let table = DeclarationTable::new()
            .with_type(TypeDecl::new("shop.LineItem"))
            .unwrap();
        let mut entity = EntityDescriptor::new("shop.Order");
        entity.add_field(FieldDescriptor::new(
            "bySku",
            0,
            ValueType::map(ValueType::Text, ValueType::object("shop.LineItem")),
        ));
        let err = apply_field(
            &directives(&log),
            &table,
            &mut entity,
            "bySku",
            &Directive::MapKey(Some("sku".into())),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownMapKey { field, .. } if field == "bySku"));
    }
}
