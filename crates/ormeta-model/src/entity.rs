//! Entity descriptors
//!
//! [`EntityDescriptor`] is the canonical structural description of one
//! persistent type. Parsers mutate it incrementally across resolution phases;
//! the repository never drops it within a session.

use crate::fetch_group::FetchGroup;
use crate::field::{FieldDescriptor, GeneratedValue};
use crate::lifecycle::LifecycleDescriptor;
use crate::mode::ResolutionModes;
use crate::source::{MetadataSource, SourceLocation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root marker a type was declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    #[default]
    Entity,
    /// Stored only inside owning entities
    Embeddable,
    /// Contributes state to subclasses but has no instances of its own
    MappedSuperclass,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Embeddable => "embeddable",
            Self::MappedSuperclass => "mapped-superclass",
        }
    }
}

/// How instances are identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityKind {
    /// No identity (embeddables, mapped superclasses)
    #[default]
    None,
    /// Store-assigned surrogate key
    Surrogate,
    /// Composite of primary-key fields
    Fields,
}

/// Detached-state tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetachedState {
    /// Engine-generated state field
    #[default]
    Synthetic,
    /// No detached state kept
    Disabled,
    /// State kept in the named declared field
    Field(String),
}

/// Member access style recorded from documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessType {
    Field,
    Property,
}

/// Primary store table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Modes one source has contributed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceModes {
    pub source: MetadataSource,
    pub modes: ResolutionModes,
}

/// Resolved description of one persistent type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub type_name: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub kind: EntityKind,
    pub is_abstract: bool,
    pub identity: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_class: Option<String>,
    /// Generation settings of a surrogate identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrogate: Option<GeneratedValue>,
    /// Forces surrogate identity even without primary-key fields
    pub data_store_identity: bool,
    pub detached_state: DetachedState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_superclass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessType>,
    /// Phases fully applied to this entity
    pub resolution_modes: ResolutionModes,
    /// Phases each source has contributed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_modes: Vec<SourceModes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub fields: IndexMap<String, FieldDescriptor>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fetch_groups: IndexMap<String, FetchGroup>,
    #[serde(default, skip_serializing_if = "LifecycleDescriptor::is_empty")]
    pub lifecycle: LifecycleDescriptor,
    /// Ordered listener types declared for this entity
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,
    pub exclude_default_listeners: bool,
    pub exclude_superclass_listeners: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableMapping>,
}

impl EntityDescriptor {
    /// Fresh, unresolved descriptor; the alias defaults to the simple name
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let alias = simple_name(&type_name).to_string();
        Self {
            type_name,
            alias,
            package: None,
            kind: EntityKind::Entity,
            is_abstract: false,
            identity: IdentityKind::None,
            id_class: None,
            surrogate: None,
            data_store_identity: false,
            detached_state: DetachedState::Synthetic,
            persistent_superclass: None,
            access: None,
            resolution_modes: ResolutionModes::NONE,
            source_modes: Vec::new(),
            location: None,
            fields: IndexMap::new(),
            fetch_groups: IndexMap::new(),
            lifecycle: LifecycleDescriptor::default(),
            listeners: Vec::new(),
            exclude_default_listeners: false,
            exclude_superclass_listeners: false,
            table: None,
        }
    }

    /// Stored only inside owning entities
    #[inline]
    #[must_use]
    pub fn embedded_only(&self) -> bool {
        self.kind == EntityKind::Embeddable
    }

    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    #[inline]
    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        self.fields.get_mut(name)
    }

    /// Insert a field unless one with the same name exists; returns it
    pub fn add_field(&mut self, field: FieldDescriptor) -> &mut FieldDescriptor {
        self.fields.entry(field.name.clone()).or_insert(field)
    }

    /// Primary-key fields in declaration order
    #[must_use]
    pub fn primary_key_fields(&self) -> Vec<&FieldDescriptor> {
        self.fields.values().filter(|f| f.primary_key).collect()
    }

    /// The version field, if declared
    #[must_use]
    pub fn version_field(&self) -> Option<&FieldDescriptor> {
        self.fields.values().find(|f| f.version)
    }

    /// Managed fields that still lack an explicit strategy
    #[must_use]
    pub fn unresolved_fields(&self) -> Vec<String> {
        self.fields
            .values()
            .filter(|f| f.management == crate::field::Management::Persistent && !f.explicit)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Modes already contributed by one source
    #[must_use]
    pub fn modes_from(&self, source: &MetadataSource) -> ResolutionModes {
        self.source_modes
            .iter()
            .find(|entry| &entry.source == source)
            .map_or(ResolutionModes::NONE, |entry| entry.modes)
    }

    /// Record modes contributed by a source
    pub fn record_source_modes(&mut self, source: &MetadataSource, modes: ResolutionModes) {
        match self.source_modes.iter_mut().find(|entry| &entry.source == source) {
            Some(entry) => entry.modes = entry.modes.union(modes),
            None => self.source_modes.push(SourceModes {
                source: source.clone(),
                modes,
            }),
        }
    }

    /// Document sources that already contributed any of `modes`
    pub fn documents_covering(&self, modes: ResolutionModes) -> impl Iterator<Item = &str> {
        self.source_modes.iter().filter_map(move |entry| match &entry.source {
            MetadataSource::Document(name) if entry.modes.intersects(modes) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Add `modes` to the resolved set; returns whether anything changed
    pub fn mark_resolved(&mut self, modes: ResolutionModes) -> bool {
        let before = self.resolution_modes;
        self.resolution_modes = before.union(modes);
        self.resolution_modes != before
    }

    /// Derive identity kind from the resolved fields
    pub fn finalize_identity(&mut self) {
        self.identity = if self.kind != EntityKind::Entity {
            IdentityKind::None
        } else if !self.data_store_identity && self.fields.values().any(|f| f.primary_key) {
            IdentityKind::Fields
        } else {
            IdentityKind::Surrogate
        };
    }
}

/// Last dotted segment of a qualified name
#[must_use]
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Strategy, StrategyOrigin};
    use crate::value::ValueType;

    fn order() -> EntityDescriptor {
        let mut entity = EntityDescriptor::new("shop.Order");
        entity.add_field(FieldDescriptor::new("id", 0, ValueType::Long));
        entity.add_field(FieldDescriptor::new(
            "items",
            1,
            ValueType::collection(ValueType::object("shop.LineItem")),
        ));
        entity
    }

    #[test]
    fn alias_is_simple_name() {
        assert_eq!(order().alias, "Order");
        assert_eq!(EntityDescriptor::new("Plain").alias, "Plain");
    }

    #[test]
    fn unresolved_fields_are_aggregated() {
        let mut entity = order();
        assert_eq!(entity.unresolved_fields(), ["id", "items"]);
        entity
            .field_mut("id")
            .unwrap()
            .assign_strategy(Strategy::Basic, StrategyOrigin::Inferred);
        assert_eq!(entity.unresolved_fields(), ["items"]);
    }

    #[test]
    fn add_field_keeps_existing() {
        let mut entity = order();
        entity.field_mut("id").unwrap().primary_key = true;
        entity.add_field(FieldDescriptor::new("id", 5, ValueType::Int));
        assert!(entity.field("id").unwrap().primary_key);
        assert_eq!(entity.fields.len(), 2);
    }

    #[test]
    fn source_modes_accumulate() {
        let mut entity = order();
        let doc = MetadataSource::Document("orm.yaml".into());
        entity.record_source_modes(&doc, ResolutionModes::META);
        entity.record_source_modes(&doc, ResolutionModes::QUERY);
        assert_eq!(entity.modes_from(&doc), ResolutionModes::META | ResolutionModes::QUERY);
        assert_eq!(entity.modes_from(&MetadataSource::Directives), ResolutionModes::NONE);
        assert_eq!(
            entity.documents_covering(ResolutionModes::META).collect::<Vec<_>>(),
            ["orm.yaml"]
        );
    }

    #[test]
    fn mark_resolved_reports_change() {
        let mut entity = order();
        assert!(entity.mark_resolved(ResolutionModes::META));
        assert!(!entity.mark_resolved(ResolutionModes::META));
    }

    #[test]
    fn identity_from_fields() {
        let mut entity = order();
        entity.finalize_identity();
        assert_eq!(entity.identity, IdentityKind::Surrogate);
        entity.field_mut("id").unwrap().primary_key = true;
        entity.finalize_identity();
        assert_eq!(entity.identity, IdentityKind::Fields);
        entity.kind = EntityKind::Embeddable;
        entity.finalize_identity();
        assert_eq!(entity.identity, IdentityKind::None);
    }
}
