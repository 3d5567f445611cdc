//! Strategy catalog
//!
//! Static knowledge about directives and strategies:
//!
//! - [`DirectiveKind`]: every directive identifier the engine recognizes,
//!   with its [`DirectiveRole`], resolution phase and valid placements
//! - [`infer_strategy`]: default strategy for a field without a strategy
//!   directive, keyed on its value type
//! - [`strategy_accepts`]: structural compatibility between a strategy and a
//!   value shape

use crate::declaration::{TypeIntrospector, TypeKind};
use crate::field::Strategy;
use crate::lifecycle::LifecycleEvent;
use crate::mode::ResolutionMode;
use crate::value::ValueType;
use std::fmt::{self, Display, Formatter};

/// Semantic role of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveRole {
    /// Marks a type persistent (entity, embeddable, mapped superclass)
    Root,
    /// Type-level identity and state settings
    TypeSetting,
    /// Listener declarations and exclusions
    Listener,
    FetchGroup,
    Query,
    Sequence,
    /// Store mapping (tables, columns)
    Mapping,
    /// Assigns a non-relationship strategy
    Strategy,
    /// Assigns a relationship strategy
    Relationship,
    PrimaryKey,
    Version,
    /// Refines an already-assigned field strategy
    FieldRefinement,
    Lifecycle(LifecycleEvent),
    /// Recognized but has no meaning in this engine
    Unsupported,
}

/// Element kind a directive is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Package,
    Type,
    Field,
    Method,
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Package => "package",
            Self::Type => "type",
            Self::Field => "field",
            Self::Method => "method",
        })
    }
}

/// Recognized directive identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Entity,
    Embeddable,
    MappedSuperclass,
    IdClass,
    DataStoreId,
    DetachedState,
    EntityListeners,
    ExcludeDefaultListeners,
    ExcludeSuperclassListeners,
    FetchGroup,
    FetchGroups,
    NamedQuery,
    NamedQueries,
    NamedNativeQuery,
    SequenceGenerator,
    Table,
    SecondaryTable,
    Basic,
    Lob,
    Enumerated,
    Temporal,
    Id,
    EmbeddedId,
    GeneratedValue,
    Version,
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
    ElementCollection,
    Embedded,
    Transient,
    OrderBy,
    MapKey,
    LoadFetchGroup,
    NullValue,
    Column,
    JoinColumn,
    Lifecycle(LifecycleEvent),
    Access,
    FlushMode,
}

const NAMES: &[(&str, DirectiveKind)] = &[
    ("entity", DirectiveKind::Entity),
    ("embeddable", DirectiveKind::Embeddable),
    ("mapped-superclass", DirectiveKind::MappedSuperclass),
    ("id-class", DirectiveKind::IdClass),
    ("data-store-id", DirectiveKind::DataStoreId),
    ("detached-state", DirectiveKind::DetachedState),
    ("entity-listeners", DirectiveKind::EntityListeners),
    ("exclude-default-listeners", DirectiveKind::ExcludeDefaultListeners),
    ("exclude-superclass-listeners", DirectiveKind::ExcludeSuperclassListeners),
    ("fetch-group", DirectiveKind::FetchGroup),
    ("fetch-groups", DirectiveKind::FetchGroups),
    ("named-query", DirectiveKind::NamedQuery),
    ("named-queries", DirectiveKind::NamedQueries),
    ("named-native-query", DirectiveKind::NamedNativeQuery),
    ("sequence-generator", DirectiveKind::SequenceGenerator),
    ("table", DirectiveKind::Table),
    ("secondary-table", DirectiveKind::SecondaryTable),
    ("basic", DirectiveKind::Basic),
    ("lob", DirectiveKind::Lob),
    ("enumerated", DirectiveKind::Enumerated),
    ("temporal", DirectiveKind::Temporal),
    ("id", DirectiveKind::Id),
    ("embedded-id", DirectiveKind::EmbeddedId),
    ("generated-value", DirectiveKind::GeneratedValue),
    ("version", DirectiveKind::Version),
    ("many-to-one", DirectiveKind::ManyToOne),
    ("one-to-one", DirectiveKind::OneToOne),
    ("one-to-many", DirectiveKind::OneToMany),
    ("many-to-many", DirectiveKind::ManyToMany),
    ("element-collection", DirectiveKind::ElementCollection),
    ("embedded", DirectiveKind::Embedded),
    ("transient", DirectiveKind::Transient),
    ("order-by", DirectiveKind::OrderBy),
    ("map-key", DirectiveKind::MapKey),
    ("load-fetch-group", DirectiveKind::LoadFetchGroup),
    ("null-value", DirectiveKind::NullValue),
    ("column", DirectiveKind::Column),
    ("join-column", DirectiveKind::JoinColumn),
    ("pre-persist", DirectiveKind::Lifecycle(LifecycleEvent::PrePersist)),
    ("post-persist", DirectiveKind::Lifecycle(LifecycleEvent::PostPersist)),
    ("pre-remove", DirectiveKind::Lifecycle(LifecycleEvent::PreRemove)),
    ("post-remove", DirectiveKind::Lifecycle(LifecycleEvent::PostRemove)),
    ("pre-update", DirectiveKind::Lifecycle(LifecycleEvent::PreUpdate)),
    ("post-update", DirectiveKind::Lifecycle(LifecycleEvent::PostUpdate)),
    ("post-load", DirectiveKind::Lifecycle(LifecycleEvent::PostLoad)),
    ("access", DirectiveKind::Access),
    ("flush-mode", DirectiveKind::FlushMode),
];

impl DirectiveKind {
    /// Look up a directive by its kebab-case name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, kind)| *kind)
    }

    /// Every recognized kind with its name
    pub fn all() -> impl Iterator<Item = (&'static str, Self)> {
        NAMES.iter().copied()
    }

    /// Kebab-case name
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("unknown", |(name, _)| *name)
    }

    /// Semantic role
    #[must_use]
    pub fn role(self) -> DirectiveRole {
        match self {
            Self::Entity | Self::Embeddable | Self::MappedSuperclass => DirectiveRole::Root,
            Self::IdClass | Self::DataStoreId | Self::DetachedState => DirectiveRole::TypeSetting,
            Self::EntityListeners
            | Self::ExcludeDefaultListeners
            | Self::ExcludeSuperclassListeners => DirectiveRole::Listener,
            Self::FetchGroup | Self::FetchGroups => DirectiveRole::FetchGroup,
            Self::NamedQuery | Self::NamedQueries | Self::NamedNativeQuery => DirectiveRole::Query,
            Self::SequenceGenerator => DirectiveRole::Sequence,
            Self::Table | Self::Column | Self::JoinColumn => DirectiveRole::Mapping,
            Self::Basic | Self::Embedded | Self::EmbeddedId | Self::Transient => {
                DirectiveRole::Strategy
            }
            Self::ManyToOne
            | Self::OneToOne
            | Self::OneToMany
            | Self::ManyToMany
            | Self::ElementCollection => DirectiveRole::Relationship,
            Self::Id => DirectiveRole::PrimaryKey,
            Self::Version => DirectiveRole::Version,
            Self::Lob
            | Self::Enumerated
            | Self::Temporal
            | Self::GeneratedValue
            | Self::OrderBy
            | Self::MapKey
            | Self::LoadFetchGroup
            | Self::NullValue => DirectiveRole::FieldRefinement,
            Self::Lifecycle(event) => DirectiveRole::Lifecycle(event),
            Self::SecondaryTable | Self::Access | Self::FlushMode => DirectiveRole::Unsupported,
        }
    }

    /// Resolution phase the directive contributes to
    #[must_use]
    pub fn phase(self) -> ResolutionMode {
        match self.role() {
            DirectiveRole::Mapping => ResolutionMode::Mapping,
            DirectiveRole::Query => ResolutionMode::Query,
            DirectiveRole::Unsupported if self == Self::SecondaryTable => ResolutionMode::Mapping,
            _ => ResolutionMode::Meta,
        }
    }

    /// Strategy assigned by this directive, if it assigns one
    #[must_use]
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            Self::Basic => Some(Strategy::Basic),
            Self::ManyToOne => Some(Strategy::ManyToOne),
            Self::OneToOne => Some(Strategy::OneToOne),
            Self::OneToMany => Some(Strategy::OneToMany),
            Self::ManyToMany => Some(Strategy::ManyToMany),
            Self::ElementCollection => Some(Strategy::ElementCollection),
            Self::Embedded | Self::EmbeddedId => Some(Strategy::Embedded),
            Self::Transient => Some(Strategy::Transient),
            _ => None,
        }
    }

    /// Whether the directive may be attached to `placement`
    #[must_use]
    pub fn allowed_on(self, placement: Placement) -> bool {
        match self.role() {
            DirectiveRole::Unsupported => true,
            DirectiveRole::Root
            | DirectiveRole::TypeSetting
            | DirectiveRole::Listener
            | DirectiveRole::FetchGroup => placement == Placement::Type,
            DirectiveRole::Query => matches!(placement, Placement::Package | Placement::Type),
            DirectiveRole::Sequence => placement != Placement::Method,
            DirectiveRole::Mapping => match self {
                Self::Table => placement == Placement::Type,
                _ => placement == Placement::Field,
            },
            DirectiveRole::Strategy
            | DirectiveRole::Relationship
            | DirectiveRole::PrimaryKey
            | DirectiveRole::Version
            | DirectiveRole::FieldRefinement => placement == Placement::Field,
            DirectiveRole::Lifecycle(_) => placement == Placement::Method,
        }
    }
}

impl Display for DirectiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default strategy for a field with no strategy directive
///
/// Scalar for primitive-like, textual, temporal and arbitrary-precision
/// numeric values, enumerations and raw byte/char arrays; embedded for
/// embeddable value types; scalar for any other serializable type. Anything
/// else stays unresolved.
#[must_use]
pub fn infer_strategy(value_type: &ValueType, types: &dyn TypeIntrospector) -> Option<Strategy> {
    if value_type.is_primitive_like()
        || value_type.is_text()
        || value_type.is_temporal()
        || value_type.is_big_numeric()
        || value_type.is_raw_array()
    {
        return Some(Strategy::Basic);
    }
    match value_type {
        ValueType::Enum(_) => Some(Strategy::Basic),
        ValueType::Object(name) => {
            let decl = types.type_decl(name)?;
            if decl.kind == TypeKind::Enum {
                Some(Strategy::Basic)
            } else if decl.is_embeddable() {
                Some(Strategy::Embedded)
            } else if decl.serializable {
                Some(Strategy::Basic)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Whether a value of this shape can carry `strategy`
///
/// To-one and embedded need an object reference; to-many needs a container
/// of object references; element collections need any container.
#[must_use]
pub fn strategy_accepts(strategy: Strategy, value_type: &ValueType) -> bool {
    match strategy {
        Strategy::ManyToOne | Strategy::OneToOne | Strategy::Embedded => {
            matches!(value_type, ValueType::Object(_))
        }
        Strategy::OneToMany | Strategy::ManyToMany => value_type.is_container()
            && matches!(value_type.element(), Some(ValueType::Object(_))),
        Strategy::ElementCollection => value_type.is_container(),
        Strategy::Basic | Strategy::Transient => true,
    }
}
