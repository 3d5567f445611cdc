//! Field descriptors
//!
//! Provides [`FieldDescriptor`], one persistent member of an entity, together
//! with the strategy vocabulary and the per-value cascade settings.

use crate::value::{TemporalKind, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Semantic role assigned to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Scalar value stored directly
    Basic,
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
    /// Value object stored inline
    Embedded,
    /// Collection or map of non-entity values
    ElementCollection,
    /// Not persisted
    Transient,
}

impl Strategy {
    /// Single-valued relationship
    #[inline]
    #[must_use]
    pub fn is_to_one(self) -> bool {
        matches!(self, Self::ManyToOne | Self::OneToOne)
    }

    /// Multi-valued relationship
    #[inline]
    #[must_use]
    pub fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Anything referencing another managed type
    #[inline]
    #[must_use]
    pub fn is_relationship(self) -> bool {
        self.is_to_one() || self.is_to_many()
    }

    /// Whether values under this strategy are stored at all
    #[inline]
    #[must_use]
    pub fn is_persistent(self) -> bool {
        !matches!(self, Self::Transient)
    }

    /// Whether the field joins the default fetch group unless told otherwise
    #[must_use]
    pub fn default_eager(self) -> bool {
        match self {
            Self::Basic | Self::Embedded | Self::ManyToOne | Self::OneToOne => true,
            Self::OneToMany | Self::ManyToMany | Self::ElementCollection | Self::Transient => false,
        }
    }

    /// Stable kebab-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::ManyToOne => "many-to-one",
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
            Self::Embedded => "embedded",
            Self::ElementCollection => "element-collection",
            Self::Transient => "transient",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which layer assigned the current strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyOrigin {
    /// Default inference from the value type
    Inferred,
    /// In-code directive
    Directive,
    /// Override document
    Document,
}

/// Whether the engine manages a member at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Management {
    #[default]
    Persistent,
    /// Static or keyword-transient members
    None,
}

/// Eager or lazy loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchType {
    Eager,
    Lazy,
}

impl FetchType {
    /// Parse `eager` / `lazy`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "eager" => Some(Self::Eager),
            "lazy" => Some(Self::Lazy),
            _ => None,
        }
    }
}

/// How null values are treated on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullHandling {
    /// Nulls stored as-is
    #[default]
    None,
    /// Nulls replaced by the store default
    Default,
    /// Nulls rejected
    Exception,
}

impl NullHandling {
    /// Parse `none` / `default` / `exception`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "default" => Some(Self::Default),
            "exception" => Some(Self::Exception),
            _ => None,
        }
    }
}

/// Identifier generation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationType {
    Auto,
    Identity,
    Sequence,
    Table,
    Uuid,
}

impl GenerationType {
    /// Parse a kebab-case name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "identity" => Some(Self::Identity),
            "sequence" => Some(Self::Sequence),
            "table" => Some(Self::Table),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }
}

/// Generated value settings of a primary-key field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedValue {
    pub strategy: GenerationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

/// Storage form of an enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnumType {
    Ordinal,
    String,
}

/// Cascade flags of one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cascades {
    pub persist: bool,
    pub remove: bool,
    pub merge: bool,
    pub refresh: bool,
}

impl Cascades {
    /// Every operation cascades
    pub const ALL: Self = Self {
        persist: true,
        remove: true,
        merge: true,
        refresh: true,
    };

    /// Build from operation names (`persist`, `remove`, `merge`, `refresh`, `all`)
    ///
    /// Returns the first unknown name as the error.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let mut cascades = Self::default();
        for name in names {
            match name.to_ascii_lowercase().as_str() {
                "persist" => cascades.persist = true,
                "remove" => cascades.remove = true,
                "merge" => cascades.merge = true,
                "refresh" => cascades.refresh = true,
                "all" => cascades = Self::ALL,
                _ => return Err(name.to_string()),
            }
        }
        Ok(cascades)
    }

    /// Flags set in either
    #[inline]
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            persist: self.persist || other.persist,
            remove: self.remove || other.remove,
            merge: self.merge || other.merge,
            refresh: self.refresh || other.refresh,
        }
    }

    /// True when nothing cascades
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.persist || self.remove || self.merge || self.refresh)
    }
}

/// A field value, or the element/key of a container field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDescriptor {
    pub declared_type: ValueType,
    #[serde(default)]
    pub cascades: Cascades,
}

impl ValueDescriptor {
    /// Value of the given type with no cascades
    #[inline]
    #[must_use]
    pub fn new(declared_type: ValueType) -> Self {
        Self {
            declared_type,
            cascades: Cascades::default(),
        }
    }
}

/// Store column settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

/// One persistent member of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Declaration order within the owning type
    pub index: usize,
    pub management: Management,
    pub value: ValueDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ValueDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ValueDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_origin: Option<StrategyOrigin>,
    /// Must be true for every persistent field once resolution ends
    pub explicit: bool,
    pub primary_key: bool,
    pub version: bool,
    /// Explicit default-fetch-group membership; `None` follows the strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fetch_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_fetch_group: Option<String>,
    pub null_handling: NullHandling,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_key: Option<String>,
    pub lob: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerated: Option<EnumType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_column: Option<ColumnMapping>,
}

impl FieldDescriptor {
    /// Create field of the given declared type
    ///
    /// Container types get element (and, for maps, key) sub-descriptors.
    #[must_use]
    pub fn new(name: impl Into<String>, index: usize, declared_type: ValueType) -> Self {
        let element = declared_type.element().cloned().map(ValueDescriptor::new);
        let key = declared_type.key().cloned().map(ValueDescriptor::new);
        Self {
            name: name.into(),
            index,
            management: Management::Persistent,
            value: ValueDescriptor::new(declared_type),
            element,
            key,
            strategy: None,
            strategy_origin: None,
            explicit: false,
            primary_key: false,
            version: false,
            default_fetch_group: None,
            load_fetch_group: None,
            null_handling: NullHandling::None,
            generated: None,
            mapped_by: None,
            order_by: None,
            map_key: None,
            lob: false,
            enumerated: None,
            temporal: None,
            column: None,
            join_column: None,
        }
    }

    /// Declared type of the field value
    #[inline]
    #[must_use]
    pub fn declared_type(&self) -> &ValueType {
        &self.value.declared_type
    }

    /// Managed and not transient
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.management == Management::Persistent
            && self.strategy.map_or(true, Strategy::is_persistent)
    }

    /// Record a strategy and mark the field explicit
    pub fn assign_strategy(&mut self, strategy: Strategy, origin: StrategyOrigin) {
        self.strategy = Some(strategy);
        self.strategy_origin = Some(origin);
        self.explicit = true;
        if strategy == Strategy::Transient {
            self.management = Management::None;
        } else {
            self.management = Management::Persistent;
        }
    }

    /// Whether the strategy was set by a directive or document (not inferred)
    #[inline]
    #[must_use]
    pub fn has_declared_strategy(&self) -> bool {
        matches!(
            self.strategy_origin,
            Some(StrategyOrigin::Directive | StrategyOrigin::Document)
        )
    }

    /// Effective default-fetch-group membership
    #[must_use]
    pub fn in_default_fetch_group(&self) -> bool {
        if !self.is_persistent() {
            return false;
        }
        self.default_fetch_group
            .unwrap_or_else(|| self.strategy.map_or(false, Strategy::default_eager))
    }

    /// Retarget a relationship at another type
    ///
    /// For containers the element type changes; otherwise the value type.
    pub fn set_target_type(&mut self, target: &str) {
        let target = ValueType::object(target);
        match self.element.as_mut() {
            Some(element) => element.declared_type = target,
            None => self.value.declared_type = target,
        }
    }
}
