//! Directives
//!
//! Raw [`DirectiveTag`]s are the key/value markers attached to packages, types,
//! fields and methods. [`Directive::from_tag`] coerces a tag into the typed
//! [`Directive`] sum type; parsers match on it exhaustively.
//!
//! Unknown tag names become [`Directive::Extension`] and are routed to an
//! overridable hook. Recognized kinds without meaning in this engine become
//! [`Directive::Unsupported`], which is always fatal.

use crate::catalog::DirectiveKind;
use crate::entity::{DetachedState, TableMapping};
use crate::error::ModelError;
use crate::field::{
    Cascades, ColumnMapping, EnumType, FetchType, GeneratedValue, GenerationType, NullHandling,
    Strategy,
};
use crate::lifecycle::LifecycleEvent;
use crate::query::QueryLanguage;
use crate::value::TemporalKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value of a directive tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, AttrValue>> for AttrValue {
    fn from(map: BTreeMap<String, AttrValue>) -> Self {
        Self::Map(map)
    }
}

/// Key/value-bearing marker attached to a declared element
///
/// Deserializes from either a bare name (`id`) or `{ name, attrs }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TagRepr")]
pub struct DirectiveTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        attrs: BTreeMap<String, AttrValue>,
    },
}

impl From<TagRepr> for DirectiveTag {
    fn from(repr: TagRepr) -> Self {
        match repr {
            TagRepr::Name(name) => Self::new(name),
            TagRepr::Full { name, attrs } => Self { name, attrs },
        }
    }
}

impl DirectiveTag {
    /// Tag without attributes
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Optional string attribute
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAttribute`] if present but not a string.
    pub fn str_attr(&self, key: &str) -> Result<Option<&str>, ModelError> {
        match self.attr(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| ModelError::invalid_attribute(&self.name, key, "a string")),
        }
    }

    /// Required string attribute
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingAttribute`] when absent.
    pub fn required_str(&self, key: &str) -> Result<&str, ModelError> {
        self.str_attr(key)?
            .ok_or_else(|| ModelError::missing_attribute(&self.name, key))
    }

    /// Optional boolean attribute
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAttribute`] if present but not a boolean.
    pub fn bool_attr(&self, key: &str) -> Result<Option<bool>, ModelError> {
        match self.attr(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| ModelError::invalid_attribute(&self.name, key, "a boolean")),
        }
    }

    /// Optional integer attribute
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAttribute`] if present but not an integer.
    pub fn int_attr(&self, key: &str) -> Result<Option<i64>, ModelError> {
        match self.attr(key) {
            None => Ok(None),
            Some(value) => value
                .as_int()
                .map(Some)
                .ok_or_else(|| ModelError::invalid_attribute(&self.name, key, "an integer")),
        }
    }

    /// String list attribute; a single string counts as a one-element list
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAttribute`] for any non-string entry.
    pub fn strings_attr(&self, key: &str) -> Result<Vec<String>, ModelError> {
        let invalid = || ModelError::invalid_attribute(&self.name, key, "a string or list of strings");
        match self.attr(key) {
            None => Ok(Vec::new()),
            Some(AttrValue::Str(s)) => Ok(vec![s.clone()]),
            Some(AttrValue::List(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect(),
            Some(_) => Err(invalid()),
        }
    }

    /// Nested tags from a map or list of maps; nested tags share this tag's name
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAttribute`] for any non-map entry.
    pub fn nested_attr(&self, key: &str) -> Result<Vec<DirectiveTag>, ModelError> {
        let invalid = || ModelError::invalid_attribute(&self.name, key, "a map or list of maps");
        let nest = |value: &AttrValue| match value {
            AttrValue::Map(attrs) => Ok(DirectiveTag {
                name: self.name.clone(),
                attrs: attrs.clone(),
            }),
            _ => Err(invalid()),
        };
        match self.attr(key) {
            None => Ok(Vec::new()),
            Some(AttrValue::List(items)) => items.iter().map(nest).collect(),
            Some(value) => Ok(vec![nest(value)?]),
        }
    }

    /// String attribute restricted to a vocabulary
    fn vocab_attr<T>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ModelError> {
        match self.str_attr(key)? {
            None => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .ok_or_else(|| ModelError::unknown_value(&self.name, key, value)),
        }
    }

    fn cascades_attr(&self, key: &str) -> Result<Cascades, ModelError> {
        let names = self.strings_attr(key)?;
        Cascades::from_names(names.iter().map(String::as_str))
            .map_err(|value| ModelError::unknown_value(&self.name, key, value))
    }

    fn u32_attr(&self, key: &str) -> Result<Option<u32>, ModelError> {
        match self.int_attr(key)? {
            None => Ok(None),
            Some(value) => u32::try_from(value)
                .map(Some)
                .map_err(|_| ModelError::invalid_attribute(&self.name, key, "a non-negative integer")),
        }
    }
}

/// Payload of relationship and element-collection directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDirective {
    pub strategy: Strategy,
    /// Explicit target type (`target-entity` / `target-class`)
    pub target: Option<String>,
    pub mapped_by: Option<String>,
    pub fetch: Option<FetchType>,
    pub optional: Option<bool>,
    pub cascades: Cascades,
    pub element_cascades: Cascades,
    pub key_cascades: Cascades,
}

/// Payload of `basic`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicDirective {
    pub fetch: Option<FetchType>,
    pub optional: Option<bool>,
}

/// One field reference inside a fetch group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttribute {
    pub name: String,
    pub recursion_depth: Option<i32>,
}

/// Payload of `fetch-group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchGroupDirective {
    pub name: String,
    pub post_load: bool,
    pub attributes: Vec<FetchAttribute>,
    pub includes: Vec<String>,
}

/// Payload of `named-query` / `named-native-query`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQueryDirective {
    pub name: String,
    pub query: String,
    pub language: QueryLanguage,
    pub hints: BTreeMap<String, String>,
    pub lock_mode: Option<String>,
    pub result_type: Option<String>,
}

/// Payload of `sequence-generator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGeneratorDirective {
    pub name: String,
    pub sequence_name: Option<String>,
    pub initial_value: Option<i64>,
    pub allocation_size: Option<i64>,
}

/// Typed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Entity { name: Option<String> },
    Embeddable,
    MappedSuperclass,
    IdClass(String),
    DataStoreId(GeneratedValue),
    DetachedState(DetachedState),
    EntityListeners(Vec<String>),
    ExcludeDefaultListeners,
    ExcludeSuperclassListeners,
    FetchGroups(Vec<FetchGroupDirective>),
    NamedQueries(Vec<NamedQueryDirective>),
    SequenceGenerator(SequenceGeneratorDirective),
    Table(TableMapping),
    Basic(BasicDirective),
    Relation(RelationDirective),
    /// `embedded`, or `embedded-id` when `primary_key` is set
    Embedded { primary_key: bool },
    Transient,
    Lob,
    Enumerated(EnumType),
    Temporal(TemporalKind),
    Id,
    GeneratedValue(GeneratedValue),
    Version,
    OrderBy(String),
    /// Key member of the map element; `None` keys by primary key
    MapKey(Option<String>),
    LoadFetchGroup(String),
    NullValue(NullHandling),
    Column(ColumnMapping),
    JoinColumn(ColumnMapping),
    Callback(LifecycleEvent),
    /// Recognized kind with no meaning here
    Unsupported(DirectiveKind),
    /// Unrecognized tag, handed to the extension hook
    Extension(DirectiveTag),
}

impl Directive {
    /// Coerce a raw tag
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when an attribute is missing, mistyped or
    /// outside its vocabulary.
    pub fn from_tag(tag: &DirectiveTag) -> Result<Self, ModelError> {
        let Some(kind) = DirectiveKind::from_name(&tag.name) else {
            return Ok(Self::Extension(tag.clone()));
        };
        let directive = match kind {
            DirectiveKind::Entity => Self::Entity {
                name: tag.str_attr("name")?.map(str::to_string),
            },
            DirectiveKind::Embeddable => Self::Embeddable,
            DirectiveKind::MappedSuperclass => Self::MappedSuperclass,
            DirectiveKind::IdClass => Self::IdClass(tag.required_str("value")?.to_string()),
            DirectiveKind::DataStoreId => Self::DataStoreId(generated_value(tag)?),
            DirectiveKind::DetachedState => Self::DetachedState(detached_state(tag)?),
            DirectiveKind::EntityListeners => Self::EntityListeners(tag.strings_attr("value")?),
            DirectiveKind::ExcludeDefaultListeners => Self::ExcludeDefaultListeners,
            DirectiveKind::ExcludeSuperclassListeners => Self::ExcludeSuperclassListeners,
            DirectiveKind::FetchGroup => Self::FetchGroups(vec![fetch_group(tag)?]),
            DirectiveKind::FetchGroups => Self::FetchGroups(
                tag.nested_attr("value")?
                    .iter()
                    .map(fetch_group)
                    .collect::<Result<_, _>>()?,
            ),
            DirectiveKind::NamedQuery => {
                Self::NamedQueries(vec![named_query(tag, QueryLanguage::Jpql)?])
            }
            DirectiveKind::NamedNativeQuery => {
                Self::NamedQueries(vec![named_query(tag, QueryLanguage::Sql)?])
            }
            DirectiveKind::NamedQueries => Self::NamedQueries(
                tag.nested_attr("value")?
                    .iter()
                    .map(|nested| named_query(nested, QueryLanguage::Jpql))
                    .collect::<Result<_, _>>()?,
            ),
            DirectiveKind::SequenceGenerator => {
                Self::SequenceGenerator(SequenceGeneratorDirective {
                    name: tag.required_str("name")?.to_string(),
                    sequence_name: tag.str_attr("sequence-name")?.map(str::to_string),
                    initial_value: tag.int_attr("initial-value")?,
                    allocation_size: tag.int_attr("allocation-size")?,
                })
            }
            DirectiveKind::Table => Self::Table(TableMapping {
                name: tag.str_attr("name")?.map(str::to_string),
                schema: tag.str_attr("schema")?.map(str::to_string),
            }),
            DirectiveKind::Basic => Self::Basic(BasicDirective {
                fetch: tag.vocab_attr("fetch", FetchType::from_name)?,
                optional: tag.bool_attr("optional")?,
            }),
            DirectiveKind::ManyToOne
            | DirectiveKind::OneToOne
            | DirectiveKind::OneToMany
            | DirectiveKind::ManyToMany
            | DirectiveKind::ElementCollection => {
                let strategy = kind
                    .strategy()
                    .ok_or_else(|| ModelError::Syntax(format!("'{kind}' assigns no strategy")))?;
                Self::Relation(relation(tag, strategy)?)
            }
            DirectiveKind::Embedded => Self::Embedded { primary_key: false },
            DirectiveKind::EmbeddedId => Self::Embedded { primary_key: true },
            DirectiveKind::Transient => Self::Transient,
            DirectiveKind::Lob => Self::Lob,
            DirectiveKind::Enumerated => Self::Enumerated(
                tag.vocab_attr("value", |v| match v.to_ascii_lowercase().as_str() {
                    "ordinal" => Some(EnumType::Ordinal),
                    "string" => Some(EnumType::String),
                    _ => None,
                })?
                .unwrap_or(EnumType::Ordinal),
            ),
            DirectiveKind::Temporal => Self::Temporal(
                tag.vocab_attr("value", TemporalKind::from_name)?
                    .ok_or_else(|| ModelError::missing_attribute(&tag.name, "value"))?,
            ),
            DirectiveKind::Id => Self::Id,
            DirectiveKind::GeneratedValue => Self::GeneratedValue(generated_value(tag)?),
            DirectiveKind::Version => Self::Version,
            DirectiveKind::OrderBy => {
                Self::OrderBy(tag.str_attr("value")?.unwrap_or_default().to_string())
            }
            DirectiveKind::MapKey => Self::MapKey(tag.str_attr("name")?.map(str::to_string)),
            DirectiveKind::LoadFetchGroup => {
                Self::LoadFetchGroup(tag.required_str("value")?.to_string())
            }
            DirectiveKind::NullValue => Self::NullValue(
                tag.vocab_attr("value", NullHandling::from_name)?
                    .ok_or_else(|| ModelError::missing_attribute(&tag.name, "value"))?,
            ),
            DirectiveKind::Column => Self::Column(column(tag)?),
            DirectiveKind::JoinColumn => Self::JoinColumn(column(tag)?),
            DirectiveKind::Lifecycle(event) => Self::Callback(event),
            DirectiveKind::SecondaryTable | DirectiveKind::Access | DirectiveKind::FlushMode => {
                Self::Unsupported(kind)
            }
        };
        Ok(directive)
    }
}

fn generated_value(tag: &DirectiveTag) -> Result<GeneratedValue, ModelError> {
    Ok(GeneratedValue {
        strategy: tag
            .vocab_attr("strategy", GenerationType::from_name)?
            .unwrap_or(GenerationType::Auto),
        generator: tag.str_attr("generator")?.map(str::to_string),
    })
}

fn detached_state(tag: &DirectiveTag) -> Result<DetachedState, ModelError> {
    if tag.bool_attr("enabled")? == Some(false) {
        return Ok(DetachedState::Disabled);
    }
    Ok(match tag.str_attr("field")? {
        Some(field) => DetachedState::Field(field.to_string()),
        None => DetachedState::Synthetic,
    })
}

fn fetch_group(tag: &DirectiveTag) -> Result<FetchGroupDirective, ModelError> {
    let mut attributes = Vec::new();
    match tag.attr("attributes") {
        None => {}
        Some(AttrValue::List(items)) => {
            for item in items {
                attributes.push(fetch_attribute(tag, item)?);
            }
        }
        Some(item) => attributes.push(fetch_attribute(tag, item)?),
    }
    Ok(FetchGroupDirective {
        name: tag.str_attr("name")?.unwrap_or_default().to_string(),
        post_load: tag.bool_attr("post-load")?.unwrap_or(false),
        attributes,
        includes: tag.strings_attr("fetch-groups")?,
    })
}

fn fetch_attribute(tag: &DirectiveTag, item: &AttrValue) -> Result<FetchAttribute, ModelError> {
    let invalid =
        || ModelError::invalid_attribute(&tag.name, "attributes", "field names or { name, recursion-depth } maps");
    match item {
        AttrValue::Str(name) => Ok(FetchAttribute {
            name: name.clone(),
            recursion_depth: None,
        }),
        AttrValue::Map(map) => {
            let name = map.get("name").and_then(AttrValue::as_str).ok_or_else(invalid)?;
            let recursion_depth = match map.get("recursion-depth") {
                None => None,
                Some(depth) => Some(
                    depth
                        .as_int()
                        .and_then(|d| i32::try_from(d).ok())
                        .ok_or_else(invalid)?,
                ),
            };
            Ok(FetchAttribute {
                name: name.to_string(),
                recursion_depth,
            })
        }
        _ => Err(invalid()),
    }
}

fn named_query(tag: &DirectiveTag, language: QueryLanguage) -> Result<NamedQueryDirective, ModelError> {
    let mut hints = BTreeMap::new();
    match tag.attr("hints") {
        None => {}
        Some(AttrValue::Map(map)) => {
            for (key, value) in map {
                let value = match value {
                    AttrValue::Str(s) => s.clone(),
                    AttrValue::Int(i) => i.to_string(),
                    AttrValue::Bool(b) => b.to_string(),
                    _ => return Err(ModelError::invalid_attribute(&tag.name, "hints", "a map of scalars")),
                };
                hints.insert(key.clone(), value);
            }
        }
        Some(_) => return Err(ModelError::invalid_attribute(&tag.name, "hints", "a map of scalars")),
    }
    Ok(NamedQueryDirective {
        name: tag.required_str("name")?.to_string(),
        query: tag.required_str("query")?.to_string(),
        language,
        hints,
        lock_mode: tag.str_attr("lock-mode")?.map(str::to_string),
        result_type: tag.str_attr("result-class")?.map(str::to_string),
    })
}

fn relation(tag: &DirectiveTag, strategy: Strategy) -> Result<RelationDirective, ModelError> {
    let target = match tag.str_attr("target-entity")? {
        Some(target) => Some(target),
        None => tag.str_attr("target-class")?,
    };
    Ok(RelationDirective {
        strategy,
        target: target.map(str::to_string),
        mapped_by: tag.str_attr("mapped-by")?.map(str::to_string),
        fetch: tag.vocab_attr("fetch", FetchType::from_name)?,
        optional: tag.bool_attr("optional")?,
        cascades: tag.cascades_attr("cascade")?,
        element_cascades: tag.cascades_attr("element-cascade")?,
        key_cascades: tag.cascades_attr("key-cascade")?,
    })
}

fn column(tag: &DirectiveTag) -> Result<ColumnMapping, ModelError> {
    Ok(ColumnMapping {
        name: tag.str_attr("name")?.map(str::to_string),
        nullable: tag.bool_attr("nullable")?,
        length: tag.u32_attr("length")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_become_extensions() {
        let tag = DirectiveTag::new("audited").with("level", "full");
        assert_eq!(Directive::from_tag(&tag).unwrap(), Directive::Extension(tag));
    }

    #[test]
    fn unsupported_kinds_are_typed() {
        let tag = DirectiveTag::new("secondary-table");
        assert_eq!(
            Directive::from_tag(&tag).unwrap(),
            Directive::Unsupported(DirectiveKind::SecondaryTable)
        );
    }

    #[test]
    fn relation_payload() {
        let tag = DirectiveTag::new("one-to-many")
            .with("mapped-by", "order")
            .with("cascade", vec!["persist", "remove"])
            .with("fetch", "eager");
        let Directive::Relation(relation) = Directive::from_tag(&tag).unwrap() else {
            panic!("expected relation");
        };
        assert_eq!(relation.strategy, Strategy::OneToMany);
        assert_eq!(relation.mapped_by.as_deref(), Some("order"));
        assert!(relation.cascades.persist && relation.cascades.remove);
        assert_eq!(relation.fetch, Some(FetchType::Eager));
    }

    #[test]
    fn bad_cascade_names_the_value() {
        let tag = DirectiveTag::new("many-to-one").with("cascade", "explode");
        let err = Directive::from_tag(&tag).unwrap_err();
        assert!(matches!(err, ModelError::UnknownValue { value, .. } if value == "explode"));
    }

    #[test]
    fn named_query_requires_query() {
        let tag = DirectiveTag::new("named-query").with("name", "Order.all");
        let err = Directive::from_tag(&tag).unwrap_err();
        assert!(matches!(err, ModelError::MissingAttribute { attribute, .. } if attribute == "query"));
    }

    #[test]
    fn named_queries_nest() {
        let first: BTreeMap<String, AttrValue> = [
            ("name".to_string(), AttrValue::from("a")),
            ("query".to_string(), AttrValue::from("select a")),
        ]
        .into();
        let second: BTreeMap<String, AttrValue> = [
            ("name".to_string(), AttrValue::from("b")),
            ("query".to_string(), AttrValue::from("select b")),
        ]
        .into();
        let tag = DirectiveTag::new("named-queries").with("value", vec![first, second]);
        let Directive::NamedQueries(queries) = Directive::from_tag(&tag).unwrap() else {
            panic!("expected queries");
        };
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].name, "b");
        assert_eq!(queries[0].language, QueryLanguage::Jpql);
    }

    #[test]
    fn fetch_group_attributes_accept_both_forms() {
        let depth: BTreeMap<String, AttrValue> = [
            ("name".to_string(), AttrValue::from("items")),
            ("recursion-depth".to_string(), AttrValue::from(2_i64)),
        ]
        .into();
        let tag = DirectiveTag::new("fetch-group")
            .with("name", "detail")
            .with(
                "attributes",
                AttrValue::List(vec![AttrValue::from("customer"), AttrValue::Map(depth)]),
            )
            .with("fetch-groups", "summary");
        let Directive::FetchGroups(groups) = Directive::from_tag(&tag).unwrap() else {
            panic!("expected fetch groups");
        };
        let group = &groups[0];
        assert_eq!(group.attributes[0].name, "customer");
        assert_eq!(group.attributes[1].recursion_depth, Some(2));
        assert_eq!(group.includes, ["summary"]);
    }

    #[test]
    fn tags_deserialize_from_bare_names() {
        let tags: Vec<DirectiveTag> =
            serde_json::from_str(r#"["id", {"name": "column", "attrs": {"length": 40}}]"#).unwrap();
        assert_eq!(tags[0], DirectiveTag::new("id"));
        assert_eq!(tags[1].int_attr("length").unwrap(), Some(40));
    }

    #[test]
    fn negative_column_length_rejected() {
        let tag = DirectiveTag::new("column").with("length", -1_i64);
        assert!(matches!(
            Directive::from_tag(&tag).unwrap_err(),
            ModelError::InvalidAttribute { .. }
        ));
    }

    #[test]
    fn detached_state_modes() {
        let disabled = DirectiveTag::new("detached-state").with("enabled", false);
        assert_eq!(
            Directive::from_tag(&disabled).unwrap(),
            Directive::DetachedState(DetachedState::Disabled)
        );
        let field = DirectiveTag::new("detached-state").with("field", "state");
        assert_eq!(
            Directive::from_tag(&field).unwrap(),
            Directive::DetachedState(DetachedState::Field("state".into()))
        );
    }
}
