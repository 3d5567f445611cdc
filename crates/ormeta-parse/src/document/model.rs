//! Override document tree
//!
//! The document is read into an immutable tree with serde_yaml (JSON is a
//! YAML subset) before any entity is touched. Element names are kebab-case
//! and unknown keys are rejected so typos surface as syntax errors with a
//! line number.
//!
//! ```yaml
//! package: shop
//! entities:
//!   - class: Order
//!     table: { name: ORDERS }
//!     attributes:
//!       id: [{ name: id }]
//!       one-to-many:
//!         - { name: items, target-entity: LineItem, cascade: [all] }
//!     callbacks: { pre-persist: validate }
//! ```

use crate::error::ResolveError;
use indexmap::IndexMap;
use ormeta_model::{
    BasicDirective, Cascades, ColumnMapping, Directive, EntityKind, EnumType, FetchAttribute,
    FetchGroupDirective, FetchType, GeneratedValue, LifecycleEvent, NamedQueryDirective,
    NullHandling, QueryLanguage, RelationDirective, ResolutionMode, SequenceGeneratorDirective,
    Strategy, TableMapping, TemporalKind,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Persistence-unit wide settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct UnitMetadata {
    /// Ignore in-code directives for every type in the document
    pub metadata_complete: bool,
    /// Default listeners applied to every entity not excluding them
    pub entity_listeners: Vec<ListenerElement>,
}

/// Listener reference: a bare class or a class with explicit callbacks
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListenerElement {
    Class(String),
    Detailed {
        class: String,
        #[serde(default)]
        callbacks: BTreeMap<LifecycleEvent, String>,
    },
}

impl ListenerElement {
    #[must_use]
    pub fn class(&self) -> &str {
        match self {
            Self::Class(class) | Self::Detailed { class, .. } => class,
        }
    }

    /// Explicit callbacks; empty means "collect from directives"
    #[must_use]
    pub fn callbacks(&self) -> Option<&BTreeMap<LifecycleEvent, String>> {
        match self {
            Self::Class(_) => None,
            Self::Detailed { callbacks, .. } => Some(callbacks).filter(|c| !c.is_empty()),
        }
    }
}

/// `sequence-generator` element
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SequenceElement {
    pub name: String,
    #[serde(default)]
    pub sequence_name: Option<String>,
    #[serde(default)]
    pub initial_value: Option<i64>,
    #[serde(default)]
    pub allocation_size: Option<i64>,
}

impl SequenceElement {
    #[must_use]
    pub fn to_directive(&self) -> SequenceGeneratorDirective {
        SequenceGeneratorDirective {
            name: self.name.clone(),
            sequence_name: self.sequence_name.clone(),
            initial_value: self.initial_value,
            allocation_size: self.allocation_size,
        }
    }
}

/// `named-query` / `named-native-query` element
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct QueryElement {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
    #[serde(default)]
    pub lock_mode: Option<String>,
    #[serde(default)]
    pub result_class: Option<String>,
}

impl QueryElement {
    #[must_use]
    pub fn to_directive(&self, language: QueryLanguage) -> NamedQueryDirective {
        NamedQueryDirective {
            name: self.name.clone(),
            query: self.query.clone(),
            language,
            hints: self.hints.clone(),
            lock_mode: self.lock_mode.clone(),
            result_type: self.result_class.clone(),
        }
    }
}

/// Field of a fetch group: a bare name or a name with recursion depth
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FetchAttributeElement {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, rename = "recursion-depth")]
        recursion_depth: Option<i32>,
    },
}

/// `fetch-group` element
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FetchGroupElement {
    pub name: String,
    #[serde(default)]
    pub post_load: bool,
    #[serde(default)]
    pub attributes: Vec<FetchAttributeElement>,
    #[serde(default)]
    pub fetch_groups: Vec<String>,
}

impl FetchGroupElement {
    #[must_use]
    pub fn to_directive(&self) -> FetchGroupDirective {
        FetchGroupDirective {
            name: self.name.clone(),
            post_load: self.post_load,
            attributes: self
                .attributes
                .iter()
                .map(|attribute| match attribute {
                    FetchAttributeElement::Name(name) => FetchAttribute {
                        name: name.clone(),
                        recursion_depth: None,
                    },
                    FetchAttributeElement::Detailed {
                        name,
                        recursion_depth,
                    } => FetchAttribute {
                        name: name.clone(),
                        recursion_depth: *recursion_depth,
                    },
                })
                .collect(),
            includes: self.fetch_groups.clone(),
        }
    }
}

/// Settings of one attribute
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AttributeElement {
    pub name: String,
    pub fetch: Option<FetchType>,
    pub optional: Option<bool>,
    pub cascade: Vec<String>,
    #[serde(alias = "target-class")]
    pub target_entity: Option<String>,
    pub mapped_by: Option<String>,
    pub order_by: Option<String>,
    pub map_key: Option<String>,
    pub lob: bool,
    pub temporal: Option<TemporalKind>,
    pub enumerated: Option<EnumType>,
    pub generated_value: Option<GeneratedValue>,
    pub load_fetch_group: Option<String>,
    pub null_value: Option<NullHandling>,
    pub column: Option<ColumnMapping>,
    pub join_column: Option<ColumnMapping>,
}

/// Which list an attribute appeared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Id,
    EmbeddedId,
    Basic,
    Version,
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
    ElementCollection,
    Embedded,
    Transient,
}

impl AttributeKind {
    /// Element name in the document
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::EmbeddedId => "embedded-id",
            Self::Basic => "basic",
            Self::Version => "version",
            Self::ManyToOne => "many-to-one",
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
            Self::ElementCollection => "element-collection",
            Self::Embedded => "embedded",
            Self::Transient => "transient",
        }
    }

    fn relation(self) -> Option<Strategy> {
        match self {
            Self::ManyToOne => Some(Strategy::ManyToOne),
            Self::OneToOne => Some(Strategy::OneToOne),
            Self::OneToMany => Some(Strategy::OneToMany),
            Self::ManyToMany => Some(Strategy::ManyToMany),
            Self::ElementCollection => Some(Strategy::ElementCollection),
            _ => None,
        }
    }
}

impl AttributeElement {
    /// Typed directives this element stands for, tagged with their phase
    ///
    /// `qualify` turns a possibly unqualified class name into a declared one.
    ///
    /// # Errors
    ///
    /// Returns the offending cascade name.
    pub fn directives(
        &self,
        kind: AttributeKind,
        qualify: impl Fn(&str) -> String,
    ) -> Result<Vec<(ResolutionMode, Directive)>, String> {
        let meta = |d| (ResolutionMode::Meta, d);
        let basic = || {
            Directive::Basic(BasicDirective {
                fetch: self.fetch,
                optional: self.optional,
            })
        };
        let mut out = Vec::new();
        match kind {
            AttributeKind::Id => {
                out.push(meta(basic()));
                out.push(meta(Directive::Id));
            }
            AttributeKind::EmbeddedId => out.push(meta(Directive::Embedded { primary_key: true })),
            AttributeKind::Basic => out.push(meta(basic())),
            AttributeKind::Version => {
                out.push(meta(basic()));
                out.push(meta(Directive::Version));
            }
            AttributeKind::Embedded => out.push(meta(Directive::Embedded { primary_key: false })),
            AttributeKind::Transient => out.push(meta(Directive::Transient)),
            AttributeKind::ManyToOne
            | AttributeKind::OneToOne
            | AttributeKind::OneToMany
            | AttributeKind::ManyToMany
            | AttributeKind::ElementCollection => {
                let cascades = Cascades::from_names(self.cascade.iter().map(String::as_str))?;
                let strategy = kind.relation().unwrap_or(Strategy::Basic);
                out.push(meta(Directive::Relation(RelationDirective {
                    strategy,
                    target: self.target_entity.as_deref().map(&qualify),
                    mapped_by: self.mapped_by.clone(),
                    fetch: self.fetch,
                    optional: self.optional,
                    cascades,
                    element_cascades: Cascades::default(),
                    key_cascades: Cascades::default(),
                })));
            }
        }
        if self.lob {
            out.push(meta(Directive::Lob));
        }
        if let Some(temporal) = self.temporal {
            out.push(meta(Directive::Temporal(temporal)));
        }
        if let Some(enumerated) = self.enumerated {
            out.push(meta(Directive::Enumerated(enumerated)));
        }
        if let Some(generated) = &self.generated_value {
            out.push(meta(Directive::GeneratedValue(generated.clone())));
        }
        if let Some(order_by) = &self.order_by {
            out.push(meta(Directive::OrderBy(order_by.clone())));
        }
        if let Some(map_key) = &self.map_key {
            out.push(meta(Directive::MapKey(Some(map_key.clone()))));
        }
        if let Some(group) = &self.load_fetch_group {
            out.push(meta(Directive::LoadFetchGroup(group.clone())));
        }
        if let Some(handling) = self.null_value {
            out.push(meta(Directive::NullValue(handling)));
        }
        if let Some(column) = &self.column {
            out.push((ResolutionMode::Mapping, Directive::Column(column.clone())));
        }
        if let Some(column) = &self.join_column {
            out.push((ResolutionMode::Mapping, Directive::JoinColumn(column.clone())));
        }
        Ok(out)
    }
}

/// Attribute lists of a type element
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Attributes {
    pub id: Vec<AttributeElement>,
    pub embedded_id: Vec<AttributeElement>,
    pub basic: Vec<AttributeElement>,
    pub version: Vec<AttributeElement>,
    pub many_to_one: Vec<AttributeElement>,
    pub one_to_one: Vec<AttributeElement>,
    pub one_to_many: Vec<AttributeElement>,
    pub many_to_many: Vec<AttributeElement>,
    pub element_collection: Vec<AttributeElement>,
    pub embedded: Vec<AttributeElement>,
    pub transient: Vec<AttributeElement>,
}

impl Attributes {
    /// Every attribute with the list it came from, in document order per list
    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, &AttributeElement)> {
        [
            (AttributeKind::Id, &self.id),
            (AttributeKind::EmbeddedId, &self.embedded_id),
            (AttributeKind::Basic, &self.basic),
            (AttributeKind::Version, &self.version),
            (AttributeKind::ManyToOne, &self.many_to_one),
            (AttributeKind::OneToOne, &self.one_to_one),
            (AttributeKind::OneToMany, &self.one_to_many),
            (AttributeKind::ManyToMany, &self.many_to_many),
            (AttributeKind::ElementCollection, &self.element_collection),
            (AttributeKind::Embedded, &self.embedded),
            (AttributeKind::Transient, &self.transient),
        ]
        .into_iter()
        .flat_map(|(kind, list)| list.iter().map(move |attribute| (kind, attribute)))
    }
}

/// `entities` / `embeddables` / `mapped-superclasses` element
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TypeElement {
    pub class: String,
    /// Entity alias
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata_complete: Option<bool>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub table: Option<TableMapping>,
    #[serde(default)]
    pub id_class: Option<String>,
    #[serde(default)]
    pub exclude_default_listeners: bool,
    #[serde(default)]
    pub exclude_superclass_listeners: bool,
    #[serde(default)]
    pub entity_listeners: Option<Vec<ListenerElement>>,
    #[serde(default)]
    pub callbacks: BTreeMap<LifecycleEvent, String>,
    #[serde(default)]
    pub sequence_generator: Option<SequenceElement>,
    #[serde(default)]
    pub named_queries: Vec<QueryElement>,
    #[serde(default)]
    pub named_native_queries: Vec<QueryElement>,
    #[serde(default)]
    pub fetch_groups: Vec<FetchGroupElement>,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct DocumentTree {
    persistence_unit_metadata: UnitMetadata,
    package: Option<String>,
    access: Option<String>,
    sequence_generators: Vec<SequenceElement>,
    named_queries: Vec<QueryElement>,
    named_native_queries: Vec<QueryElement>,
    entities: Vec<TypeElement>,
    embeddables: Vec<TypeElement>,
    mapped_superclasses: Vec<TypeElement>,
}

/// One type defined by a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntity {
    pub kind: EntityKind,
    pub element: TypeElement,
    /// Line of the element's `class:` entry
    pub line: Option<usize>,
}

/// Parsed, immutable override document
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDocument {
    pub name: String,
    pub package: Option<String>,
    pub access: Option<String>,
    pub unit: UnitMetadata,
    pub sequence_generators: Vec<SequenceElement>,
    pub named_queries: Vec<QueryElement>,
    pub named_native_queries: Vec<QueryElement>,
    /// Types by qualified name, in document order
    pub entities: IndexMap<String, DocumentEntity>,
}

impl OverrideDocument {
    /// Parse document text
    ///
    /// # Errors
    ///
    /// [`ResolveError::Document`] for syntax errors, unknown elements and
    /// types defined twice in the same document.
    pub fn parse(name: &str, text: &str) -> Result<Self, ResolveError> {
        let tree: DocumentTree = if text.trim().is_empty() {
            DocumentTree::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| {
                ResolveError::document(name, e.location().map(|l| l.line()), e.to_string())
            })?
        };
        let lines = class_lines(text);

        let mut document = Self {
            name: name.to_string(),
            package: tree.package,
            access: tree.access,
            unit: tree.persistence_unit_metadata,
            sequence_generators: tree.sequence_generators,
            named_queries: tree.named_queries,
            named_native_queries: tree.named_native_queries,
            entities: IndexMap::new(),
        };
        let groups = [
            (EntityKind::Entity, tree.entities),
            (EntityKind::Embeddable, tree.embeddables),
            (EntityKind::MappedSuperclass, tree.mapped_superclasses),
        ];
        for (kind, elements) in groups {
            for element in elements {
                let line = lines.get(element.class.as_str()).copied();
                let qualified = document.qualify(&element.class);
                if document.entities.contains_key(&qualified) {
                    return Err(ResolveError::document(
                        name,
                        line,
                        format!("type '{qualified}' is defined more than once"),
                    ));
                }
                document
                    .entities
                    .insert(qualified, DocumentEntity { kind, element, line });
            }
        }
        Ok(document)
    }

    /// Qualify a class name with the document package
    #[must_use]
    pub fn qualify(&self, class: &str) -> String {
        match &self.package {
            Some(package) if !class.contains('.') => format!("{package}.{class}"),
            _ => class.to_string(),
        }
    }

    /// Document-wide metadata-complete flag
    #[inline]
    #[must_use]
    pub fn metadata_complete(&self) -> bool {
        self.unit.metadata_complete
    }

    #[must_use]
    pub fn entity(&self, type_name: &str) -> Option<&DocumentEntity> {
        self.entities.get(type_name)
    }
}

/// First line of each `class:` entry
fn class_lines(text: &str) -> HashMap<&str, usize> {
    let mut lines = HashMap::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start().trim_start_matches("- ").trim_start();
        let Some(value) = trimmed.strip_prefix("class:") else {
            continue;
        };
        let value = value
            .split(" #")
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'');
        if !value.is_empty() {
            lines.entry(value).or_insert(index + 1);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDERS: &str = r"
package: shop
persistence-unit-metadata:
  entity-listeners: [shop.Audit]
sequence-generators:
  - { name: order-seq, allocation-size: 20 }
entities:
  - class: Order
    name: Purchase
    attributes:
      id:
        - name: id
          generated-value: { strategy: sequence, generator: order-seq }
      one-to-many:
        - { name: items, target-entity: LineItem, cascade: [persist, merge] }
    callbacks:
      pre-persist: validate
embeddables:
  - class: shop.Address
";

    #[test]
    fn parses_tree_with_lines_and_qualified_names() {
        let doc = OverrideDocument::parse("orm.yaml", ORDERS).unwrap();
        assert_eq!(doc.entities.keys().collect::<Vec<_>>(), ["shop.Order", "shop.Address"]);
        let order = doc.entity("shop.Order").unwrap();
        assert_eq!(order.kind, EntityKind::Entity);
        assert_eq!(order.line, Some(8));
        assert_eq!(order.element.name.as_deref(), Some("Purchase"));
        assert_eq!(order.element.callbacks[&LifecycleEvent::PrePersist], "validate");
        assert_eq!(doc.entity("shop.Address").unwrap().kind, EntityKind::Embeddable);
        assert_eq!(doc.unit.entity_listeners[0].class(), "shop.Audit");
        assert_eq!(doc.sequence_generators[0].to_directive().allocation_size, Some(20));
    }

    #[test]
    fn attributes_become_phased_directives() {
        let doc = OverrideDocument::parse("orm.yaml", ORDERS).unwrap();
        let order = &doc.entity("shop.Order").unwrap().element;
        let attributes: Vec<_> = order.attributes.iter().collect();
        assert_eq!(attributes.len(), 2);

        let (kind, items) = attributes[1];
        assert_eq!(kind, AttributeKind::OneToMany);
        let directives = items.directives(kind, |c| doc.qualify(c)).unwrap();
        let Directive::Relation(relation) = &directives[0].1 else {
            panic!("expected relation, got {directives:?}");
        };
        assert_eq!(relation.target.as_deref(), Some("shop.LineItem"));
        assert!(relation.cascades.persist && relation.cascades.merge && !relation.cascades.remove);

        let (kind, id) = attributes[0];
        let directives = id.directives(kind, |c| doc.qualify(c)).unwrap();
        assert!(directives.iter().all(|(mode, _)| *mode == ResolutionMode::Meta));
        assert!(directives.iter().any(|(_, d)| *d == Directive::Id));
    }

    #[test]
    fn unknown_element_reports_line() {
        let text = "entities:\n  - class: Order\n    tabel: { name: X }\n";
        let err = OverrideDocument::parse("bad.yaml", text).unwrap_err();
        match err {
            ResolveError::Document { document, line, message } => {
                assert_eq!(document, "bad.yaml");
                assert!(line.is_some());
                assert!(message.contains("tabel"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_type_in_one_document_fails() {
        let text = "entities:\n  - class: a.Order\nmapped-superclasses:\n  - class: a.Order\n";
        assert!(matches!(
            OverrideDocument::parse("dup.yaml", text),
            Err(ResolveError::Document { .. })
        ));
    }

    #[test]
    fn bad_cascade_name_is_returned() {
        let attribute = AttributeElement {
            name: "items".into(),
            cascade: vec!["explode".into()],
            ..Default::default()
        };
        assert_eq!(
            attribute.directives(AttributeKind::OneToMany, str::to_string).unwrap_err(),
            "explode"
        );
    }

    #[test]
    fn json_documents_are_accepted() {
        let text = r#"{"package": "shop", "entities": [{"class": "Order", "name": "Purchase"}]}"#;
        let doc = OverrideDocument::parse("orm.json", text).unwrap();
        assert_eq!(doc.entity("shop.Order").unwrap().element.name.as_deref(), Some("Purchase"));
    }

    proptest::proptest! {
        #[test]
        fn qualify_is_idempotent(package in "p[a-z]{0,7}", class in "[A-Z][a-zA-Z]{0,8}") {
            let text = format!("package: {package}\n");
            let doc = OverrideDocument::parse("p.yaml", &text).unwrap();
            let once = doc.qualify(&class);
            proptest::prop_assert_eq!(doc.qualify(&once), once.clone());
            proptest::prop_assert_eq!(once, format!("{package}.{class}"));
        }
    }

    #[test]
    fn empty_document_is_valid() {
        let doc = OverrideDocument::parse("empty.yaml", "  \n").unwrap();
        assert!(doc.entities.is_empty());
        assert!(!doc.metadata_complete());
    }
}
