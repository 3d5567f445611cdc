//! Declaration tables
//!
//! A [`DeclarationTable`] is the once-built, stable description of the program
//! types the engine may resolve: their members, supertypes and the directive
//! tags attached to each element. Parsers consult it through the
//! [`TypeIntrospector`] trait.
//!
//! Tables are assembled with the builder methods or loaded from JSON/YAML:
//!
//! ```yaml
//! packages:
//!   - name: shop
//!     directives: [{ name: sequence-generator, attrs: { name: order_seq } }]
//! types:
//!   - name: shop.Order
//!     directives: [entity]
//!     fields:
//!       - { name: id, type: long, directives: [id] }
//! ```

use crate::directive::DirectiveTag;
use crate::error::ModelError;
use crate::value::ValueType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Shape of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
}

/// Package-scope directives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDecl {
    pub name: String,
    #[serde(default)]
    pub directives: Vec<DirectiveTag>,
}

impl PackageDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_directive(mut self, tag: DirectiveTag) -> Self {
        self.directives.push(tag);
        self
    }
}

/// A declared data member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub is_static: bool,
    /// Language-level transient keyword
    #[serde(default)]
    pub is_transient: bool,
    #[serde(default)]
    pub directives: Vec<DirectiveTag>,
}

impl MemberDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            is_static: false,
            is_transient: false,
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_directive(mut self, tag: DirectiveTag) -> Self {
        self.directives.push(tag);
        self
    }

    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_transient(mut self) -> Self {
        self.is_transient = true;
        self
    }
}

/// A declared method; only directives and parameter shape matter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveTag>,
}

impl MethodDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_directive(mut self, tag: DirectiveTag) -> Self {
        self.directives.push(tag);
        self
    }
}

/// A declared program type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Qualified name
    pub name: String,
    /// Owning package; derived from the qualified name when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supertype: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub serializable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveTag>,
    #[serde(default)]
    pub fields: Vec<MemberDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

impl TypeDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            supertype: None,
            kind: TypeKind::Class,
            is_abstract: false,
            serializable: false,
            source_file: None,
            directives: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    #[must_use]
    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn with_serializable(mut self) -> Self {
        self.serializable = true;
        self
    }

    #[must_use]
    pub fn with_source_file(mut self, file: impl Into<String>) -> Self {
        self.source_file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_directive(mut self, tag: DirectiveTag) -> Self {
        self.directives.push(tag);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: MemberDecl) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Package name, explicit or derived from the qualified name
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        self.package
            .as_deref()
            .or_else(|| self.name.rsplit_once('.').map(|(pkg, _)| pkg))
    }

    /// Whether a directive with this name is attached to the type
    #[must_use]
    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.iter().any(|tag| tag.name == name)
    }

    /// Carries one of the root persistence markers
    #[must_use]
    pub fn is_persistent_root(&self) -> bool {
        self.has_directive("entity")
            || self.has_directive("embeddable")
            || self.has_directive("mapped-superclass")
    }

    #[inline]
    #[must_use]
    pub fn is_embeddable(&self) -> bool {
        self.has_directive("embeddable")
    }

    /// Declared member by name
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&MemberDecl> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Type-introspection facility consulted by the parsers
pub trait TypeIntrospector: Send + Sync {
    /// Declared type by qualified name
    fn type_decl(&self, name: &str) -> Option<&TypeDecl>;

    /// Package declaration by name
    fn package_decl(&self, name: &str) -> Option<&PackageDecl>;

    /// Every declared type name, in declaration order
    fn type_names(&self) -> Vec<String>;

    /// Declared supertypes, most specific first
    ///
    /// Stops at the first undeclared supertype or cycle.
    fn supertypes(&self, name: &str) -> Vec<&TypeDecl> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut next = self.type_decl(name).and_then(|decl| decl.supertype.clone());
        while let Some(current) = next {
            if !seen.insert(current.clone()) {
                break;
            }
            let Some(decl) = self.type_decl(&current) else {
                break;
            };
            next = decl.supertype.clone();
            chain.push(decl);
        }
        chain
    }

    /// Whether `sub` is `sup` or declares it somewhere up its chain
    fn is_subtype_of(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.supertypes(sub).iter().any(|decl| decl.name == sup)
    }
}

#[derive(Deserialize)]
struct TableFile {
    #[serde(default)]
    packages: Vec<PackageDecl>,
    #[serde(default)]
    types: Vec<TypeDecl>,
}

/// Once-built table of declared packages and types
#[derive(Debug, Clone, Default)]
pub struct DeclarationTable {
    types: IndexMap<String, TypeDecl>,
    packages: IndexMap<String, PackageDecl>,
}

impl DeclarationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateDeclaration`] if the name is taken.
    pub fn add_type(&mut self, decl: TypeDecl) -> Result<(), ModelError> {
        if self.types.contains_key(&decl.name) {
            return Err(ModelError::DuplicateDeclaration(decl.name));
        }
        self.types.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Register package directives, merging with an existing declaration
    pub fn add_package(&mut self, decl: PackageDecl) {
        match self.packages.get_mut(&decl.name) {
            Some(existing) => existing.directives.extend(decl.directives),
            None => {
                self.packages.insert(decl.name.clone(), decl);
            }
        }
    }

    /// Builder-style [`add_type`](Self::add_type)
    ///
    /// # Errors
    ///
    /// Same as [`add_type`](Self::add_type).
    pub fn with_type(mut self, decl: TypeDecl) -> Result<Self, ModelError> {
        self.add_type(decl)?;
        Ok(self)
    }

    /// Builder-style [`add_package`](Self::add_package)
    #[must_use]
    pub fn with_package(mut self, decl: PackageDecl) -> Self {
        self.add_package(decl);
        self
    }

    /// Number of declared types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parse a table from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Syntax`] for malformed input and
    /// [`ModelError::DuplicateDeclaration`] for repeated type names.
    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let file: TableFile =
            serde_json::from_str(text).map_err(|e| ModelError::Syntax(e.to_string()))?;
        Self::from_file(file)
    }

    /// Parse a table from YAML text
    ///
    /// # Errors
    ///
    /// Same as [`from_json_str`](Self::from_json_str).
    pub fn from_yaml_str(text: &str) -> Result<Self, ModelError> {
        let file: TableFile =
            serde_yaml::from_str(text).map_err(|e| ModelError::Syntax(e.to_string()))?;
        Self::from_file(file)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Syntax`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Syntax(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    fn from_file(file: TableFile) -> Result<Self, ModelError> {
        let mut table = Self::new();
        for package in file.packages {
            table.add_package(package);
        }
        for decl in file.types {
            table.add_type(decl)?;
        }
        Ok(table)
    }
}

impl TypeIntrospector for DeclarationTable {
    fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    fn package_decl(&self, name: &str) -> Option<&PackageDecl> {
        self.packages.get(name)
    }

    fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DeclarationTable {
        DeclarationTable::new()
            .with_type(TypeDecl::new("shop.Base"))
            .unwrap()
            .with_type(TypeDecl::new("shop.Order").with_supertype("shop.Base"))
            .unwrap()
            .with_type(TypeDecl::new("shop.SpecialOrder").with_supertype("shop.Order"))
            .unwrap()
    }

    #[test]
    fn supertypes_most_specific_first() {
        let table = table();
        let names: Vec<_> = table
            .supertypes("shop.SpecialOrder")
            .into_iter()
            .map(|decl| decl.name.as_str())
            .collect();
        assert_eq!(names, ["shop.Order", "shop.Base"]);
        assert!(table.is_subtype_of("shop.SpecialOrder", "shop.Base"));
        assert!(!table.is_subtype_of("shop.Base", "shop.Order"));
    }

    #[test]
    fn supertype_cycle_terminates() {
        let table = DeclarationTable::new()
            .with_type(TypeDecl::new("A").with_supertype("B"))
            .unwrap()
            .with_type(TypeDecl::new("B").with_supertype("A"))
            .unwrap();
        assert_eq!(table.supertypes("A").len(), 1);
    }

    #[test]
    fn duplicate_type_rejected() {
        let err = table().with_type(TypeDecl::new("shop.Order")).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateDeclaration(name) if name == "shop.Order"));
    }

    #[test]
    fn package_derived_from_name() {
        assert_eq!(TypeDecl::new("shop.Order").package_name(), Some("shop"));
        assert_eq!(TypeDecl::new("Order").package_name(), None);
    }

    #[test]
    fn loads_yaml_table() {
        let yaml = r"
packages:
  - name: shop
    directives:
      - name: sequence-generator
        attrs: { name: order_seq }
types:
  - name: shop.Order
    directives: [entity]
    fields:
      - { name: id, type: long, directives: [id] }
      - name: items
        type: collection<shop.LineItem>
        directives:
          - name: one-to-many
            attrs: { cascade: [persist] }
    methods:
      - { name: touch, directives: [pre-persist] }
";
        let table = DeclarationTable::from_yaml_str(yaml).unwrap();
        let order = table.type_decl("shop.Order").unwrap();
        assert!(order.is_persistent_root());
        assert_eq!(order.fields.len(), 2);
        assert_eq!(order.fields[0].directives[0].name, "id");
        assert_eq!(order.methods[0].directives[0].name, "pre-persist");
        assert_eq!(table.package_decl("shop").unwrap().directives.len(), 1);
    }

    #[test]
    fn malformed_text_is_syntax_error() {
        let err = DeclarationTable::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ModelError::Syntax(_)));
    }
}
