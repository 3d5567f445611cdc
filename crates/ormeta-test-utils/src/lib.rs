//! Testing utilities for the ormeta workspace
//!
//! A small shop model (orders, line items, customers, an audited mapped
//! superclass and a listener) in declaration-table and document form.

#![allow(missing_docs)]

use ormeta_model::DeclarationTable;
use ormeta_parse::{DirectiveParser, DocumentParser, ResolverConfig};
use ormeta_repository::MetadataRepository;
use std::sync::Arc;

/// Declaration table of the shop model, YAML form
pub const SHOP_TYPES: &str = r#"
packages:
  - name: shop
    directives:
      - { name: sequence-generator, attrs: { name: order-seq, allocation-size: 10 } }
types:
  - name: shop.Auditable
    directives: [mapped-superclass]
    fields:
      - { name: version, type: int, directives: [version] }
    methods:
      - { name: touch, directives: [pre-persist] }
  - name: shop.Order
    supertype: shop.Auditable
    source_file: shop/Order.src
    directives:
      - entity
      - { name: entity-listeners, attrs: { value: [shop.AuditListener] } }
      - { name: named-query, attrs: { name: Order.open, query: "select o from Order o where o.open = true" } }
      - { name: fetch-group, attrs: { name: detail, attributes: [items, customer] } }
    fields:
      - name: id
        type: long
        directives: [id, { name: generated-value, attrs: { strategy: sequence, generator: order-seq } }]
      - { name: customer, type: shop.Customer, directives: [many-to-one] }
      - name: items
        type: list<shop.LineItem>
        directives: [{ name: one-to-many, attrs: { mapped-by: order, cascade: [all] } }]
      - { name: status, type: enum<shop.Status> }
      - { name: open, type: boolean }
      - { name: COUNTER, type: int, is_static: true }
    methods:
      - { name: check, directives: [pre-persist] }
  - name: shop.LineItem
    directives: [entity]
    fields:
      - { name: id, type: long, directives: [id] }
      - { name: order, type: shop.Order, directives: [many-to-one] }
      - { name: sku, type: text }
      - { name: quantity, type: int }
  - name: shop.Customer
    directives: [entity]
    fields:
      - { name: id, type: long, directives: [id] }
      - { name: name, type: text }
  - name: shop.Status
    kind: enum
  - name: shop.AuditListener
    methods:
      - { name: stamp, params: [object], directives: [pre-persist] }
  - name: shop.Helper
    fields:
      - { name: handle, type: shop.Opaque }
"#;

/// Override document renaming columns and adding a customer query
pub const SHOP_ORM: &str = "
package: shop
entities:
  - class: Customer
    table: { name: CUSTOMERS }
    attributes:
      basic:
        - { name: name, column: { name: FULL_NAME, length: 80 } }
    named-queries:
      - { name: Customer.byName, query: select c from Customer c order by c.name }
  - class: LineItem
    attributes:
      basic:
        - { name: sku, column: { name: SKU_CODE } }
";

/// Override document switching the customer relation to a plain value
pub const ORDER_OVERRIDE: &str = "
entities:
  - class: shop.Order
    attributes:
      basic:
        - { name: customer, fetch: lazy }
";

/// Document declaring a unit-wide default listener
pub const DEFAULT_LISTENERS: &str = "
persistence-unit-metadata:
  entity-listeners: [shop.AuditListener]
";

/// Parse [`SHOP_TYPES`]
///
/// # Panics
///
/// If the fixture no longer parses.
#[must_use]
pub fn shop_table() -> DeclarationTable {
    DeclarationTable::from_yaml_str(SHOP_TYPES).expect("shop fixture parses")
}

/// Document parser over the shop table with a fresh repository
#[must_use]
pub fn shop_parser(config: ResolverConfig) -> DocumentParser {
    DocumentParser::new(DirectiveParser::new(
        Arc::new(shop_table()),
        MetadataRepository::shared(),
        config,
    ))
}
