use ormeta_core::{EngineConfig, EngineError, MetadataEngine};
use ormeta_model::{LifecycleEvent, MetadataSource, ResolutionModes, Strategy, StrategyOrigin};
use ormeta_parse::{ResolveError, ResolverConfig};
use ormeta_repository::DiagnosticCode;
use ormeta_test_utils::{shop_table, DEFAULT_LISTENERS, ORDER_OVERRIDE, SHOP_ORM};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;

fn engine(resolver: ResolverConfig) -> MetadataEngine {
    MetadataEngine::new(Arc::new(shop_table()), EngineConfig::default().with_resolver(resolver))
}

#[test]
fn test_document_layers_over_directives() {
    let engine = engine(ResolverConfig::default());
    engine.load_document("orm.yaml", SHOP_ORM).unwrap();
    let resolved = engine.resolve_all(ResolutionModes::ALL).unwrap();
    assert_eq!(resolved.len(), 4);

    let customer = engine.entity("shop.Customer").unwrap();
    assert!(customer.field("id").unwrap().primary_key);
    let name = customer.field("name").unwrap();
    assert_eq!(name.strategy, Some(Strategy::Basic));
    let column = name.column.as_ref().unwrap();
    assert_eq!(column.name.as_deref(), Some("FULL_NAME"));
    assert_eq!(column.length, Some(80));
    assert_eq!(customer.table.as_ref().unwrap().name.as_deref(), Some("CUSTOMERS"));
    assert_eq!(
        customer.modes_from(&MetadataSource::Document("orm.yaml".into())),
        ResolutionModes::ALL
    );

    let item = engine.entity("shop.LineItem").unwrap();
    assert_eq!(item.field("sku").unwrap().column.as_ref().unwrap().name.as_deref(), Some("SKU_CODE"));
    assert_eq!(item.field("order").unwrap().strategy, Some(Strategy::ManyToOne));

    let query = engine.query("Customer.byName").unwrap();
    assert_eq!(query.defining_type.as_deref(), Some("shop.Customer"));
    assert_eq!(query.source, MetadataSource::Document("orm.yaml".into()));
}

#[test]
fn test_without_override_mode_directives_win() {
    let engine = engine(ResolverConfig::default());
    engine.load_document("order.yaml", ORDER_OVERRIDE).unwrap();
    let order = engine.resolve("shop.Order", ResolutionModes::META).unwrap().unwrap();

    let customer = order.field("customer").unwrap();
    assert_eq!(customer.strategy, Some(Strategy::ManyToOne));
    assert_eq!(customer.strategy_origin, Some(StrategyOrigin::Directive));
    assert!(engine.diagnostics().count(DiagnosticCode::OverrideIgnored) >= 1);
}

#[test]
fn test_override_mode_lets_document_win() {
    let engine = engine(ResolverConfig::default().with_override_mode(true));
    engine.load_document("order.yaml", ORDER_OVERRIDE).unwrap();
    let order = engine.resolve("shop.Order", ResolutionModes::META).unwrap().unwrap();

    let customer = order.field("customer").unwrap();
    assert_eq!(customer.strategy, Some(Strategy::Basic));
    assert_eq!(customer.strategy_origin, Some(StrategyOrigin::Document));
    assert_eq!(customer.default_fetch_group, Some(false));
    // untouched fields keep their directive values
    assert_eq!(order.field("items").unwrap().strategy, Some(Strategy::OneToMany));
}

#[test]
fn test_default_listeners_reach_every_entity() {
    let engine = engine(ResolverConfig::default());
    engine.load_document("unit.yaml", DEFAULT_LISTENERS).unwrap();
    engine.resolve_all(ResolutionModes::META).unwrap();

    let names = |type_name: &str| -> Vec<String> {
        engine
            .callbacks_for(type_name, LifecycleEvent::PrePersist)
            .into_iter()
            .map(|cb| cb.method)
            .collect()
    };
    assert_eq!(names("shop.Customer"), ["stamp"]);
    assert_eq!(names("shop.Order"), ["check", "stamp", "touch", "stamp"]);
    assert!(engine.callbacks_for("shop.Customer", LifecycleEvent::PostLoad).is_empty());
}

#[test]
fn test_second_definition_of_a_type_is_dropped() {
    let engine = engine(ResolverConfig::default());
    engine.load_document("a.yaml", SHOP_ORM).unwrap();
    let second = engine.load_document("b.yaml", SHOP_ORM).unwrap();
    assert!(second.entities.is_empty());
    assert_eq!(engine.diagnostics().count(DiagnosticCode::DuplicateEntity), 2);

    assert!(matches!(
        engine.load_document("a.yaml", ORDER_OVERRIDE),
        Err(EngineError::Resolve(ResolveError::Document { .. }))
    ));
}

#[test]
fn test_document_file_round_trip_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orm.yaml");
    std::fs::File::create(&path)
        .and_then(|mut file| file.write_all(SHOP_ORM.as_bytes()))
        .unwrap();

    let engine = engine(ResolverConfig::default());
    let document = engine.load_document_file(&path).unwrap();
    assert_eq!(document.package.as_deref(), Some("shop"));

    let resolved = engine
        .resolve_document(&document.name, ResolutionModes::ALL)
        .unwrap();
    let names: Vec<_> = resolved.iter().map(|e| e.type_name.as_str()).collect();
    assert_eq!(names, ["shop.Customer", "shop.LineItem"]);
}

#[test]
fn test_malformed_document_reports_line() {
    let engine = engine(ResolverConfig::default());
    let text = "entities:\n  - class: shop.Order\n    attributes:\n      basic:\n        - { name: customer, fetch: sometimes }\n";
    match engine.load_document("bad.yaml", text) {
        Err(EngineError::Resolve(ResolveError::Document { document, line, .. })) => {
            assert_eq!(document, "bad.yaml");
            assert!(line.is_some());
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_missing_document_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(ResolverConfig::default());
    assert!(matches!(
        engine.load_document_file(&dir.path().join("absent.yaml")),
        Err(EngineError::Io { .. })
    ));
}
