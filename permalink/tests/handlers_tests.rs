use permalink::handlers::*;
use permalink_core::catalog::CatalogSnapshot;
use permalink_core::config::Settings;
use permalink_core::data::{Database, Resolution};
use permalink_core::report::ReportFormat;
use permalink_engine::{EntityType, RedirectType, UrlRewrite};
use tempfile::TempDir;

const CATALOG: &str = r#"{
    "stores": [
        {"id": 1, "code": "en", "root_category_id": 2},
        {"id": 2, "code": "fr", "root_category_id": 2}
    ],
    "categories": [
        {"id": 1, "path": [], "url_key": "root"},
        {"id": 2, "path": [1], "url_key": "default-category"},
        {"id": 3, "path": [1, 2], "url_key": "men", "store_url_keys": {"2": "hommes"}},
        {"id": 4, "path": [1, 2, 3], "url_key": "shoes"}
    ],
    "products": [
        {"id": 123, "url_key": "shoe", "category_ids": [4]}
    ]
}"#;

fn catalog() -> CatalogSnapshot {
    CatalogSnapshot::from_json(CATALOG).unwrap()
}

#[test]
fn test_parse_report_format() {
    assert_eq!(parse_report_format("json").unwrap(), ReportFormat::Json);
    assert_eq!(parse_report_format("md").unwrap(), ReportFormat::Markdown);
    assert!(parse_report_format("html").is_err());
}

#[test]
fn test_initialize_creates_settings_and_database() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("permalink");

    let outcome = initialize(&config_dir, false).unwrap();

    assert!(outcome.settings_path.exists());
    assert!(Database::exists(&outcome.database_path));
    assert!(!outcome.database_replaced);

    let settings = Settings::load(&outcome.settings_path).unwrap();
    assert_eq!(settings.database, outcome.database_path);
    assert!(open_database(&settings).is_ok());
}

#[test]
fn test_initialize_keeps_data_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let outcome = initialize(temp_dir.path(), false).unwrap();
    Database::new(&outcome.database_path)
        .unwrap()
        .insert_rewrite(&UrlRewrite::generated(
            EntityType::Product,
            1,
            0,
            "shoe.html",
            "catalog/product/view/id/1",
        ))
        .unwrap();

    initialize(temp_dir.path(), false).unwrap();
    let db = Database::new(&outcome.database_path).unwrap();
    assert_eq!(db.count_rewrites().unwrap(), 1);

    let outcome = initialize(temp_dir.path(), true).unwrap();
    assert!(outcome.database_replaced);
    let db = Database::new(&outcome.database_path).unwrap();
    assert_eq!(db.count_rewrites().unwrap(), 0);
}

#[test]
fn test_open_database_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings {
        database: temp_dir.path().join("missing.db"),
        ..Settings::default()
    };

    let err = open_database(&settings).unwrap_err();
    assert!(err.to_string().contains("permalink init"));
}

#[test]
fn test_generate_product_for_every_store() {
    let generated = generate_for_catalog(
        &catalog(),
        GenerateTarget::Product(123),
        None,
        None,
        &Settings::default(),
    )
    .unwrap();

    let paths: Vec<_> = generated
        .rewrites
        .iter()
        .map(|r| (r.store_id, r.request_path.as_str()))
        .collect();
    assert!(paths.contains(&(0, "shoe.html")));
    assert!(paths.contains(&(1, "men/shoes/shoe.html")));
    assert!(paths.contains(&(2, "hommes/shoes/shoe.html")));
    assert!(generated.warnings.is_empty());
}

#[test]
fn test_generate_product_for_one_store() {
    let generated = generate_for_catalog(
        &catalog(),
        GenerateTarget::Product(123),
        Some(2),
        None,
        &Settings::default(),
    )
    .unwrap();

    assert!(generated.rewrites.iter().all(|r| r.store_id == 2));
    assert!(generated.rewrites.find(2, "shoe.html").is_some());
    assert!(generated.rewrites.find(2, "hommes/shoes/shoe.html").is_some());
}

#[test]
fn test_generate_category() {
    let generated = generate_for_catalog(
        &catalog(),
        GenerateTarget::Category(4),
        None,
        None,
        &Settings::default(),
    )
    .unwrap();

    assert!(generated.rewrites.find(1, "men/shoes.html").is_some());
    assert!(generated.rewrites.find(2, "hommes/shoes.html").is_some());
}

#[test]
fn test_generate_unknown_entity() {
    let err = generate_for_catalog(
        &catalog(),
        GenerateTarget::Product(999),
        None,
        None,
        &Settings::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("999"));
}

#[test]
fn test_format_resolution() {
    colored::control::set_override(false);
    let resolution = Resolution {
        request_path: "shoe.html".to_string(),
        store_id: 1,
        hops: vec![
            UrlRewrite::generated(EntityType::Product, 1, 0, "shoe.html", "sneaker.html")
                .with_redirect(RedirectType::Permanent),
            UrlRewrite::generated(
                EntityType::Product,
                1,
                0,
                "sneaker.html",
                "catalog/product/view/id/1",
            ),
        ],
        target_path: "catalog/product/view/id/1".to_string(),
        loop_detected: false,
    };

    let output = format_resolution(&resolution);
    assert!(output.contains("1. [store 0] shoe.html → sneaker.html (301, product 1)"));
    assert!(output.contains("2. [store 0] sneaker.html → catalog/product/view/id/1 (internal"));
    assert!(output.contains("Target: catalog/product/view/id/1"));
}

#[test]
fn test_resolve_defaults_to_global_store() {
    let db = Database::in_memory().unwrap();
    db.insert_rewrite(&UrlRewrite::generated(
        EntityType::Product,
        1,
        0,
        "shoe.html",
        "catalog/product/view/id/1",
    ))
    .unwrap();
    db.insert_rewrite(&UrlRewrite::generated(
        EntityType::Product,
        2,
        2,
        "botte.html",
        "catalog/product/view/id/2",
    ))
    .unwrap();

    let resolution = resolve_path(&db, "shoe.html", None).unwrap();
    assert_eq!(resolution.store_id, 0);
    assert_eq!(resolution.target_path, "catalog/product/view/id/1");

    let err = resolve_path(&db, "botte.html", None).unwrap_err();
    assert!(err.to_string().contains("store 0"));
    assert_eq!(
        resolve_path(&db, "botte.html", Some(2)).unwrap().target_path,
        "catalog/product/view/id/2"
    );
}
