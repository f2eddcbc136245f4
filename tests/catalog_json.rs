use std::fs;

use autoguess::{CatalogIndex, DataLoadError, GuessEngine, ReasoningConfig, Value};

const CARS: &str = r#"[
    {"model": "Swift VXi", "brand": "Maruti", "body_type": "Hatchback", "fuel_type": "Petrol",
     "price_range": "under_10l", "luxury": "No", "engine_cc": 1197, "keywords": "city, compact"},
    {"model": "Nexon EV", "brand": "Tata", "body_type": "SUV", "fuel_type": "Electric",
     "price_range": "10-20l", "luxury": false, "engine_cc": "", "keywords": null},
    {"model": "Esteem LX [1994-2008]", "brand": "Maruti", "body_type": "Sedan", "fuel_type": "Petrol",
     "price_range": "under_10l", "luxury": "no", "engine_cc": 1298},
    {"model": "Fortuner Legender", "brand": "Toyota", "body_type": "SUV", "fuel_type": "Diesel",
     "price_range": "above_30l", "luxury": "no", "engine_cc": 2755, "era": "Current"}
]"#;

#[test]
fn loads_catalog_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cars.json");
    fs::write(&path, CARS).unwrap();

    let catalog = CatalogIndex::from_json_path(&path).unwrap();
    assert_eq!(catalog.len(), 4);

    let nexon = catalog.get_frame(catalog.find_model("nexon ev").unwrap()).unwrap();
    assert_eq!(nexon.get("engine_cc"), Some(&Value::Int(0)));
    assert_eq!(nexon.get("persona"), Some(&Value::from("eco")));
    assert_eq!(nexon.get("drive_context"), Some(&Value::from("urban")));
    assert_eq!(nexon.keywords, "");

    let esteem = catalog.find_model("Esteem LX [1994-2008]").unwrap();
    assert_eq!(catalog.describe_entity(esteem).unwrap().era.as_deref(), Some("classic"));

    let fortuner = catalog.find_model("fortuner legender").unwrap();
    let description = catalog.describe_entity(fortuner).unwrap();
    assert_eq!(description.era.as_deref(), Some("current"));
    assert_eq!(description.price_segment.as_deref(), Some("premium"));
    assert_eq!(description.engine_band.as_deref(), Some("performance"));
    assert_eq!(description.drive_context.as_deref(), Some("highway"));
}

#[test]
fn engine_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cars.json");
    fs::write(&path, CARS).unwrap();

    let engine = GuessEngine::from_json_path(&path, ReasoningConfig::default()).unwrap();
    let mut session = engine.start_session();
    assert!(session.next_question().is_some());
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match CatalogIndex::from_json_path(&path) {
        Err(DataLoadError::Io { path: reported, .. }) => assert!(reported.ends_with("absent.json")),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "[{\"model\": ").unwrap();
    assert!(matches!(
        CatalogIndex::from_json_path(&path),
        Err(DataLoadError::Parse { .. })
    ));
}

#[test]
fn missing_field_names_the_row() {
    let json = r#"[
        {"model": "A", "brand": "B", "body_type": "suv", "fuel_type": "petrol",
         "price_range": "10-20l", "luxury": "no", "engine_cc": 1500},
        {"model": "C", "brand": "D", "body_type": "suv", "fuel_type": "petrol",
         "price_range": "10-20l", "engine_cc": 1500}
    ]"#;
    match CatalogIndex::from_json_reader(json.as_bytes()) {
        Err(DataLoadError::MissingField { row, field }) => {
            assert_eq!(row, 1);
            assert_eq!(field, "luxury");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn empty_array_is_rejected() {
    let err = CatalogIndex::from_json_reader("[]".as_bytes()).unwrap_err();
    assert!(matches!(err, DataLoadError::EmptyCatalog));
    let err: autoguess::GuessError = err.into();
    assert!(err.is_fatal());
}
