//! Soft warnings are recorded in `ExtractInfo` and logged unless silenced.

mod common;

use common::*;
use shotalign::prelude::*;
use tracing_test::traced_test;

/// Waveform mapping where only `config01` is active.
fn single_active_registry() -> DeviceRegistry {
    let stream = StreamConfig::new(WAVEFORM_PATH, "Shot number")
        .with_field(FieldDescriptor::scalar("amplitude", ElementType::F64, "Amplitude"));
    let map = ControlMap::new("Waveform", ControlType::Waveform)
        .interleaved()
        .with_config("config01", stream.clone())
        .with_config("config02", stream.clone().inactive())
        .with_config("config03", stream.inactive());
    DeviceRegistry::new().with(map).unwrap()
}

#[test]
#[traced_test]
fn test_assumed_configuration_is_logged() {
    let store = store(vec![waveform_dataset(&[1, 2, 3])]);
    let registry = single_active_registry();

    let (table, info) = Extractor::new(&store, &registry)
        .extract(["Waveform"], vec![2i64], CoverageMode::Intersection)
        .unwrap();

    assert_eq!(table.column("amplitude").unwrap().values.as_f64().unwrap(), &[3.0]);
    assert_eq!(info.streams[0].configuration, "config01");
    assert_eq!(info.warnings.len(), 1);
    assert!(logs_contain("assuming active configuration 'config01'"));
}

#[test]
#[traced_test]
fn test_bool_fill_is_logged() {
    let store = store(vec![discharge_dataset(&[1, 2, 3])]);
    let registry = registry();

    Extractor::new(&store, &registry)
        .extract(["Discharge"], vec![3i64, 4], CoverageMode::Union)
        .unwrap();

    assert!(logs_contain("No NULL-fill available for field 'data_valid'"));
}

#[test]
#[traced_test]
fn test_undecodable_command_is_logged() {
    let dataset = MemoryDataset::builder(WAVEFORM_PATH)
        .field("Shot number", ElementType::U32, vec![1u32, 1, 1, 2, 2, 2])
        .field("Configuration name", ElementType::Text, [CONFIGS, CONFIGS].concat())
        .field("Command index", ElementType::I32, vec![0i32, 1, 2, 7, 1, 2])
        .field("Amplitude", ElementType::F64, vec![0.0; 6])
        .build()
        .unwrap();
    let store = store(vec![dataset]);
    let registry = registry();

    let (table, info) = Extractor::new(&store, &registry)
        .extract([("Waveform", "config01")], vec![1i64, 2], CoverageMode::Intersection)
        .unwrap();

    let command = table.column("command").unwrap();
    assert_eq!(command.valid, vec![true, false]);
    assert_eq!(command.element(0, 0), Some(Value::Text(COMMANDS[0])));
    assert_eq!(info.warnings.len(), 1);
    assert!(logs_contain("Command index 7 of field 'command'"));
}

#[test]
#[traced_test]
fn test_silent_extraction_still_records_warnings() {
    let store = store(vec![waveform_dataset(&[1, 2, 3])]);
    let registry = single_active_registry();
    let mut config = EngineConfig::default();
    config.extraction.silent = true;

    let (_, info) = Extractor::new(&store, &registry)
        .with_config(config)
        .extract(["Waveform"], vec![2i64], CoverageMode::Intersection)
        .unwrap();

    assert_eq!(info.warnings.len(), 1);
    assert!(info.warnings[0].contains("assuming active configuration"));
    assert!(!logs_contain("assuming active configuration"));
}
