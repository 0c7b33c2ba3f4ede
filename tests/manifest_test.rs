//! Registries built from TOML manifests on disk.

mod common;

use std::io::Write;

use common::*;
use shotalign::prelude::*;
use tempfile::NamedTempFile;

const MANIFEST: &str = r#"
[[controls]]
name = "Waveform"
control_type = "waveform"
one_config_per_dataset = false

[controls.configs.config01]
dataset_path = "/Raw data + config/Waveform/Run time list"
shotnum_field = "Shot number"

[[controls.configs.config01.fields]]
name = "command"
dtype = "text"
source_fields = ["Command index"]
command_list = ["FREQ 50000.0", "FREQ 80000.0", "FREQ 120000.0"]

[controls.configs.config02]
dataset_path = "/Raw data + config/Waveform/Run time list"
shotnum_field = "Shot number"
fields = []

[controls.configs.config03]
dataset_path = "/Raw data + config/Waveform/Run time list"
shotnum_field = "Shot number"
fields = []

[[msi]]
name = "Discharge"
aliases = ["discharge"]

[msi.stream]
dataset_path = "/MSI/Discharge/Discharge summary"
shotnum_field = "Shot number"

[[msi.stream.fields]]
name = "peak_current"
dtype = "f64"
source_fields = ["Peak current"]
"#;

fn manifest_file(text: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_extract_with_manifest_registry() -> anyhow::Result<()> {
    let file = manifest_file(MANIFEST)?;
    let registry = DeviceManifest::load_from(file.path())?.into_registry()?;
    assert_eq!(registry.device_names(), vec!["Waveform", "Discharge"]);

    let shots: Vec<u32> = (10..=14).collect();
    let store = store(vec![waveform_dataset(&shots), discharge_dataset(&shots)]);
    let (table, info) = Extractor::new(&store, &registry).extract(
        [("Waveform", "config01"), ("discharge", "default")],
        vec![11i64, 13, 20],
        CoverageMode::Intersection,
    )?;

    assert_eq!(table.shotnum(), &[11, 13]);
    assert_eq!(table.column_names(), vec!["shotnum", "command", "peak_current"]);
    assert_eq!(
        table.column("command").and_then(|c| c.values.as_text()),
        Some(&[COMMANDS[0].to_string(), COMMANDS[0].to_string()][..])
    );
    assert_eq!(info.streams[1].device, "Discharge");
    Ok(())
}

#[test]
fn test_manifest_survives_rewrite() -> anyhow::Result<()> {
    let manifest = DeviceManifest::from_toml_str(MANIFEST)?;
    let file = manifest_file(&manifest.to_toml()?)?;
    let reloaded = DeviceManifest::load_from(file.path())?;
    assert_eq!(reloaded, manifest);
    Ok(())
}

#[test]
fn test_manifest_with_duplicate_devices_is_rejected() -> anyhow::Result<()> {
    let duplicate = r#"
[[msi]]
name = "discharge"

[msi.stream]
dataset_path = "/MSI/Discharge/Other summary"
shotnum_field = "Shot number"
fields = []
"#;
    let file = manifest_file(&format!("{}{}", MANIFEST, duplicate))?;
    let err = DeviceManifest::load_from(file.path())?
        .into_registry()
        .unwrap_err();
    assert!(matches!(err, ExtractError::Manifest(_)));
    Ok(())
}

#[test]
fn test_manifest_with_bad_field_is_rejected() -> anyhow::Result<()> {
    let text = MANIFEST.replace("dtype = \"text\"", "dtype = \"f64\"");
    let file = manifest_file(&text)?;
    let err = DeviceManifest::load_from(file.path())?
        .into_registry()
        .unwrap_err();
    assert!(matches!(err, ExtractError::FieldType { .. }));
    Ok(())
}
