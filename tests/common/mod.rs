//! Synthetic recordings shared by the integration tests.
#![allow(dead_code)]

use shotalign::prelude::*;

pub const WAVEFORM_PATH: &str = "/Raw data + config/Waveform/Run time list";
pub const MOTION_PATH: &str = "/Raw data + config/6K Compumotor/Motion list: drive_a";
pub const DISCHARGE_PATH: &str = "/MSI/Discharge/Discharge summary";

pub const CONFIGS: [&str; 3] = ["config01", "config02", "config03"];
pub const COMMANDS: [&str; 3] = ["FREQ 50000.0", "FREQ 80000.0", "FREQ 120000.0"];

/// Interleaved waveform run time list: one row per configuration per shot.
///
/// Row `r` stores amplitude `r` and command index `r % 3`.
pub fn waveform_dataset(shots: &[u32]) -> MemoryDataset {
    waveform_dataset_tagged(shots, &CONFIGS)
}

pub fn waveform_dataset_tagged(shots: &[u32], tags: &[&str]) -> MemoryDataset {
    let n = tags.len();
    let rows = shots.len() * n;
    let shotnum: Vec<u32> = shots.iter().flat_map(|&s| std::iter::repeat(s).take(n)).collect();
    let config_names: Vec<&str> = (0..rows).map(|r| tags[r % n]).collect();
    let command: Vec<i32> = (0..rows).map(|r| (r % 3) as i32).collect();
    let amplitude: Vec<f64> = (0..rows).map(|r| r as f64).collect();
    MemoryDataset::builder(WAVEFORM_PATH)
        .field("Shot number", ElementType::U32, shotnum)
        .field("Configuration name", ElementType::Text, config_names)
        .field("Command index", ElementType::I32, command)
        .field("Amplitude", ElementType::F64, amplitude)
        .build()
        .unwrap()
}

pub fn waveform_map() -> ControlMap {
    let stream = StreamConfig::new(WAVEFORM_PATH, "Shot number")
        .with_increasing_shotnums()
        .with_field(FieldDescriptor::command_list("command", "Command index", &COMMANDS))
        .with_field(FieldDescriptor::scalar("amplitude", ElementType::F64, "Amplitude"));
    CONFIGS
        .iter()
        .fold(ControlMap::new("Waveform", ControlType::Waveform).interleaved(), |map, name| {
            map.with_config(name, stream.clone())
        })
}

/// Drive positions, `x = shot`, `y = -shot`, `z = 0.5`.
pub fn motion_dataset(shots: &[u32]) -> MemoryDataset {
    let x: Vec<f64> = shots.iter().map(|&s| f64::from(s)).collect();
    let y: Vec<f64> = shots.iter().map(|&s| -f64::from(s)).collect();
    let z = vec![0.5f32; shots.len()];
    let motion = vec![1i16; shots.len()];
    MemoryDataset::builder(MOTION_PATH)
        .field("Shot number", ElementType::I32, shots.iter().map(|&s| s as i32).collect::<Vec<_>>())
        .field("x", ElementType::F64, x)
        .field("y", ElementType::F64, y)
        .field("z", ElementType::F32, z)
        .field("Motion index", ElementType::I16, motion)
        .build()
        .unwrap()
}

pub fn motion_map() -> ControlMap {
    let stream = StreamConfig::new(MOTION_PATH, "Shot number")
        .with_field(FieldDescriptor::composed("xyz", ElementType::F64, &["x", "y", "z"]))
        .with_field(FieldDescriptor::scalar("motion_index", ElementType::I32, "Motion index"));
    ControlMap::new("6K Compumotor", ControlType::Motion).with_config("drive_a", stream)
}

/// Discharge summary, `peak_current = shot / 10`, `pulse_count = shot`, and a
/// boolean quality flag, which has no NULL sentinel.
pub fn discharge_dataset(shots: &[u32]) -> MemoryDataset {
    MemoryDataset::builder(DISCHARGE_PATH)
        .field("Shot number", ElementType::I32, shots.iter().map(|&s| s as i32).collect::<Vec<_>>())
        .field(
            "Peak current",
            ElementType::F64,
            shots.iter().map(|&s| f64::from(s) / 10.0).collect::<Vec<_>>(),
        )
        .field("Pulse count", ElementType::U16, shots.iter().map(|&s| s as u16).collect::<Vec<_>>())
        .field("Data valid", ElementType::Bool, vec![true; shots.len()])
        .build()
        .unwrap()
}

pub fn discharge_map() -> MsiMap {
    let stream = StreamConfig::new(DISCHARGE_PATH, "Shot number")
        .with_field(FieldDescriptor::scalar("peak_current", ElementType::F64, "Peak current"))
        .with_field(FieldDescriptor::scalar("pulse_count", ElementType::U16, "Pulse count"))
        .with_field(FieldDescriptor::scalar("data_valid", ElementType::Bool, "Data valid"));
    MsiMap::new("Discharge", stream).with_alias("discharge")
}

pub fn store(datasets: Vec<MemoryDataset>) -> MemoryStore {
    datasets
        .into_iter()
        .fold(MemoryStore::new("run_42.hdf5"), MemoryStore::with_dataset)
}

pub fn registry() -> DeviceRegistry {
    DeviceRegistry::new()
        .with(waveform_map())
        .unwrap()
        .with(motion_map())
        .unwrap()
        .with(discharge_map())
        .unwrap()
}
