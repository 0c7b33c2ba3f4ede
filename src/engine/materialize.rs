//! Filling the output table.
//!
//! Every column is allocated zeroed for the whole shot number axis, the rows a
//! stream covers are copied (or decoded) in from the dataset, and the rows it
//! does not cover get the NULL sentinel of the column's type.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::NullPolicy;
use crate::engine::resolve::Coverage;
use crate::engine::selection::SelectedStream;
use crate::engine::SoftWarnings;
use crate::error::{ExtractError, ExtractResult};
use crate::mapping::FieldDescriptor;
use crate::store::{Dataset, RowSelection};
use crate::table::{Column, ShotTable};
use crate::types::{ColumnValues, ElementType};

/// A resolved stream ready to be copied into the table.
#[derive(Clone, Copy)]
pub struct StreamRows<'a, 'r> {
    /// The validated request.
    pub selected: &'a SelectedStream<'r>,
    /// Dataset the stream is stored in.
    pub dataset: &'a dyn Dataset,
    /// Rows matched along the final axis.
    pub coverage: &'a Coverage,
}

/// Build the output table over `shotnum` from the resolved streams.
pub fn materialize(
    shotnum: &[u32],
    streams: &[StreamRows<'_, '_>],
    null: &NullPolicy,
    warnings: &mut SoftWarnings,
) -> ExtractResult<ShotTable> {
    let n_rows = shotnum.len();
    let mut columns = Vec::new();
    for stream in streams {
        let present = &stream.coverage.present;
        let dest: Vec<usize> = (0..n_rows).filter(|&i| present[i]).collect();
        let missing: Vec<usize> = (0..n_rows).filter(|&i| !present[i]).collect();
        let rows = RowSelection::Indices(stream.coverage.index.clone());
        debug!(
            device = stream.selected.device(),
            covered = dest.len(),
            missing = missing.len(),
            "materializing stream"
        );

        for field in &stream.selected.stream.fields {
            let mut column = Column {
                name: field.name.clone(),
                device: stream.selected.device().to_string(),
                dtype: field.dtype,
                shape: field.shape.clone(),
                values: ColumnValues::zeroed(field.dtype, n_rows * field.width()),
                valid: vec![false; n_rows],
            };
            for &row in &dest {
                column.valid[row] = true;
            }
            if !dest.is_empty() {
                match &field.command_list {
                    Some(commands) => {
                        decode_commands(&mut column, field, commands, stream.dataset, &rows, &dest, warnings)?
                    }
                    None => copy_values(&mut column, field, stream.dataset, &rows, &dest)?,
                }
            }
            if !missing.is_empty() {
                fill_missing(&mut column, &missing, null, warnings);
            }
            columns.push(column);
        }
    }
    Ok(ShotTable::new(shotnum.to_vec(), columns))
}

fn copy_values(
    column: &mut Column,
    field: &FieldDescriptor,
    dataset: &dyn Dataset,
    rows: &RowSelection,
    dest: &[usize],
) -> ExtractResult<()> {
    let width = field.width();
    if field.source_fields.len() == 1 {
        let values = read_source(dataset, &field.source_fields[0], rows, width, field)?;
        scatter(&mut column.values, &values, dest, width, width, 0);
        return Ok(());
    }
    for (k, source) in field.source_fields.iter().enumerate() {
        let values = read_source(dataset, source, rows, 1, field)?;
        scatter(&mut column.values, &values, dest, width, 1, k);
    }
    Ok(())
}

/// Read one source field and convert it to the column's element type.
fn read_source(
    dataset: &dyn Dataset,
    source: &str,
    rows: &RowSelection,
    width: usize,
    field: &FieldDescriptor,
) -> ExtractResult<ColumnValues> {
    let layout = dataset
        .field_layout(source)
        .ok_or_else(|| ExtractError::MissingField {
            dataset: dataset.name().to_string(),
            field: source.to_string(),
        })?;
    if layout.width != width {
        return Err(ExtractError::FieldType {
            field: field.name.clone(),
            reason: format!(
                "source '{}' holds {} elements per row, expected {}",
                source, layout.width, width
            ),
        });
    }
    dataset
        .read(source, rows)?
        .convert(field.dtype)
        .map_err(|reason| ExtractError::FieldType {
            field: field.name.clone(),
            reason: format!("source '{}': {}", source, reason),
        })
}

/// Decode stored command indices, assigning each distinct command to all of its
/// rows at once.
fn decode_commands(
    column: &mut Column,
    field: &FieldDescriptor,
    commands: &[String],
    dataset: &dyn Dataset,
    rows: &RowSelection,
    dest: &[usize],
    warnings: &mut SoftWarnings,
) -> ExtractResult<()> {
    let source = &field.source_fields[0];
    let layout = dataset
        .field_layout(source)
        .ok_or_else(|| ExtractError::MissingField {
            dataset: dataset.name().to_string(),
            field: source.clone(),
        })?;
    if layout.width != 1 || field.width() != 1 {
        return Err(ExtractError::FieldType {
            field: field.name.clone(),
            reason: format!(
                "command indices in '{}' hold {} elements per row, expected 1",
                source, layout.width
            ),
        });
    }
    let codes = dataset
        .read(source, rows)?
        .to_i64_vec()
        .ok_or_else(|| ExtractError::FieldType {
            field: field.name.clone(),
            reason: format!("command indices in '{}' must be integers", source),
        })?;

    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (&code, &row) in codes.iter().zip(dest) {
        groups.entry(code).or_default().push(row);
    }

    let ColumnValues::Text(texts) = &mut column.values else {
        return Err(ExtractError::FieldType {
            field: field.name.clone(),
            reason: "command list fields decode to text".to_string(),
        });
    };
    for (code, group) in groups {
        let command = usize::try_from(code).ok().and_then(|i| commands.get(i));
        match command {
            Some(command) => {
                for &row in &group {
                    texts[row].clone_from(command);
                }
            }
            None => {
                warnings.warn(format!(
                    "Command index {} of field '{}' is outside its {}-entry command list, {} rows left empty",
                    code,
                    field.name,
                    commands.len(),
                    group.len()
                ));
                for &row in &group {
                    column.valid[row] = false;
                }
            }
        }
    }
    Ok(())
}

/// Copy `src` rows of `src_width` elements into rows `dest` of `dst`, starting at
/// element `offset` of each destination row.
fn scatter(
    dst: &mut ColumnValues,
    src: &ColumnValues,
    dest: &[usize],
    dst_width: usize,
    src_width: usize,
    offset: usize,
) {
    fn place<T: Clone>(
        dst: &mut [T],
        src: &[T],
        dest: &[usize],
        dst_width: usize,
        src_width: usize,
        offset: usize,
    ) {
        for (chunk, &row) in src.chunks_exact(src_width).zip(dest) {
            let at = row * dst_width + offset;
            dst[at..at + src_width].clone_from_slice(chunk);
        }
    }
    match (dst, src) {
        (ColumnValues::Signed(d), ColumnValues::Signed(s)) => place(d, s, dest, dst_width, src_width, offset),
        (ColumnValues::Unsigned(d), ColumnValues::Unsigned(s)) => place(d, s, dest, dst_width, src_width, offset),
        (ColumnValues::Float(d), ColumnValues::Float(s)) => place(d, s, dest, dst_width, src_width, offset),
        (ColumnValues::Bool(d), ColumnValues::Bool(s)) => place(d, s, dest, dst_width, src_width, offset),
        (ColumnValues::Text(d), ColumnValues::Text(s)) => place(d, s, dest, dst_width, src_width, offset),
        // read_source casts to the column class
        _ => {}
    }
}

fn fill_missing(column: &mut Column, missing: &[usize], null: &NullPolicy, warnings: &mut SoftWarnings) {
    fn fill<T: Clone>(values: &mut [T], missing: &[usize], width: usize, sentinel: T) {
        for &row in missing {
            values[row * width..(row + 1) * width].fill(sentinel.clone());
        }
    }
    let width = column.width();
    let dtype = column.dtype;
    match &mut column.values {
        ColumnValues::Signed(v) => fill(v, missing, width, signed_sentinel(dtype, null.signed_sentinel)),
        ColumnValues::Unsigned(v) => fill(v, missing, width, dtype.unsigned_max().unwrap_or(u64::MAX)),
        ColumnValues::Float(v) => fill(v, missing, width, f64::NAN),
        ColumnValues::Text(v) => fill(v, missing, width, String::new()),
        ColumnValues::Bool(_) => warnings.warn(format!(
            "No NULL-fill available for field '{}' of '{}' ({}), {} uncovered rows left false",
            column.name,
            column.device,
            dtype,
            missing.len()
        )),
    }
}

/// Signed sentinel clamped into the range of `dtype`.
fn signed_sentinel(dtype: ElementType, sentinel: i64) -> i64 {
    match dtype.integer_range() {
        Some((min, max)) => {
            i64::try_from(i128::from(sentinel).clamp(min, max)).unwrap_or(sentinel)
        }
        None => sentinel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::resolve::match_rows;
    use crate::engine::selection::validate_requests;
    use crate::mapping::{ControlMap, ControlType, DeviceRegistry, StreamConfig};
    use crate::store::MemoryDataset;
    use crate::types::Value;

    fn registry(fields: Vec<FieldDescriptor>) -> DeviceRegistry {
        let mut stream = StreamConfig::new("/Waveform/Run time list", "Shot number");
        stream.fields = fields;
        DeviceRegistry::new()
            .with(ControlMap::new("Waveform", ControlType::Waveform).with_config("config01", stream))
            .unwrap()
    }

    fn run(
        fields: Vec<FieldDescriptor>,
        dataset: &MemoryDataset,
        requested: &[u32],
        stored: &[u32],
    ) -> (ShotTable, Vec<String>) {
        try_run(fields, dataset, requested, stored).unwrap()
    }

    fn try_run(
        fields: Vec<FieldDescriptor>,
        dataset: &MemoryDataset,
        requested: &[u32],
        stored: &[u32],
    ) -> ExtractResult<(ShotTable, Vec<String>)> {
        let registry = registry(fields);
        let mut warnings = SoftWarnings::new(true);
        let selected = validate_requests(&registry, &["Waveform".into()], &mut warnings).unwrap();
        let rows: Vec<usize> = (0..stored.len()).collect();
        let coverage = match_rows(requested, &rows, stored);
        let streams = [StreamRows {
            selected: &selected[0],
            dataset,
            coverage: &coverage,
        }];
        let table = materialize(requested, &streams, &NullPolicy::default(), &mut warnings)?;
        Ok((table, warnings.messages().to_vec()))
    }

    #[test]
    fn command_indices_decode_in_groups() {
        let dataset = MemoryDataset::builder("/Waveform/Run time list")
            .field("Shot number", ElementType::U32, vec![1u32, 2, 3, 4, 5])
            .field("Command index", ElementType::I32, vec![2i32, 0, 2, 1, 7])
            .build()
            .unwrap();
        let field = FieldDescriptor::command_list("command", "Command index", &["LOW", "MID", "HIGH"]);
        let (table, warnings) = run(vec![field], &dataset, &[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5]);

        let command = table.column("command").unwrap();
        let texts = command.values.as_text().unwrap();
        assert_eq!(texts, ["HIGH", "LOW", "HIGH", "MID", ""]);
        assert_eq!(command.valid, vec![true, true, true, true, false]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Command index 7"));
    }

    #[test]
    fn composed_fields_fill_the_secondary_axis() {
        let dataset = MemoryDataset::builder("/Waveform/Run time list")
            .field("Shot number", ElementType::U32, vec![10u32, 11])
            .field("x", ElementType::F32, vec![1.0f32, 2.0])
            .field("y", ElementType::F32, vec![10.0f32, 20.0])
            .field("z", ElementType::I16, vec![-1i16, -2])
            .build()
            .unwrap();
        let field = FieldDescriptor::composed("xyz", ElementType::F64, &["x", "y", "z"]);
        let (table, _) = run(vec![field], &dataset, &[11], &[10, 11]);

        let xyz = table.column("xyz").unwrap();
        assert_eq!(xyz.values.as_f64(), Some(&[2.0, 20.0, -2.0][..]));
    }

    #[test]
    fn uncovered_rows_get_type_sentinels() {
        let dataset = MemoryDataset::builder("/Waveform/Run time list")
            .field("Shot number", ElementType::U32, vec![5u32])
            .field("amp", ElementType::F64, vec![0.5])
            .field("count", ElementType::I8, vec![3i8])
            .field("flags", ElementType::U16, vec![9u16])
            .field("label", ElementType::Text, vec!["on"])
            .field("armed", ElementType::Bool, vec![true])
            .build()
            .unwrap();
        let fields = vec![
            FieldDescriptor::scalar("amp", ElementType::F64, "amp"),
            FieldDescriptor::scalar("count", ElementType::I8, "count"),
            FieldDescriptor::scalar("flags", ElementType::U16, "flags"),
            FieldDescriptor::scalar("label", ElementType::Text, "label"),
            FieldDescriptor::scalar("armed", ElementType::Bool, "armed"),
        ];
        let (table, warnings) = run(fields, &dataset, &[5, 6], &[5]);

        let amp = table.column("amp").unwrap();
        assert_eq!(amp.element(0, 0), Some(Value::Float(0.5)));
        assert!(matches!(amp.element(1, 0), Some(Value::Float(v)) if v.is_nan()));
        assert_eq!(table.column("count").unwrap().element(1, 0), Some(Value::Signed(-128)));
        assert_eq!(table.column("flags").unwrap().element(1, 0), Some(Value::Unsigned(65535)));
        assert_eq!(table.column("label").unwrap().element(1, 0), Some(Value::Text("")));
        assert_eq!(table.column("armed").unwrap().element(1, 0), Some(Value::Bool(false)));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No NULL-fill available"));
    }

    #[test]
    fn array_source_width_must_match() {
        let dataset = MemoryDataset::builder("/Waveform/Run time list")
            .field("Shot number", ElementType::U32, vec![1u32])
            .array_field("xy", ElementType::F64, 2, vec![1.0, 2.0])
            .build()
            .unwrap();
        let field = FieldDescriptor::scalar("xyz", ElementType::F64, "xy").with_shape(vec![3]);
        let registry = registry(vec![field]);
        let mut warnings = SoftWarnings::new(true);
        let selected = validate_requests(&registry, &["Waveform".into()], &mut warnings).unwrap();
        let coverage = match_rows(&[1], &[0], &[1]);
        let streams = [StreamRows {
            selected: &selected[0],
            dataset: &dataset,
            coverage: &coverage,
        }];
        assert!(matches!(
            materialize(&[1], &streams, &NullPolicy::default(), &mut warnings),
            Err(ExtractError::FieldType { .. })
        ));
    }

    #[test]
    fn narrow_columns_reject_values_that_do_not_fit() {
        let dataset = MemoryDataset::builder("/Waveform/Run time list")
            .field("Shot number", ElementType::U32, vec![1u32, 2])
            .field("Pulse count", ElementType::U32, vec![7u32, 70000])
            .build()
            .unwrap();
        let narrow = FieldDescriptor::scalar("pulse_count", ElementType::U16, "Pulse count");
        let err = try_run(vec![narrow], &dataset, &[1, 2], &[1, 2]).unwrap_err();
        assert!(matches!(err, ExtractError::FieldType { ref reason, .. } if reason.contains("70000")));

        let (table, _) = run(
            vec![FieldDescriptor::scalar("pulse_count", ElementType::U16, "Pulse count")],
            &dataset,
            &[1, 3],
            &[1, 2],
        );
        assert_eq!(table.column("pulse_count").unwrap().values.as_u64(), Some(&[7, 65535][..]));
    }

    #[test]
    fn command_indices_must_be_one_per_row() {
        let dataset = MemoryDataset::builder("/Waveform/Run time list")
            .field("Shot number", ElementType::U32, vec![1u32, 2])
            .array_field("Command index", ElementType::I32, 2, vec![0i32, 1, 1, 0])
            .build()
            .unwrap();
        let field = FieldDescriptor::command_list("command", "Command index", &["LOW", "HIGH"]);
        let err = try_run(vec![field], &dataset, &[1, 2], &[1, 2]).unwrap_err();
        assert!(matches!(err, ExtractError::FieldType { .. }));
    }

    #[test]
    fn sentinel_is_clamped_to_narrow_types() {
        assert_eq!(signed_sentinel(ElementType::I64, -99999), -99999);
        assert_eq!(signed_sentinel(ElementType::I16, -99999), i64::from(i16::MIN));
        assert_eq!(signed_sentinel(ElementType::I8, 300), i64::from(i8::MAX));
    }
}
