use std::ops::Range;

use crate::error::{LayoutError, MappingError};
use crate::mapping::{FieldMapping, MappingTable};
use crate::schema::{compute_layout, FieldSlot, Layout, ScalarKind, Schema};
use crate::value::Value;

/// Packing options.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Rounds the output row count up to the next power of two.
    /// Padding rows stay zero-filled.
    pub round_rows_to_power_of_two: bool,
}

impl PackOptions {
    pub const POWER_OF_TWO: PackOptions = PackOptions { round_rows_to_power_of_two: true };
}

/// Per-record hooks fired around the bytes of each input record.
///
/// Fires once per input record, not once per output row.
pub trait PackObserver<R> {
    fn before_record(&mut self, record: &R, index: usize, first_row: usize) -> Result<(), MappingError> {
        let _ = (record, index, first_row);
        Ok(())
    }

    /// `bytes` holds exactly the rows written for this record.
    fn after_record(
        &mut self,
        record: &R,
        index: usize,
        rows: Range<usize>,
        bytes: &[u8],
    ) -> Result<(), MappingError> {
        let _ = (record, index, rows, bytes);
        Ok(())
    }
}

impl<R> PackObserver<R> for () {}

/// Packed rows plus the layout they were written with.
///
/// Invariant: `bytes.len() == layout.stride() * rows`.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBuffer {
    bytes: Vec<u8>,
    layout: Layout,
    rows: usize,
    data_rows: usize,
}

impl PackedBuffer {
    /// Wraps bytes produced elsewhere (e.g. read back from a GPU buffer).
    ///
    /// Returns `None` unless `bytes` holds a whole number of rows. Every row
    /// counts as a data row.
    pub fn from_parts(bytes: Vec<u8>, layout: Layout) -> Option<Self> {
        let stride = layout.stride();
        if stride == 0 || bytes.len() % stride != 0 {
            return None;
        }
        let rows = bytes.len() / stride;
        Some(Self { bytes, layout, rows, data_rows: rows })
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Total rows including power-of-two padding.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows produced by records (excludes padding).
    #[inline]
    pub fn data_rows(&self) -> usize {
        self.data_rows
    }

    pub fn row(&self, row: usize) -> Option<&[u8]> {
        let stride = self.layout.stride();
        self.bytes.get(row * stride..(row + 1) * stride)
    }

    /// Decodes component `component` of `field` in `row`.
    pub fn read(&self, row: usize, field: &str, component: usize) -> Option<f64> {
        let slot = self.layout.slot(field)?;
        let ty = slot.descriptor.gl_type;
        if component >= ty.components as usize {
            return None;
        }
        let bytes = self.row(row)?;
        let at = slot.offset + component * ty.kind.byte_size();
        Some(read_scalar(&bytes[at..at + ty.kind.byte_size()], ty.kind))
    }
}

/// Packs `records` with no observer.
pub fn pack<R>(
    records: &[R],
    schema: &Schema,
    mappings: &MappingTable<R>,
    options: PackOptions,
) -> Result<PackedBuffer, LayoutError> {
    pack_with(records, schema, mappings, options, &mut ())
}

/// Packs `records`, firing `observer` around each record.
pub fn pack_with<R, O>(
    records: &[R],
    schema: &Schema,
    mappings: &MappingTable<R>,
    options: PackOptions,
    observer: &mut O,
) -> Result<PackedBuffer, LayoutError>
where
    O: PackObserver<R> + ?Sized,
{
    let layout = compute_layout(schema, mappings);
    let stride = layout.stride();

    let active: Vec<(&FieldSlot, Option<&dyn FieldMapping<R>>)> = layout
        .slots()
        .iter()
        .map(|slot| (slot, mappings.get(&slot.descriptor.name)))
        .collect();

    // Pass one: row count per record.
    let mut row_counts = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut flatten: Option<usize> = None;
        for (slot, mapping) in &active {
            let Some(mapping) = mapping else { continue };
            let value = mapping
                .value(record, index)
                .map_err(|e| mapping_error(slot, index, e))?;
            if let Some(len) = value.as_ref().and_then(Value::sequence_len) {
                flatten = Some(flatten.map_or(len, |l| l.max(len)));
            }
        }
        row_counts.push(flatten);
    }

    let data_rows: usize = row_counts.iter().map(|c| c.unwrap_or(1)).sum();
    let rows = if options.round_rows_to_power_of_two && data_rows > 0 {
        data_rows.next_power_of_two()
    } else {
        data_rows
    };

    let mut bytes = vec![0u8; stride * rows];
    let mut next_row = 0usize;

    for (index, record) in records.iter().enumerate() {
        let first_row = next_row;
        observer
            .before_record(record, index, first_row)
            .map_err(|e| rejected(index, e))?;

        let mut values = Vec::with_capacity(active.len());
        for (slot, mapping) in &active {
            let value = match mapping {
                Some(m) => m.value(record, index).map_err(|e| mapping_error(slot, index, e))?,
                None => None,
            };
            values.push(value);
        }

        match row_counts[index] {
            None => {
                let row = &mut bytes[first_row * stride..(first_row + 1) * stride];
                for ((slot, _), value) in active.iter().zip(&values) {
                    if let Some(value) = value {
                        write_cell(row, slot, value);
                    }
                }
                next_row += 1;
            }
            Some(count) => {
                for k in 0..count {
                    let at = (first_row + k) * stride;
                    let row = &mut bytes[at..at + stride];
                    for ((slot, mapping), value) in active.iter().zip(&values) {
                        let cell = match mapping {
                            Some(m) if m.overrides_flatten() => m
                                .flatten_value(record, index, k, count)
                                .map_err(|e| mapping_error(slot, index, e))?,
                            _ => match value {
                                Some(Value::Sequence(items)) => items.get(k).cloned(),
                                other => other.clone(),
                            },
                        };
                        if let Some(cell) = cell {
                            write_cell(row, slot, &cell);
                        }
                    }
                }
                next_row += count;
            }
        }

        observer
            .after_record(
                record,
                index,
                first_row..next_row,
                &bytes[first_row * stride..next_row * stride],
            )
            .map_err(|e| rejected(index, e))?;
    }

    Ok(PackedBuffer { bytes, layout, rows, data_rows })
}

fn mapping_error(slot: &FieldSlot, record: usize, e: MappingError) -> LayoutError {
    LayoutError::Mapping {
        field: slot.descriptor.name.clone(),
        record,
        message: e.message,
    }
}

fn rejected(record: usize, e: MappingError) -> LayoutError {
    LayoutError::Rejected { record, message: e.message }
}

fn write_cell(row: &mut [u8], slot: &FieldSlot, value: &Value) {
    let ty = slot.descriptor.gl_type;
    let size = ty.kind.byte_size();
    for c in 0..ty.components as usize {
        let Some(v) = value.component(c) else { continue };
        let at = slot.offset + c * size;
        write_scalar(&mut row[at..at + size], ty.kind, v);
    }
}

// `as` casts from f64 saturate, which is the intended clamping for integer kinds.
fn write_scalar(out: &mut [u8], kind: ScalarKind, v: f64) {
    match kind {
        ScalarKind::I8 => out.copy_from_slice(&(v as i8).to_le_bytes()),
        ScalarKind::U8 => out.copy_from_slice(&(v as u8).to_le_bytes()),
        ScalarKind::I16 => out.copy_from_slice(&(v as i16).to_le_bytes()),
        ScalarKind::U16 => out.copy_from_slice(&(v as u16).to_le_bytes()),
        ScalarKind::I32 => out.copy_from_slice(&(v as i32).to_le_bytes()),
        ScalarKind::U32 => out.copy_from_slice(&(v as u32).to_le_bytes()),
        ScalarKind::F32 => out.copy_from_slice(&(v as f32).to_le_bytes()),
    }
}

fn read_scalar(b: &[u8], kind: ScalarKind) -> f64 {
    match kind {
        ScalarKind::I8 => i8::from_le_bytes([b[0]]) as f64,
        ScalarKind::U8 => b[0] as f64,
        ScalarKind::I16 => i16::from_le_bytes([b[0], b[1]]) as f64,
        ScalarKind::U16 => u16::from_le_bytes([b[0], b[1]]) as f64,
        ScalarKind::I32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
        ScalarKind::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
        ScalarKind::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Attributes, MappedValue};
    use crate::schema::{FieldDescriptor, GlType};

    #[derive(Debug)]
    struct Edge {
        color: u32,
        weight: f32,
        via: Vec<[f32; 2]>,
    }

    fn edge_schema() -> Schema {
        Schema::new(vec![
            FieldDescriptor::new("sourceColor", GlType::U32),
            FieldDescriptor::new("weight", GlType::F32),
            FieldDescriptor::new("via", GlType::VEC2),
        ])
        .unwrap()
    }

    fn edge_mappings() -> MappingTable<Edge> {
        let mut t = MappingTable::new();
        t.set_fn("sourceColor", |e: &Edge, _| Ok(Some(e.color.into())));
        t.set_fn("weight", |e: &Edge, _| Ok(Some(e.weight.into())));
        t.set_fn("via", |e: &Edge, _| {
            Ok(match e.via.len() {
                0 => None,
                _ => Some(Value::Sequence(e.via.iter().map(|p| Value::from(*p)).collect())),
            })
        });
        t
    }

    #[test]
    fn round_trip_plain_records() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("pos", GlType::VEC3),
            FieldDescriptor::new("id", GlType::U32),
            FieldDescriptor::new("delta", GlType::scalar(ScalarKind::I16)),
        ])
        .unwrap();
        let records: Vec<Attributes> = (0..6)
            .map(|i| {
                Attributes::new()
                    .with("pos", [i as f32, i as f32 * 0.5, -(i as f32)])
                    .with("id", i as u32 * 100)
                    .with("delta", -(i as i32))
            })
            .collect();
        let packed = pack(
            &records,
            &schema,
            &MappingTable::lookup_all(&schema),
            PackOptions::default(),
        )
        .unwrap();

        assert_eq!(packed.rows(), 6);
        assert_eq!(packed.bytes().len(), packed.layout().stride() * 6);
        for i in 0..6 {
            assert_eq!(packed.read(i, "pos", 0), Some(i as f64));
            assert_eq!(packed.read(i, "pos", 1), Some(i as f64 * 0.5));
            assert_eq!(packed.read(i, "pos", 2), Some(-(i as f64)));
            assert_eq!(packed.read(i, "id", 0), Some(i as f64 * 100.0));
            assert_eq!(packed.read(i, "delta", 0), Some(-(i as f64)));
        }
    }

    #[test]
    fn flatten_expands_into_contiguous_rows() {
        let records = vec![
            Edge { color: 1, weight: 1.0, via: vec![] },
            Edge { color: 7, weight: 2.0, via: vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]] },
            Edge { color: 3, weight: 3.0, via: vec![] },
        ];
        let packed =
            pack(&records, &edge_schema(), &edge_mappings(), PackOptions::default()).unwrap();

        assert_eq!(packed.rows(), 5);
        assert_eq!(packed.read(0, "sourceColor", 0), Some(1.0));
        for row in 1..4 {
            assert_eq!(packed.read(row, "sourceColor", 0), Some(7.0));
            assert_eq!(packed.read(row, "weight", 0), Some(2.0));
        }
        assert_eq!(packed.read(1, "via", 0), Some(1.0));
        assert_eq!(packed.read(2, "via", 1), Some(4.0));
        assert_eq!(packed.read(3, "via", 0), Some(5.0));
        assert_eq!(packed.read(4, "sourceColor", 0), Some(3.0));
    }

    #[test]
    fn flatten_override_receives_row_and_count() {
        let mut mappings = edge_mappings();
        mappings.set_flatten(
            "weight",
            |e: &Edge, _| Ok(Some(e.weight.into())),
            |_: &Edge, _, row, rows| -> MappedValue { Ok(Some(((row * 10 + rows) as f32).into())) },
        );
        let records = vec![Edge { color: 0, weight: 9.0, via: vec![[0.0, 0.0], [1.0, 1.0]] }];
        let packed = pack(&records, &edge_schema(), &mappings, PackOptions::default()).unwrap();

        assert_eq!(packed.rows(), 2);
        assert_eq!(packed.read(0, "weight", 0), Some(2.0));
        assert_eq!(packed.read(1, "weight", 0), Some(12.0));
    }

    #[test]
    fn power_of_two_rounding_zero_fills_padding() {
        let records: Vec<Edge> = (0..5)
            .map(|i| Edge { color: i + 1, weight: 1.0, via: vec![] })
            .collect();
        let packed =
            pack(&records, &edge_schema(), &edge_mappings(), PackOptions::POWER_OF_TWO).unwrap();

        assert_eq!(packed.rows(), 8);
        assert_eq!(packed.data_rows(), 5);
        assert_eq!(packed.bytes().len(), 8 * packed.layout().stride());
        for row in 5..8 {
            assert!(packed.row(row).unwrap().iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn disabled_field_is_not_written() {
        let mut mappings = edge_mappings();
        mappings.disable("weight");
        let records = vec![Edge { color: 2, weight: 5.0, via: vec![] }];
        let packed = pack(&records, &edge_schema(), &mappings, PackOptions::default()).unwrap();

        assert_eq!(packed.layout().stride(), 4 + 8);
        assert_eq!(packed.read(0, "weight", 0), None);
    }

    #[test]
    fn absent_values_leave_zeroes() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("a", GlType::F32),
            FieldDescriptor::new("b", GlType::VEC2),
        ])
        .unwrap();
        let records = vec![Attributes::new().with("a", 3.0f32)];
        let packed =
            pack(&records, &schema, &MappingTable::lookup_all(&schema), PackOptions::default())
                .unwrap();
        assert_eq!(packed.read(0, "a", 0), Some(3.0));
        assert_eq!(packed.read(0, "b", 0), Some(0.0));
        assert_eq!(packed.read(0, "b", 1), Some(0.0));
    }

    #[test]
    fn integer_kinds_saturate() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("u", GlType::scalar(ScalarKind::U8)),
            FieldDescriptor::new("i", GlType::scalar(ScalarKind::I8)),
        ])
        .unwrap();
        let records = vec![Attributes::new().with("u", 300u32).with("i", -200i32)];
        let packed =
            pack(&records, &schema, &MappingTable::lookup_all(&schema), PackOptions::default())
                .unwrap();
        assert_eq!(packed.read(0, "u", 0), Some(255.0));
        assert_eq!(packed.read(0, "i", 0), Some(-128.0));
    }

    #[test]
    fn mapping_error_aborts_pack() {
        let mut mappings = edge_mappings();
        mappings.set_fn("weight", |e: &Edge, _| {
            if e.weight < 0.0 {
                Err(MappingError::new("negative weight"))
            } else {
                Ok(Some(e.weight.into()))
            }
        });
        let records = vec![
            Edge { color: 0, weight: 1.0, via: vec![] },
            Edge { color: 0, weight: -1.0, via: vec![] },
        ];
        let err = pack(&records, &edge_schema(), &mappings, PackOptions::default()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::Mapping {
                field: "weight".into(),
                record: 1,
                message: "negative weight".into()
            }
        );
    }

    #[derive(Default)]
    struct RowIndex {
        before: Vec<(usize, usize)>,
        after: Vec<(usize, Range<usize>, usize)>,
    }

    impl PackObserver<Edge> for RowIndex {
        fn before_record(&mut self, _: &Edge, index: usize, first_row: usize) -> Result<(), MappingError> {
            self.before.push((index, first_row));
            Ok(())
        }

        fn after_record(
            &mut self,
            _: &Edge,
            index: usize,
            rows: Range<usize>,
            bytes: &[u8],
        ) -> Result<(), MappingError> {
            self.after.push((index, rows, bytes.len()));
            Ok(())
        }
    }

    #[test]
    fn observer_fires_once_per_record() {
        let records = vec![
            Edge { color: 0, weight: 0.0, via: vec![[0.0, 0.0]; 2] },
            Edge { color: 0, weight: 0.0, via: vec![] },
        ];
        let schema = edge_schema();
        let mut index = RowIndex::default();
        let packed = pack_with(
            &records,
            &schema,
            &edge_mappings(),
            PackOptions::POWER_OF_TWO,
            &mut index,
        )
        .unwrap();

        let stride = packed.layout().stride();
        assert_eq!(index.before, vec![(0, 0), (1, 2)]);
        assert_eq!(index.after, vec![(0, 0..2, 2 * stride), (1, 2..3, stride)]);
    }

    struct RejectSecond;

    impl PackObserver<Edge> for RejectSecond {
        fn after_record(&mut self, _: &Edge, index: usize, _: Range<usize>, _: &[u8]) -> Result<(), MappingError> {
            if index == 1 {
                return Err(MappingError::new("duplicate"));
            }
            Ok(())
        }
    }

    #[test]
    fn observer_can_reject_records() {
        let records: Vec<Edge> = (0..3).map(|_| Edge { color: 0, weight: 0.0, via: vec![] }).collect();
        let err = pack_with(
            &records,
            &edge_schema(),
            &edge_mappings(),
            PackOptions::default(),
            &mut RejectSecond,
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::Rejected { record: 1, message: "duplicate".into() });
    }

    #[test]
    fn empty_sequences_produce_no_rows() {
        let schema = Schema::new(vec![FieldDescriptor::new("v", GlType::F32)]).unwrap();
        let records = vec![
            Attributes::new().with("v", Vec::<Value>::new()),
            Attributes::new().with("v", 1.0f32),
        ];
        let packed =
            pack(&records, &schema, &MappingTable::lookup_all(&schema), PackOptions::default())
                .unwrap();
        assert_eq!(packed.rows(), 1);
        assert_eq!(packed.read(0, "v", 0), Some(1.0));
    }

    #[test]
    fn from_parts_requires_whole_rows() {
        let schema = Schema::new(vec![FieldDescriptor::new("v", GlType::F32)]).unwrap();
        let layout = Layout::of_schema(&schema);
        let bytes = 2.5f32.to_le_bytes().to_vec();
        let wrapped = PackedBuffer::from_parts(bytes, layout.clone()).unwrap();
        assert_eq!(wrapped.rows(), 1);
        assert_eq!(wrapped.read(0, "v", 0), Some(2.5));
        assert!(PackedBuffer::from_parts(vec![0; 6], layout).is_none());
    }
}
