use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Range;

use anyhow::{Context, Result};
use loom_layout::{
    pack_with, FieldDescriptor, GlType, MappingError, MappingTable, PackObserver, PackOptions,
    PackedBuffer, Schema, Value,
};
use wgpu::util::DeviceExt;

use crate::coords::Bounds3;

use super::PointIndex;

/// Bytes per point row: `x, y, z, radius` as `f32`.
pub const POINT_STRIDE: usize = 16;

/// A positioned point with a caller-chosen id.
#[derive(Debug, Clone, PartialEq)]
pub struct Point<K> {
    pub id: K,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub radius: f32,
}

impl<K> Point<K> {
    pub fn new(id: K, x: f32, y: f32, z: f32) -> Self {
        Self { id, x, y, z, radius: 1.0 }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }
}

/// Packed point rows plus the id map and spatial summary built while packing.
///
/// Immutable after ingestion; a new data set replaces the store.
pub struct DensePointStore<K> {
    packed: PackedBuffer,
    index: PointIndex<K>,
    bounds: Bounds3,
    max_abs: [f32; 3],
    buffer: Option<wgpu::Buffer>,
}

impl<K> fmt::Debug for DensePointStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensePointStore")
            .field("points", &self.packed.data_rows())
            .field("rows", &self.packed.rows())
            .field("bounds", &self.bounds)
            .field("uploaded", &self.buffer.is_some())
            .finish()
    }
}

// ── ingestion observer ─────────────────────────────────────────────────────

struct IngestObserver<'a, K, F> {
    id_of: &'a F,
    rows: HashMap<K, u32>,
    bounds: Bounds3,
    max_abs: [f32; 3],
}

impl<R, K, F> PackObserver<R> for IngestObserver<'_, K, F>
where
    K: Eq + Hash + fmt::Debug,
    F: Fn(&R) -> K,
{
    fn before_record(&mut self, record: &R, _index: usize, first_row: usize) -> Result<(), MappingError> {
        let id = (self.id_of)(record);
        if self.rows.contains_key(&id) {
            return Err(MappingError::new(format!("duplicate point id {id:?}")));
        }
        let row = u32::try_from(first_row).map_err(|_| MappingError::new("point row exceeds u32"))?;
        self.rows.insert(id, row);
        Ok(())
    }

    fn after_record(
        &mut self,
        _record: &R,
        _index: usize,
        rows: Range<usize>,
        bytes: &[u8],
    ) -> Result<(), MappingError> {
        if rows.len() != 1 || bytes.len() != POINT_STRIDE {
            return Err(MappingError::new(format!(
                "a point must produce exactly one row, got {}",
                rows.len()
            )));
        }
        let [x, y, z, _radius]: [f32; 4] = bytemuck::pod_read_unaligned(bytes);
        let p = [x, y, z];
        self.bounds.include(p);
        for (m, v) in self.max_abs.iter_mut().zip(p) {
            if v.abs() > m.abs() {
                *m = v;
            }
        }
        Ok(())
    }
}

impl<K> DensePointStore<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// The fixed point schema: `x, y, z, radius`.
    pub fn schema() -> Schema {
        Schema::new(vec![
            FieldDescriptor::new("x", GlType::F32),
            FieldDescriptor::new("y", GlType::F32),
            FieldDescriptor::new("z", GlType::F32),
            FieldDescriptor::new("radius", GlType::F32),
        ])
        .expect("point schema is statically valid")
    }

    /// Mappings reading the fields of [`Point`].
    pub fn default_mappings() -> MappingTable<Point<K>>
    where
        K: 'static,
    {
        let mut table = MappingTable::new();
        table
            .set_fn("x", |p: &Point<K>, _| Ok(Some(Value::from(p.x))))
            .set_fn("y", |p: &Point<K>, _| Ok(Some(Value::from(p.y))))
            .set_fn("z", |p: &Point<K>, _| Ok(Some(Value::from(p.z))))
            .set_fn("radius", |p: &Point<K>, _| Ok(Some(Value::from(p.radius))));
        table
    }

    /// Packs `records` into point rows (rounded up to a power of two).
    ///
    /// Fails on duplicate ids, on mappings that flatten, and on disabled
    /// point fields; the GPU layout requires all four.
    pub fn ingest<R, F>(records: &[R], mappings: &MappingTable<R>, id_of: F) -> Result<Self>
    where
        F: Fn(&R) -> K,
    {
        let schema = Self::schema();
        if let Some(f) = schema.fields().iter().find(|f| mappings.is_disabled(&f.name)) {
            anyhow::bail!("point field `{}` cannot be disabled", f.name);
        }

        let mut observer = IngestObserver {
            id_of: &id_of,
            rows: HashMap::with_capacity(records.len()),
            bounds: Bounds3::EMPTY,
            max_abs: [0.0; 3],
        };
        let packed = pack_with(records, &schema, mappings, PackOptions::POWER_OF_TWO, &mut observer)
            .context("point ingestion failed")?;
        debug_assert_eq!(packed.layout().stride(), POINT_STRIDE);

        log::info!(
            "ingested {} points into {} rows",
            packed.data_rows(),
            packed.rows()
        );

        Ok(Self {
            packed,
            index: PointIndex::new(observer.rows),
            bounds: observer.bounds,
            max_abs: observer.max_abs,
            buffer: None,
        })
    }

    pub fn from_points(points: &[Point<K>]) -> Result<Self>
    where
        K: 'static,
    {
        Self::ingest(points, &Self::default_mappings(), |p| p.id.clone())
    }

    /// Dense row of `id`.
    #[inline]
    pub fn get_index(&self, id: &K) -> Option<u32> {
        self.index.get(id)
    }

    /// Shared id map for entity mappings.
    pub fn index(&self) -> PointIndex<K> {
        self.index.clone()
    }
}

impl<K> DensePointStore<K> {
    /// Number of ingested points.
    #[inline]
    pub fn len(&self) -> usize {
        self.packed.data_rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packed.data_rows() == 0
    }

    /// Rows including power-of-two padding.
    #[inline]
    pub fn rows(&self) -> usize {
        self.packed.rows()
    }

    pub fn packed(&self) -> &PackedBuffer {
        &self.packed
    }

    pub fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    /// Per axis, the coordinate with the largest magnitude, sign kept.
    pub fn max_abs(&self) -> [f32; 3] {
        self.max_abs
    }

    /// `[x, y, z, radius]` of `row`.
    pub fn position(&self, row: u32) -> Option<[f32; 4]> {
        self.packed
            .row(row as usize)
            .map(bytemuck::pod_read_unaligned::<[f32; 4]>)
    }

    /// Creates the read-only storage buffer on first use.
    ///
    /// An empty store still gets one zeroed row so bind groups stay valid.
    pub fn upload(&mut self, device: &wgpu::Device) -> &wgpu::Buffer {
        self.buffer.get_or_insert_with(|| {
            let zero = [0u8; POINT_STRIDE];
            let contents = if self.packed.bytes().is_empty() {
                &zero[..]
            } else {
                self.packed.bytes()
            };
            log::debug!("uploading point buffer ({} bytes)", contents.len());
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("loom point buffer"),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            })
        })
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Releases the GPU buffer and clears the id map.
    ///
    /// Indices already handed out keep their own copy of the map.
    pub fn dispose(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.index = PointIndex::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{read_buffer, test_gpu};

    fn minimal_points() -> Vec<Point<&'static str>> {
        vec![
            Point::new("a", -8.6, 5.0, 0.0),
            Point::new("b", 8.6, 5.0, 0.0),
            Point::new("c", 0.0, -10.0, 0.0),
            Point::new("d", 0.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn ingest_builds_index_and_bounds() {
        let store = DensePointStore::from_points(&minimal_points()).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.rows(), 4);
        assert_eq!(store.get_index(&"a"), Some(0));
        assert_eq!(store.get_index(&"d"), Some(3));
        assert_eq!(store.get_index(&"zz"), None);
        assert_eq!(store.bounds().min, [-8.6, -10.0, 0.0]);
        assert_eq!(store.bounds().max, [8.6, 5.0, 0.0]);
        assert_eq!(store.max_abs(), [-8.6, -10.0, 0.0]);
        assert_eq!(store.position(2), Some([0.0, -10.0, 0.0, 1.0]));
    }

    #[test]
    fn rows_round_to_power_of_two() {
        let mut pts = minimal_points();
        pts.push(Point::new("e", 1.0, 1.0, 1.0).with_radius(3.0));
        let store = DensePointStore::from_points(&pts).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.rows(), 8);
        assert_eq!(store.position(4), Some([1.0, 1.0, 1.0, 3.0]));
        assert_eq!(store.position(7), Some([0.0; 4]));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut pts = minimal_points();
        pts.push(Point::new("b", 0.0, 0.0, 0.0));
        let err = DensePointStore::from_points(&pts).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate point id \"b\""), "{err:#}");
    }

    #[test]
    fn disabled_point_field_is_rejected() {
        let mut mappings = DensePointStore::<&str>::default_mappings();
        mappings.disable("radius");
        assert!(DensePointStore::ingest(&minimal_points(), &mappings, |p| p.id).is_err());
    }

    #[test]
    fn absent_mapping_leaves_zero() {
        let mut mappings = MappingTable::<Point<u32>>::new();
        mappings.set_fn("x", |p: &Point<u32>, _| Ok(Some(Value::from(p.x))));
        let pts = [Point::new(7u32, 2.0, 3.0, 4.0)];
        let store = DensePointStore::ingest(&pts, &mappings, |p| p.id).unwrap();
        assert_eq!(store.position(0), Some([2.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn upload_matches_packed_rows() {
        let Some(gpu) = test_gpu() else { return };
        let mut store = DensePointStore::from_points(&minimal_points()).unwrap();
        let expected = store.packed().bytes().to_vec();
        let buffer = store.upload(gpu.device());
        assert_eq!(buffer.size(), 64);
        let bytes = read_buffer(gpu.device(), gpu.queue(), buffer, 64).unwrap();
        assert_eq!(bytes, expected);

        store.dispose();
        assert!(store.buffer().is_none());
    }

    #[test]
    fn dispose_clears_id_map() {
        let mut store = DensePointStore::from_points(&minimal_points()).unwrap();
        let held = store.index();
        store.dispose();

        assert_eq!(store.get_index(&"a"), None);
        assert!(store.index().is_empty());
        assert!(!store.index().same_as(&held));
        assert_eq!(held.get(&"a"), Some(0));
    }
}
