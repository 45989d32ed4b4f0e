use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Shared id → dense row map of one point data set.
///
/// Cheap to clone; entity mappings capture it to translate references while
/// packing.
pub struct PointIndex<K> {
    rows: Arc<HashMap<K, u32>>,
}

impl<K> Clone for PointIndex<K> {
    fn clone(&self) -> Self {
        Self { rows: Arc::clone(&self.rows) }
    }
}

impl<K> fmt::Debug for PointIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointIndex").field("len", &self.rows.len()).finish()
    }
}

impl<K> PointIndex<K> {
    /// An index that resolves nothing.
    pub(super) fn empty() -> Self {
        Self { rows: Arc::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash> PointIndex<K> {
    pub(super) fn new(rows: HashMap<K, u32>) -> Self {
        Self { rows: Arc::new(rows) }
    }

    #[inline]
    pub fn get(&self, id: &K) -> Option<u32> {
        self.rows.get(id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether both indices come from the same ingestion.
    pub fn same_as(&self, other: &PointIndex<K>) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }
}
