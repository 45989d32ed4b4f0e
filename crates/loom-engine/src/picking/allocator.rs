use std::fmt;

use super::codec::{encode, ID_SPACE};

/// Half-open id range `[start, end)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub const fn contains(self, id: u32) -> bool {
        self.start <= id && id < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickingError {
    /// More ids were requested than are free.
    Exhausted { requested: usize, available: u64 },
}

impl fmt::Display for PickingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickingError::Exhausted { requested, available } => write!(
                f,
                "cannot allocate {requested} picking ids, only {available} free"
            ),
        }
    }
}

impl std::error::Error for PickingError {}

/// Ids owned by one layer, with their encoded colors.
///
/// Dense index `i` (the `i`-th entity of the layer) maps to the `i`-th id
/// across `ranges` in order. Not `Clone`: each id has exactly one owner, and
/// ownership returns to the allocator through
/// [`PickingAllocator::deallocate`].
#[derive(Debug, PartialEq, Eq)]
pub struct PickingAllocation {
    ranges: Vec<IdRange>,
    colors: Vec<u8>,
    len: usize,
}

impl PickingAllocation {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ranges(&self) -> &[IdRange] {
        &self.ranges
    }

    /// Packed RGBA8 colors, four bytes per dense index.
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    pub fn color(&self, dense: usize) -> Option<[u8; 4]> {
        let c = self.colors.get(dense * 4..dense * 4 + 4)?;
        Some([c[0], c[1], c[2], c[3]])
    }

    /// Picking id of the `dense`-th entity.
    pub fn id(&self, dense: usize) -> Option<u32> {
        let mut skip = dense;
        for r in &self.ranges {
            let len = r.len() as usize;
            if skip < len {
                return Some(r.start + skip as u32);
            }
            skip -= len;
        }
        None
    }

    /// Dense index owning `id`, if this allocation holds it.
    pub fn dense_index(&self, id: u32) -> Option<usize> {
        let mut base = 0usize;
        for r in &self.ranges {
            if r.contains(id) {
                return Some(base + (id - r.start) as usize);
            }
            base += r.len() as usize;
        }
        None
    }
}

/// Free-list allocator over the picking id space.
///
/// The free list is sorted by `start` and coalesced: no two entries touch.
#[derive(Debug, Clone)]
pub struct PickingAllocator {
    free: Vec<IdRange>,
    space: u32,
}

impl Default for PickingAllocator {
    fn default() -> Self {
        Self::with_space(ID_SPACE)
    }
}

impl PickingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator over `[0, space)`; `space` is capped at [`ID_SPACE`].
    pub fn with_space(space: u32) -> Self {
        let space = space.min(ID_SPACE);
        let free = if space > 0 { vec![IdRange::new(0, space)] } else { Vec::new() };
        Self { free, space }
    }

    pub fn free_ranges(&self) -> &[IdRange] {
        &self.free
    }

    /// Total free ids.
    pub fn available(&self) -> u64 {
        self.free.iter().map(|r| r.len() as u64).sum()
    }

    /// Takes `count` ids from the front of the free list, spanning as many
    /// free ranges as needed.
    pub fn allocate(&mut self, count: usize) -> Result<PickingAllocation, PickingError> {
        let available = self.available();
        if count as u64 > available {
            return Err(PickingError::Exhausted { requested: count, available });
        }

        let mut ranges = Vec::new();
        let mut colors = Vec::with_capacity(count * 4);
        let mut remaining = count as u64;
        let mut consumed = 0usize;

        for free in self.free.iter_mut() {
            if remaining == 0 {
                break;
            }
            let take = (free.len() as u64).min(remaining) as u32;
            let carved = IdRange::new(free.start, free.start + take);
            for id in carved.start..carved.end {
                colors.extend_from_slice(&encode(id));
            }
            ranges.push(carved);
            free.start += take;
            remaining -= take as u64;
            if free.is_empty() {
                consumed += 1;
            }
        }
        self.free.drain(..consumed);

        Ok(PickingAllocation { ranges, colors, len: count })
    }

    /// Returns every range of `allocation` to the free list, merging with
    /// adjacent free ranges.
    pub fn deallocate(&mut self, allocation: PickingAllocation) {
        for range in allocation.ranges {
            self.release(range);
        }
    }

    fn release(&mut self, range: IdRange) {
        if range.is_empty() {
            return;
        }
        debug_assert!(range.end <= self.space, "range {range:?} outside id space");

        let at = self.free.partition_point(|r| r.start < range.start);
        debug_assert!(
            at == 0 || self.free[at - 1].end <= range.start,
            "range {range:?} overlaps a free range"
        );
        debug_assert!(
            at == self.free.len() || range.end <= self.free[at].start,
            "range {range:?} overlaps a free range"
        );

        let merges_prev = at > 0 && self.free[at - 1].end == range.start;
        let merges_next = at < self.free.len() && self.free[at].start == range.end;

        match (merges_prev, merges_next) {
            (true, true) => {
                self.free[at - 1].end = self.free[at].end;
                self.free.remove(at);
            }
            (true, false) => self.free[at - 1].end = range.end,
            (false, true) => self.free[at].start = range.start,
            (false, false) => self.free.insert(at, range),
        }
    }
}
