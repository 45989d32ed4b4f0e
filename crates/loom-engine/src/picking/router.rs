use std::collections::HashMap;
use std::fmt;

use super::allocator::{IdRange, PickingAllocation, PickingAllocator, PickingError};
use super::codec::decode;

/// Pointer interaction with a pickable entity, carrying the caller's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickEvent<K> {
    HoverOn(K),
    HoverOff(K),
    Click(K),
}

/// Identifies one registered layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickingHandle(u64);

struct Registration<K> {
    allocation: PickingAllocation,
    keys: Vec<K>,
}

/// One owned id range, for binary search by id.
#[derive(Debug, Copy, Clone)]
struct Owner {
    range: IdRange,
    handle: PickingHandle,
    /// Dense index of `range.start` within its layer.
    base: usize,
}

/// Maps picking ids back to caller keys and tracks hover state.
pub struct PickingRouter<K> {
    allocator: PickingAllocator,
    layers: HashMap<PickingHandle, Registration<K>>,
    owners: Vec<Owner>,
    next_handle: u64,
    hovered: Option<(u32, K)>,
    events: Vec<PickEvent<K>>,
}

impl<K> fmt::Debug for PickingRouter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickingRouter")
            .field("layers", &self.layers.len())
            .field("free", &self.allocator.available())
            .field("hovered", &self.hovered.as_ref().map(|(id, _)| *id))
            .finish()
    }
}

impl<K: Clone> Default for PickingRouter<K> {
    fn default() -> Self {
        Self::with_allocator(PickingAllocator::new())
    }
}

impl<K: Clone> PickingRouter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocator(allocator: PickingAllocator) -> Self {
        Self {
            allocator,
            layers: HashMap::new(),
            owners: Vec::new(),
            next_handle: 0,
            hovered: None,
            events: Vec::new(),
        }
    }

    pub fn allocator(&self) -> &PickingAllocator {
        &self.allocator
    }

    /// Allocates one id per key; dense index `i` belongs to `keys[i]`.
    pub fn register(&mut self, keys: Vec<K>) -> Result<PickingHandle, PickingError> {
        let allocation = self.allocator.allocate(keys.len())?;
        let handle = PickingHandle(self.next_handle);
        self.next_handle += 1;

        let mut base = 0usize;
        for &range in allocation.ranges() {
            self.owners.push(Owner { range, handle, base });
            base += range.len() as usize;
        }
        self.owners.sort_unstable_by_key(|o| o.range.start);

        log::debug!(
            "picking layer {:?}: {} ids in {} ranges",
            handle,
            allocation.len(),
            allocation.ranges().len()
        );
        self.layers.insert(handle, Registration { allocation, keys });
        Ok(handle)
    }

    /// Returns the layer's ids to the allocator.
    ///
    /// A hovered entity of the layer gets its `HoverOff`.
    pub fn release(&mut self, handle: PickingHandle) {
        let Some(reg) = self.layers.remove(&handle) else {
            log::debug!("release of unknown picking layer {handle:?}");
            return;
        };
        self.owners.retain(|o| o.handle != handle);

        let hovered_here = self
            .hovered
            .as_ref()
            .is_some_and(|(id, _)| reg.allocation.dense_index(*id).is_some());
        if hovered_here {
            if let Some((_, key)) = self.hovered.take() {
                self.events.push(PickEvent::HoverOff(key));
            }
        }
        self.allocator.deallocate(reg.allocation);
    }

    pub fn allocation(&self, handle: PickingHandle) -> Option<&PickingAllocation> {
        self.layers.get(&handle).map(|r| &r.allocation)
    }

    /// Layer, dense index and key owning `id`.
    pub fn lookup(&self, id: u32) -> Option<(PickingHandle, usize, &K)> {
        let at = self.owners.partition_point(|o| o.range.end <= id);
        let owner = self.owners.get(at).filter(|o| o.range.contains(id))?;
        let dense = owner.base + (id - owner.range.start) as usize;
        let key = self.layers.get(&owner.handle)?.keys.get(dense)?;
        Some((owner.handle, dense, key))
    }

    /// Key of the entity drawn with `rgba`, `None` for background or stale ids.
    pub fn resolve_color(&self, rgba: [u8; 4]) -> Option<&K> {
        decode(rgba).and_then(|id| self.lookup(id)).map(|(_, _, key)| key)
    }

    /// Updates hover state from the color under the pointer.
    ///
    /// Emits `HoverOff(previous)` then `HoverOn(new)` only when the hovered
    /// entity changes.
    pub fn pointer_moved(&mut self, rgba: [u8; 4]) {
        let hit = decode(rgba).and_then(|id| self.lookup(id).map(|(_, _, k)| (id, k.clone())));
        let prev_id = self.hovered.as_ref().map(|(id, _)| *id);
        let new_id = hit.as_ref().map(|(id, _)| *id);
        if prev_id == new_id {
            return;
        }
        if let Some((_, key)) = self.hovered.take() {
            self.events.push(PickEvent::HoverOff(key));
        }
        if let Some((id, key)) = hit {
            self.events.push(PickEvent::HoverOn(key.clone()));
            self.hovered = Some((id, key));
        }
    }

    pub fn pointer_left(&mut self) {
        if let Some((_, key)) = self.hovered.take() {
            self.events.push(PickEvent::HoverOff(key));
        }
    }

    /// Emits `Click` for the entity drawn with `rgba`, if any.
    pub fn click(&mut self, rgba: [u8; 4]) {
        if let Some(key) = self.resolve_color(rgba).cloned() {
            self.events.push(PickEvent::Click(key));
        }
    }

    pub fn hovered(&self) -> Option<&K> {
        self.hovered.as_ref().map(|(_, k)| k)
    }

    pub fn drain_events(&mut self) -> Vec<PickEvent<K>> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picking::encode;

    #[test]
    fn hover_events_fire_only_on_change() {
        let mut r = PickingRouter::new();
        let h = r.register(vec!["n0", "n1"]).unwrap();
        let c0 = r.allocation(h).unwrap().color(0).unwrap();
        let c1 = r.allocation(h).unwrap().color(1).unwrap();

        r.pointer_moved(c0);
        r.pointer_moved(c0);
        assert_eq!(r.drain_events(), vec![PickEvent::HoverOn("n0")]);

        r.pointer_moved(c1);
        assert_eq!(
            r.drain_events(),
            vec![PickEvent::HoverOff("n0"), PickEvent::HoverOn("n1")]
        );

        r.pointer_moved([0; 4]);
        assert_eq!(r.drain_events(), vec![PickEvent::HoverOff("n1")]);
        r.pointer_left();
        assert!(r.drain_events().is_empty());
    }

    #[test]
    fn click_on_background_is_silent() {
        let mut r = PickingRouter::new();
        let h = r.register(vec![7u64]).unwrap();
        r.click([0; 4]);
        assert!(r.drain_events().is_empty());
        let color = r.allocation(h).unwrap().color(0).unwrap();
        r.click(color);
        assert_eq!(r.drain_events(), vec![PickEvent::Click(7)]);
    }

    #[test]
    fn lookup_spans_layers_and_release_frees_ids() {
        let mut r = PickingRouter::new();
        let nodes = r.register(vec!['a', 'b', 'c']).unwrap();
        let edges = r.register(vec!['x', 'y']).unwrap();
        assert_eq!(r.lookup(0), Some((nodes, 0, &'a')));
        assert_eq!(r.lookup(4), Some((edges, 1, &'y')));
        assert_eq!(r.lookup(5), None);

        r.pointer_moved(encode(1));
        r.release(nodes);
        assert_eq!(
            r.drain_events(),
            vec![PickEvent::HoverOn('b'), PickEvent::HoverOff('b')]
        );
        assert_eq!(r.lookup(1), None);
        assert_eq!(r.resolve_color(encode(3)), Some(&'x'));

        // Freed ids are reused from the front.
        let again = r.register(vec!['z']).unwrap();
        assert_eq!(r.lookup(0), Some((again, 0, &'z')));
    }

    #[test]
    fn pointer_left_emits_hover_off() {
        let mut r = PickingRouter::new();
        r.register(vec![1u32]).unwrap();
        r.pointer_moved(encode(0));
        r.pointer_left();
        assert_eq!(
            r.drain_events(),
            vec![PickEvent::HoverOn(1), PickEvent::HoverOff(1)]
        );
    }
}
