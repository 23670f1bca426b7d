//! # Hierarchy Sorter
//!
//! Restores hierarchy order (every parent before its children) over the
//! suffix `[left, count)` of the dense entity array after a parent link changes.
//!
//! ## Algorithm
//!
//! A quicksort whose comparison key is **the current dense index of the
//! element's parent**, not the element itself:
//!
//! ```text
//! [ ... | x  y  z  w  P ]      P = pivot (last element)
//!          scan <───────       key(e) = index(parent(e))
//!
//! key > key(P)  → swapped toward the high end
//! otherwise     → left in the low end
//! P lands on the boundary, both sides recurse.
//! ```
//!
//! Every move goes through `set_entity_index`, so the inverse index table is
//! updated with each swap and keys read later in the same pass see the new
//! positions. Because keys move while a pass runs, one pass does not always
//! settle the range; passes repeat until the range is in order. An array sorted
//! by parent index is in hierarchy order, so a settled range is a valid one.
//!
//! Complexity per pass is O(k log k) average and O(k²) worst case, where k is
//! the length of the affected suffix. Lower indices never reference the moved
//! entity as an ancestor, so they are never touched.

use tracing::{trace, warn};

use crate::ecs::registry::EntityRegistry;

/// Partition passes attempted before falling back to a relayout.
const MAX_PARTITION_PASSES: usize = 64;

/// Restores hierarchy order over `[left, registry.len())`.
pub(crate) fn restore_order(registry: &mut EntityRegistry, left: usize) {
    let right = registry.len();
    let mut passes = 0;

    while !is_ordered(registry, left, right) {
        if passes == MAX_PARTITION_PASSES {
            warn!(left, right, passes, "hierarchy partition did not settle, relaying out range");
            relayout(registry, left, right);
            return;
        }
        sort_range(registry, left, right);
        passes += 1;
    }

    if passes > 0 {
        trace!(left, right, passes, "hierarchy order restored");
    }
}

/// Checks that every entity in `[left, right)` sits after its parent.
pub(crate) fn is_ordered(registry: &EntityRegistry, left: usize, right: usize) -> bool {
    (left..right).all(|position| {
        let entity = registry.live()[position];
        registry
            .parent_index(entity)
            .map_or(true, |parent_position| parent_position < position)
    })
}

/// One quicksort pass over `[left, right)`, keyed on parent index.
///
/// Recurses into the smaller side and loops on the larger one, so stack depth
/// stays logarithmic even on the quadratic path.
fn sort_range(registry: &mut EntityRegistry, mut left: usize, mut right: usize) {
    while right - left > 1 {
        let pivot = partition(registry, left, right);
        if pivot - left < right - pivot - 1 {
            sort_range(registry, left, pivot);
            left = pivot + 1;
        } else {
            sort_range(registry, pivot + 1, right);
            right = pivot;
        }
    }
}

/// Partitions `[left, right)` around its last element and returns the pivot's
/// final position.
fn partition(registry: &mut EntityRegistry, left: usize, right: usize) -> usize {
    let last = right - 1;
    let pivot = registry.live()[last];
    let pivot_key = registry.parent_index(pivot);

    let mut boundary = last;
    for position in (left..last).rev() {
        let candidate = registry.live()[position];
        if registry.parent_index(candidate) > pivot_key {
            boundary -= 1;
            registry.swap_positions(position, boundary);
        }
    }

    // Swaps never touch `last`, so the pivot is still there.
    registry.swap_positions(boundary, last);
    boundary
}

/// Stable topological relayout of `[left, right)`.
///
/// Each round places, in their current relative order, every entity whose
/// parent is already placed or lies outside the range.
fn relayout(registry: &mut EntityRegistry, left: usize, right: usize) {
    let mut pending = registry.live()[left..right].to_vec();
    let mut waiting = vec![false; registry.capacity()];
    for entity in &pending {
        waiting[entity.slot()] = true;
    }

    let mut write = left;
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|&entity| {
            let ready = registry
                .try_parent(entity)
                .map_or(true, |parent| !waiting[parent.slot()]);
            if ready {
                registry.set_entity_index(write, entity);
                waiting[entity.slot()] = false;
                write += 1;
            }
            !ready
        });
        assert!(
            pending.len() < before,
            "Cycle in parent links while relaying out the hierarchy"
        );
    }
}
