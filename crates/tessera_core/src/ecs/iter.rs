//! # Iterators
//!
//! Forward cursors over the entity and component slot arrays. Each cursor
//! skips vacant and non-activated slots on the fly; nothing is snapshotted.
//! Iterators borrow their store, so the store cannot be restructured while
//! one is alive. Keep handles, not iterators, across a refresh.

use std::iter::FusedIterator;

use super::entity::{Entity, EntityHandle, EntityId};
use super::entity_store::{EntitySlot, EntityStore};
use super::storage::ComponentSlot;

/// Activated entities in ascending id order.
pub struct EntityIter<'a> {
    slots: &'a [EntitySlot],
    cursor: usize,
}

impl<'a> EntityIter<'a> {
    pub(crate) const fn new(slots: &'a [EntitySlot]) -> Self {
        Self { slots, cursor: 0 }
    }
}

impl<'a> Iterator for EntityIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(slot) = self.slots.get(self.cursor) {
            self.cursor += 1;
            if let EntitySlot::Occupied(entity) = slot {
                if entity.is_activated() {
                    return Some(entity);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len().saturating_sub(self.cursor)))
    }
}

impl FusedIterator for EntityIter<'_> {}

/// Direct children of an entity, in insertion order.
pub struct ChildIter<'a> {
    store: &'a EntityStore,
    ids: std::slice::Iter<'a, EntityId>,
}

impl<'a> ChildIter<'a> {
    pub(crate) fn new(store: &'a EntityStore, parent: &'a Entity) -> Self {
        Self {
            store,
            ids: parent.children.iter(),
        }
    }
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        self.ids.by_ref().find_map(|&id| store.record(id))
    }
}

/// Every descendant of an entity, depth first, parents before children.
pub struct DescendantIter<'a> {
    store: &'a EntityStore,
    stack: Vec<EntityId>,
}

impl<'a> DescendantIter<'a> {
    pub(crate) fn new(store: &'a EntityStore, root: &'a Entity) -> Self {
        Self {
            store,
            stack: root.children.iter().rev().copied().collect(),
        }
    }
}

impl<'a> Iterator for DescendantIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(entity) = self.store.record(id) {
                self.stack.extend(entity.children.iter().rev());
                return Some(entity);
            }
        }
        None
    }
}

impl FusedIterator for DescendantIter<'_> {}

/// Ancestors of an entity, nearest parent first.
pub struct AncestorIter<'a> {
    store: &'a EntityStore,
    next: Option<EntityId>,
}

impl<'a> AncestorIter<'a> {
    pub(crate) const fn new(store: &'a EntityStore, entity: &'a Entity) -> Self {
        Self {
            store,
            next: entity.parent,
        }
    }
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.store.record(self.next?)?;
        self.next = entity.parent;
        Some(entity)
    }
}

/// Components of activated entities, in component id order.
pub struct ComponentIter<'a, T> {
    slots: &'a [ComponentSlot<T>],
    cursor: usize,
}

impl<'a, T> ComponentIter<'a, T> {
    pub(crate) const fn new(slots: &'a [ComponentSlot<T>]) -> Self {
        Self { slots, cursor: 0 }
    }
}

impl<'a, T> Iterator for ComponentIter<'a, T> {
    type Item = (EntityHandle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(slot) = self.slots.get(self.cursor) {
            self.cursor += 1;
            if let ComponentSlot::Occupied(record) = slot {
                if record.activated {
                    return Some((record.entity, &record.value));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len().saturating_sub(self.cursor)))
    }
}

impl<T> FusedIterator for ComponentIter<'_, T> {}

/// Mutable counterpart of [`ComponentIter`].
pub struct ComponentIterMut<'a, T> {
    slots: std::slice::IterMut<'a, ComponentSlot<T>>,
}

impl<'a, T> ComponentIterMut<'a, T> {
    pub(crate) fn new(slots: &'a mut [ComponentSlot<T>]) -> Self {
        Self {
            slots: slots.iter_mut(),
        }
    }
}

impl<'a, T> Iterator for ComponentIterMut<'a, T> {
    type Item = (EntityHandle, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref().find_map(|slot| match slot {
            ComponentSlot::Occupied(record) if record.activated => {
                Some((record.entity, &mut record.value))
            }
            _ => None,
        })
    }
}

impl<T> FusedIterator for ComponentIterMut<'_, T> {}
