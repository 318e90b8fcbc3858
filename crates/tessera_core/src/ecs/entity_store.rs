//! # Entity Store
//!
//! Owns every entity record of a scene: identity, activation state and the
//! parent/child graph. `activate` and `destroy` only queue work; the owning
//! [`Scene`](super::Scene) applies the queues in `refresh`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::entity::{Entity, EntityHandle, EntityId, SceneId};
use super::event::{Dispatcher, EntityEvent, EntityEventKind, EntityListener};
use super::iter::{AncestorIter, ChildIter, DescendantIter, EntityIter};
use crate::error::{EcsError, EcsResult};
use crate::memory::IdPool;

pub(crate) enum EntitySlot {
    Vacant { generation: u32 },
    Occupied(Entity),
}

/// Sparse, chunk-grown table of entity records.
///
/// # Example
///
/// ```rust
/// use tessera_core::Scene;
///
/// let mut scene = Scene::new();
/// let entity = scene.create_named_entity("player");
/// scene.activate(entity).unwrap();
/// assert_eq!(scene.entities().iter().count(), 0);
///
/// scene.refresh();
/// let player = scene.entities().find_first_by_name("player").unwrap();
/// assert_eq!(player, entity);
/// ```
pub struct EntityStore {
    scene: SceneId,
    chunk_size: usize,
    slots: Vec<EntitySlot>,
    ids: IdPool,
    pending_creation: Vec<EntityId>,
    pending_activation: Vec<EntityId>,
    pending_destruction: Vec<EntityId>,
    activated_count: usize,
    listeners: Dispatcher<dyn EntityListener>,
}

impl EntityStore {
    pub(crate) fn new(scene: SceneId, chunk_size: usize) -> Self {
        Self {
            scene,
            chunk_size: chunk_size.max(1),
            slots: Vec::new(),
            ids: IdPool::new(),
            pending_creation: Vec::new(),
            pending_activation: Vec::new(),
            pending_destruction: Vec::new(),
            activated_count: 0,
            listeners: Dispatcher::new(),
        }
    }

    /// Store that starts with `listener` registered.
    pub(crate) fn with_listener(
        scene: SceneId,
        chunk_size: usize,
        listener: Arc<Mutex<dyn EntityListener>>,
    ) -> Self {
        Self {
            listeners: Dispatcher::with_listener(listener),
            ..Self::new(scene, chunk_size)
        }
    }

    /// Number of live entity records, activated or not.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.allocated_count()
    }

    /// Whether the store holds no entities.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of activated entities.
    #[inline]
    #[must_use]
    pub const fn activated_count(&self) -> usize {
        self.activated_count
    }

    /// Number of slots allocated so far (always a multiple of the chunk size).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether a refresh has queued work to apply.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !(self.pending_creation.is_empty()
            && self.pending_activation.is_empty()
            && self.pending_destruction.is_empty())
    }

    /// Creates an inert entity.
    ///
    /// The store grows by whole chunks when the new id lies beyond its
    /// capacity; existing entities keep their ids.
    pub fn create(&mut self, name: Option<String>) -> EntityHandle {
        let id = EntityId::new(self.ids.create());
        let index = id.as_usize();
        if index >= self.slots.len() {
            let chunks = index / self.chunk_size + 1;
            self.slots
                .resize_with(chunks * self.chunk_size, || EntitySlot::Vacant { generation: 0 });
            debug!(
                scene = self.scene.value(),
                capacity = self.slots.len(),
                "entity store grown"
            );
        }

        let generation = match &self.slots[index] {
            EntitySlot::Vacant { generation } => *generation,
            EntitySlot::Occupied(entity) => {
                error!("entity slot {id} handed out while occupied");
                entity.handle().generation().wrapping_add(1)
            }
        };
        let handle = EntityHandle::new(self.scene, id, generation);
        self.slots[index] = EntitySlot::Occupied(Entity::new(handle, name));
        self.pending_creation.push(id);
        handle
    }

    /// Returns the record behind `handle`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ForeignEntity`] for a handle of another scene,
    /// [`EcsError::InvalidEntity`] if the entity no longer exists.
    pub fn get(&self, handle: EntityHandle) -> EcsResult<&Entity> {
        self.check_scene(handle)?;
        self.record(handle.id())
            .filter(|entity| entity.handle == handle)
            .ok_or(EcsError::InvalidEntity(handle))
    }

    fn get_mut(&mut self, handle: EntityHandle) -> EcsResult<&mut Entity> {
        self.check_scene(handle)?;
        self.record_mut(handle.id())
            .filter(|entity| entity.handle == handle)
            .ok_or(EcsError::InvalidEntity(handle))
    }

    /// Whether `handle` refers to a live entity of this store.
    #[must_use]
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Handle of the entity currently occupying slot `id`.
    #[must_use]
    pub fn with_id(&self, id: EntityId) -> Option<EntityHandle> {
        self.record(id).map(Entity::handle)
    }

    /// Renames an entity.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn set_name(&mut self, handle: EntityHandle, name: Option<String>) -> EcsResult<()> {
        self.get_mut(handle)?.name = name;
        Ok(())
    }

    /// Queues an entity, and all of its children, for activation.
    ///
    /// # Errors
    ///
    /// - [`EcsError::AlreadyActivated`] / [`EcsError::AlreadyPendingActivation`]
    /// - [`EcsError::PendingDestruction`] if the entity is queued for destruction
    /// - [`EcsError::ParentNotActivated`] if its parent is neither activated nor
    ///   queued for activation
    pub fn activate(&mut self, handle: EntityHandle) -> EcsResult<()> {
        let entity = self.get(handle)?;
        if entity.activated {
            return Err(EcsError::AlreadyActivated(handle));
        }
        if entity.pending_activation {
            return Err(EcsError::AlreadyPendingActivation(handle));
        }
        if entity.pending_destruction {
            return Err(EcsError::PendingDestruction(handle));
        }
        if let Some(parent) = entity.parent {
            if !self.record(parent).is_some_and(Entity::is_live) {
                return Err(EcsError::ParentNotActivated(handle));
            }
        }

        // Pre-order, children in insertion order.
        let mut stack = vec![handle.id()];
        while let Some(id) = stack.pop() {
            let Some(entity) = self.record_mut(id) else {
                continue;
            };
            if entity.activated || entity.pending_activation || entity.pending_destruction {
                continue;
            }
            entity.pending_activation = true;
            stack.extend(entity.children.iter().rev());
            self.pending_activation.push(id);
        }
        Ok(())
    }

    /// Queues an entity, and all of its descendants, for destruction.
    ///
    /// Descendants are queued before their parents. A queued activation is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyPendingDestruction`] if already queued.
    pub fn destroy(&mut self, handle: EntityHandle) -> EcsResult<()> {
        if self.get(handle)?.pending_destruction {
            return Err(EcsError::AlreadyPendingDestruction(handle));
        }
        self.mark_destruction(handle.id());
        Ok(())
    }

    /// Queues every descendant of an entity for destruction, keeping the
    /// entity itself.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn destroy_all_children(&mut self, handle: EntityHandle) -> EcsResult<()> {
        let children = self.get(handle)?.children.clone();
        for child in children {
            if self.record(child).is_some_and(|c| !c.pending_destruction) {
                self.mark_destruction(child);
            }
        }
        Ok(())
    }

    /// Post-order walk: every descendant is queued ahead of its parent.
    fn mark_destruction(&mut self, root: EntityId) {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                self.queue_destruction(id);
                continue;
            }
            let Some(entity) = self.record(id) else {
                continue;
            };
            stack.push((id, true));
            for &child in entity.children.iter().rev() {
                if self.record(child).is_some_and(|c| !c.pending_destruction) {
                    stack.push((child, false));
                }
            }
        }
    }

    fn queue_destruction(&mut self, id: EntityId) {
        let Some(entity) = self.record_mut(id) else {
            return;
        };
        entity.pending_destruction = true;
        // A queued activation stays in its queue and is skipped at refresh.
        entity.pending_activation = false;
        self.pending_destruction.push(id);
    }

    /// Attaches `child` under `parent`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ForeignEntity`] if either entity belongs to another scene
    /// - [`EcsError::AlreadyHasParent`] if `child` already has a parent
    /// - [`EcsError::PendingDestruction`] if either is queued for destruction
    /// - [`EcsError::ActivationMismatch`] if exactly one of them is activated
    ///   or queued for activation
    /// - [`EcsError::CyclicHierarchy`] if `child` is `parent` or one of its
    ///   ancestors
    pub fn add_child(&mut self, parent: EntityHandle, child: EntityHandle) -> EcsResult<()> {
        let parent_entity = self.get(parent)?;
        let child_entity = self.get(child)?;

        if child_entity.parent.is_some() {
            return Err(EcsError::AlreadyHasParent(child));
        }
        if parent_entity.pending_destruction {
            return Err(EcsError::PendingDestruction(parent));
        }
        if child_entity.pending_destruction {
            return Err(EcsError::PendingDestruction(child));
        }
        if parent_entity.is_live() != child_entity.is_live() {
            return Err(EcsError::ActivationMismatch { parent, child });
        }
        if parent == child || self.ancestors_of(parent_entity).any(|a| a.handle == child) {
            return Err(EcsError::CyclicHierarchy { parent, child });
        }

        self.attach(parent.id(), child.id());
        Ok(())
    }

    /// Detaches `child` from `parent` without touching its activation state.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotAChild`] if `child` is not attached to `parent`.
    pub fn remove_child(&mut self, parent: EntityHandle, child: EntityHandle) -> EcsResult<()> {
        self.get(parent)?;
        if self.get(child)?.parent != Some(parent.id()) {
            return Err(EcsError::NotAChild { parent, child });
        }
        self.detach(child.id());
        Ok(())
    }

    /// Parent of an entity, if any.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn parent(&self, handle: EntityHandle) -> EcsResult<Option<EntityHandle>> {
        let entity = self.get(handle)?;
        Ok(entity.parent.and_then(|id| self.with_id(id)))
    }

    /// Topmost ancestor, or the entity itself when it has no parent.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn root(&self, handle: EntityHandle) -> EcsResult<EntityHandle> {
        let entity = self.get(handle)?;
        Ok(self
            .ancestors_of(entity)
            .last()
            .map_or(handle, Entity::handle))
    }

    /// Direct children in insertion order.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn children(&self, handle: EntityHandle) -> EcsResult<ChildIter<'_>> {
        Ok(self.children_of(self.get(handle)?))
    }

    /// All descendants, depth first, each parent before its children.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn descendants(&self, handle: EntityHandle) -> EcsResult<DescendantIter<'_>> {
        Ok(self.descendants_of(self.get(handle)?))
    }

    /// Ancestors, nearest parent first.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn ancestors(&self, handle: EntityHandle) -> EcsResult<AncestorIter<'_>> {
        Ok(self.ancestors_of(self.get(handle)?))
    }

    /// First direct child matching `predicate`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn find_first_child(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(&Entity) -> bool,
    ) -> EcsResult<Option<EntityHandle>> {
        Ok(self.children(handle)?.find(|e| predicate(e)).map(Entity::handle))
    }

    /// Direct children matching `predicate`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn find_children(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(&Entity) -> bool,
    ) -> EcsResult<Vec<EntityHandle>> {
        Ok(self
            .children(handle)?
            .filter(|e| predicate(e))
            .map(Entity::handle)
            .collect())
    }

    /// First descendant (pre-order) matching `predicate`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn find_first_descendant(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(&Entity) -> bool,
    ) -> EcsResult<Option<EntityHandle>> {
        Ok(self
            .descendants(handle)?
            .find(|e| predicate(e))
            .map(Entity::handle))
    }

    /// Descendants (pre-order) matching `predicate`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn find_descendants(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(&Entity) -> bool,
    ) -> EcsResult<Vec<EntityHandle>> {
        Ok(self
            .descendants(handle)?
            .filter(|e| predicate(e))
            .map(Entity::handle)
            .collect())
    }

    /// Nearest ancestor matching `predicate`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn find_first_ancestor(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(&Entity) -> bool,
    ) -> EcsResult<Option<EntityHandle>> {
        Ok(self
            .ancestors(handle)?
            .find(|e| predicate(e))
            .map(Entity::handle))
    }

    /// Ancestors matching `predicate`, nearest first.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn find_ancestors(
        &self,
        handle: EntityHandle,
        mut predicate: impl FnMut(&Entity) -> bool,
    ) -> EcsResult<Vec<EntityHandle>> {
        Ok(self
            .ancestors(handle)?
            .filter(|e| predicate(e))
            .map(Entity::handle)
            .collect())
    }

    /// Activated entities in ascending id order.
    #[must_use]
    pub fn iter(&self) -> EntityIter<'_> {
        EntityIter::new(&self.slots)
    }

    /// First activated entity matching `predicate`.
    pub fn find_first(&self, mut predicate: impl FnMut(&Entity) -> bool) -> Option<EntityHandle> {
        self.iter().find(|e| predicate(e)).map(Entity::handle)
    }

    /// All activated entities matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&Entity) -> bool) -> Vec<EntityHandle> {
        self.iter()
            .filter(|e| predicate(e))
            .map(Entity::handle)
            .collect()
    }

    /// First activated entity with the given name.
    #[must_use]
    pub fn find_first_by_name(&self, name: &str) -> Option<EntityHandle> {
        self.find_first(|e| e.name() == Some(name))
    }

    /// Registers a listener for entity lifecycle events.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`] if this listener is already registered.
    pub fn register_listener<L>(&mut self, listener: Arc<Mutex<L>>) -> EcsResult<()>
    where
        L: EntityListener + 'static,
    {
        let listener: Arc<Mutex<dyn EntityListener>> = listener;
        self.listeners.register(listener)
    }

    /// Unregisters a listener.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] if the listener was never registered.
    pub fn unregister_listener<L: ?Sized>(&mut self, listener: &Arc<Mutex<L>>) -> EcsResult<()> {
        self.listeners.unregister(listener)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn children_of<'a>(&'a self, entity: &'a Entity) -> ChildIter<'a> {
        ChildIter::new(self, entity)
    }

    pub(crate) fn descendants_of<'a>(&'a self, entity: &'a Entity) -> DescendantIter<'a> {
        DescendantIter::new(self, entity)
    }

    pub(crate) fn ancestors_of<'a>(&'a self, entity: &'a Entity) -> AncestorIter<'a> {
        AncestorIter::new(self, entity)
    }

    pub(crate) fn record(&self, id: EntityId) -> Option<&Entity> {
        match self.slots.get(id.as_usize())? {
            EntitySlot::Occupied(entity) => Some(entity),
            EntitySlot::Vacant { .. } => None,
        }
    }

    fn record_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.slots.get_mut(id.as_usize())? {
            EntitySlot::Occupied(entity) => Some(entity),
            EntitySlot::Vacant { .. } => None,
        }
    }

    fn check_scene(&self, handle: EntityHandle) -> EcsResult<()> {
        if handle.scene() == self.scene {
            Ok(())
        } else {
            Err(EcsError::ForeignEntity(handle))
        }
    }

    /// Links `child` under `parent` without the `add_child` checks.
    pub(crate) fn attach(&mut self, parent: EntityId, child: EntityId) {
        if let Some(entity) = self.record_mut(child) {
            entity.parent = Some(parent);
        }
        if let Some(entity) = self.record_mut(parent) {
            entity.children.push(child);
        }
    }

    fn detach(&mut self, child: EntityId) {
        let Some(parent) = self.record_mut(child).and_then(|c| c.parent.take()) else {
            return;
        };
        if let Some(entity) = self.record_mut(parent) {
            entity.children.retain(|&id| id != child);
        }
    }

    fn dispatch(&self, kind: EntityEventKind, id: EntityId) {
        if self.listeners.is_empty() {
            return;
        }
        let Some(entity) = self.record(id) else {
            return;
        };
        let event = EntityEvent {
            kind,
            entity: entity.handle,
        };
        self.listeners
            .dispatch(|listener| listener.receive_event(&event, entity));
    }

    // ---------------------------------------------------------------------
    // Refresh steps, driven by the scene
    // ---------------------------------------------------------------------

    pub(crate) fn take_pending_creation(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_creation)
    }

    pub(crate) fn take_pending_activation(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_activation)
    }

    pub(crate) fn take_pending_destruction(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_destruction)
    }

    pub(crate) fn commit_creation(&self, id: EntityId) {
        self.dispatch(EntityEventKind::Create, id);
    }

    /// Flips a queued entity to activated. The caller activates the
    /// components and then calls [`finish_activation`](Self::finish_activation).
    pub(crate) fn commit_activation(&mut self, id: EntityId) -> Option<EntityHandle> {
        let Some(entity) = self.record_mut(id) else {
            error!("queued activation of missing entity {id}");
            return None;
        };
        if !entity.pending_activation {
            // Cancelled by `destroy`.
            return None;
        }
        entity.pending_activation = false;
        entity.activated = true;
        let handle = entity.handle;
        self.activated_count += 1;
        Some(handle)
    }

    pub(crate) fn finish_activation(&self, id: EntityId) {
        self.dispatch(EntityEventKind::Activate, id);
    }

    /// Announces a queued destruction while the entity is still intact. The
    /// caller removes the components and then calls
    /// [`finish_destruction`](Self::finish_destruction).
    pub(crate) fn commit_destruction(&self, id: EntityId) -> Option<EntityHandle> {
        let Some(entity) = self.record(id) else {
            error!("queued destruction of missing entity {id}");
            return None;
        };
        if !entity.pending_destruction {
            error!("entity {id} queued for destruction without the pending flag");
            return None;
        }
        let handle = entity.handle;
        self.dispatch(EntityEventKind::Destroy, id);
        Some(handle)
    }

    /// Releases the slot and bumps its generation.
    pub(crate) fn finish_destruction(&mut self, id: EntityId) {
        self.detach(id);
        let Some(slot) = self.slots.get_mut(id.as_usize()) else {
            return;
        };
        let entity = match std::mem::replace(slot, EntitySlot::Vacant { generation: 0 }) {
            EntitySlot::Occupied(entity) => entity,
            vacant @ EntitySlot::Vacant { .. } => {
                *slot = vacant;
                return;
            }
        };
        *slot = EntitySlot::Vacant {
            generation: entity.handle.generation().wrapping_add(1),
        };
        if entity.activated {
            self.activated_count -= 1;
        }
        // Children are queued ahead of their parent, so normally none remain.
        for child in entity.children {
            if let Some(orphan) = self.record_mut(child) {
                orphan.parent = None;
            }
        }
        self.ids.destroy(id.index());
    }
}

impl<'a> IntoIterator for &'a EntityStore {
    type Item = &'a Entity;
    type IntoIter = EntityIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
