//! # Entity Views
//!
//! Borrowed views pairing an entity with its scene, so that components and
//! graph neighbours can be reached from the entity itself.

use super::component::Component;
use super::entity::{Entity, EntityHandle, EntityId};
use super::scene::Scene;
use crate::error::EcsResult;

/// Read view of one entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    scene: &'a Scene,
    entity: &'a Entity,
}

impl<'a> EntityRef<'a> {
    pub(crate) const fn new(scene: &'a Scene, entity: &'a Entity) -> Self {
        Self { scene, entity }
    }

    /// Handle of this entity.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        self.entity.handle()
    }

    /// Slot id of this entity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.entity.id()
    }

    /// The underlying record.
    #[inline]
    #[must_use]
    pub const fn record(&self) -> &'a Entity {
        self.entity
    }

    /// Optional name.
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.entity.name()
    }

    /// Whether the entity is activated.
    #[must_use]
    pub const fn is_activated(&self) -> bool {
        self.entity.is_activated()
    }

    /// Whether the entity is queued for activation.
    #[must_use]
    pub const fn is_pending_activation(&self) -> bool {
        self.entity.is_pending_activation()
    }

    /// Whether the entity is queued for destruction.
    #[must_use]
    pub const fn is_pending_destruction(&self) -> bool {
        self.entity.is_pending_destruction()
    }

    /// Whether the entity holds a `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.scene.has_component::<T>(self.handle())
    }

    /// The `T` of this entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::NoSuchComponent`](crate::EcsError::NoSuchComponent) if absent.
    pub fn get<T: Component>(&self) -> EcsResult<&'a T> {
        self.scene.component::<T>(self.handle())
    }

    /// Parent view, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let parent = self.scene.entities().record(self.entity.parent_id()?)?;
        Some(self.wrap(parent))
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = EntityRef<'a>> + 'a {
        let scene = self.scene;
        scene
            .entities()
            .children_of(self.entity)
            .map(move |entity| EntityRef::new(scene, entity))
    }

    /// First direct child matching `predicate`.
    pub fn find_first_child(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Option<Self> {
        self.children().find(|e| predicate(e))
    }

    /// Direct children matching `predicate`.
    pub fn find_children(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Vec<Self> {
        self.children().filter(|e| predicate(e)).collect()
    }

    /// First descendant (pre-order) matching `predicate`.
    pub fn find_first_descendant(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Option<Self> {
        self.scene
            .entities()
            .descendants_of(self.entity)
            .map(|entity| self.wrap(entity))
            .find(|e| predicate(e))
    }

    /// Descendants (pre-order) matching `predicate`.
    pub fn find_descendants(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Vec<Self> {
        self.scene
            .entities()
            .descendants_of(self.entity)
            .map(|entity| self.wrap(entity))
            .filter(|e| predicate(e))
            .collect()
    }

    /// Nearest ancestor matching `predicate`.
    pub fn find_first_ancestor(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Option<Self> {
        self.scene
            .entities()
            .ancestors_of(self.entity)
            .map(|entity| self.wrap(entity))
            .find(|e| predicate(e))
    }

    /// Ancestors matching `predicate`, nearest first.
    pub fn find_ancestors(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Vec<Self> {
        self.scene
            .entities()
            .ancestors_of(self.entity)
            .map(|entity| self.wrap(entity))
            .filter(|e| predicate(e))
            .collect()
    }

    const fn wrap(&self, entity: &'a Entity) -> Self {
        Self::new(self.scene, entity)
    }
}

/// Write view of one entity.
///
/// Every method re-validates the handle, so the view stays safe after the
/// entity is queued for destruction.
pub struct EntityMut<'a> {
    scene: &'a mut Scene,
    handle: EntityHandle,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(scene: &'a mut Scene, handle: EntityHandle) -> Self {
        Self { scene, handle }
    }

    /// Handle of this entity.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Read view of this entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`](crate::EcsError::InvalidEntity) if the
    /// entity is gone.
    pub fn view(&self) -> EcsResult<EntityRef<'_>> {
        self.scene.entity(self.handle)
    }

    /// See [`Scene::add_component`].
    ///
    /// # Errors
    ///
    /// See [`Scene::add_component`].
    pub fn add<T: Component>(&mut self, value: T) -> EcsResult<&mut T> {
        self.scene.add_component(self.handle, value)
    }

    /// See [`Scene::remove_component`].
    ///
    /// # Errors
    ///
    /// See [`Scene::remove_component`].
    pub fn remove<T: Component>(&mut self) -> EcsResult<T> {
        self.scene.remove_component(self.handle)
    }

    /// See [`Scene::replace_component`].
    ///
    /// # Errors
    ///
    /// See [`Scene::replace_component`].
    pub fn replace<T: Component>(&mut self, value: T) -> EcsResult<&mut T> {
        self.scene.replace_component(self.handle, value)
    }

    /// Whether the entity holds a `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.scene.has_component::<T>(self.handle)
    }

    /// See [`Scene::component`].
    ///
    /// # Errors
    ///
    /// See [`Scene::component`].
    pub fn get<T: Component>(&self) -> EcsResult<&T> {
        self.scene.component(self.handle)
    }

    /// See [`Scene::component_mut`].
    ///
    /// # Errors
    ///
    /// See [`Scene::component_mut`].
    pub fn get_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.scene.component_mut(self.handle)
    }

    /// Renames the entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`](crate::EcsError::InvalidEntity) if the
    /// entity is gone.
    pub fn set_name(&mut self, name: impl Into<String>) -> EcsResult<()> {
        self.scene
            .entities_mut()
            .set_name(self.handle, Some(name.into()))
    }

    /// See [`Scene::activate`].
    ///
    /// # Errors
    ///
    /// See [`Scene::activate`].
    pub fn activate(&mut self) -> EcsResult<()> {
        self.scene.activate(self.handle)
    }

    /// See [`Scene::destroy`].
    ///
    /// # Errors
    ///
    /// See [`Scene::destroy`].
    pub fn destroy(&mut self) -> EcsResult<()> {
        self.scene.destroy(self.handle)
    }

    /// See [`Scene::destroy_all_children`].
    ///
    /// # Errors
    ///
    /// See [`Scene::destroy_all_children`].
    pub fn destroy_all_children(&mut self) -> EcsResult<()> {
        self.scene.destroy_all_children(self.handle)
    }

    /// Attaches `child` under this entity.
    ///
    /// # Errors
    ///
    /// See [`Scene::add_child`].
    pub fn add_child(&mut self, child: EntityHandle) -> EcsResult<()> {
        self.scene.add_child(self.handle, child)
    }

    /// Detaches `child` from this entity.
    ///
    /// # Errors
    ///
    /// See [`Scene::remove_child`].
    pub fn remove_child(&mut self, child: EntityHandle) -> EcsResult<()> {
        self.scene.remove_child(self.handle, child)
    }

    /// Creates an entity and attaches it as a child.
    ///
    /// The child starts queued for activation when this entity is
    /// activated or queued itself, so that the pair stays consistent.
    ///
    /// # Errors
    ///
    /// See [`Scene::add_child`].
    pub fn create_child(&mut self, name: Option<String>) -> EcsResult<EntityHandle> {
        let live = {
            let entity = self.scene.entities().get(self.handle)?;
            entity.is_activated() || entity.is_pending_activation()
        };
        let child = self.scene.entities_mut().create(name);
        if live {
            self.scene.activate(child)?;
        }
        self.scene.add_child(self.handle, child)?;
        Ok(child)
    }

    /// See [`Scene::clone_entity`].
    ///
    /// # Errors
    ///
    /// See [`Scene::clone_entity`].
    pub fn clone_entity(&mut self) -> EcsResult<EntityHandle> {
        self.scene.clone_entity(self.handle)
    }
}
