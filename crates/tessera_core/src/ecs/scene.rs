//! # Scene
//!
//! The container for one entity store and one component store per
//! component type. All structural changes queued by `activate` / `destroy`
//! become visible in [`Scene::refresh`].
//!
//! ## Refresh Order
//!
//! 1. `Create` events for entities created since the last refresh
//! 2. Activations: entity flag, component `Add` events, entity `Activate`
//! 3. Destructions: entity `Destroy`, component `Remove` events, slot release

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::component::Component;
use super::description::{EntityDescription, SceneDescription};
use super::entity::{Entity, EntityHandle, EntityId, SceneId};
use super::entity_store::EntityStore;
use super::event::{EntityEvent, EntityListener};
use super::registry::ComponentRegistry;
use super::storage::{AnyComponentStore, ComponentStore};
use super::view::{EntityMut, EntityRef};
use crate::config::SceneConfig;
use crate::error::{EcsError, EcsResult};

/// A self-contained world of entities and components.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Component, Scene};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Name(&'static str);
/// impl Component for Name {}
///
/// let mut scene = Scene::new();
/// let parent = scene.create_entity();
/// let child = scene.create_entity();
/// scene.add_component(child, Name("wheel")).unwrap();
/// scene.add_child(parent, child).unwrap();
/// scene.activate(parent).unwrap();
/// scene.refresh();
///
/// assert_eq!(scene.entity_count(), 2);
/// assert!(scene.entity(child).unwrap().is_activated());
/// ```
pub struct Scene {
    id: SceneId,
    config: SceneConfig,
    entities: EntityStore,
    stores: HashMap<TypeId, Box<dyn AnyComponentStore>>,
    /// Registration order of the component types.
    store_order: Vec<TypeId>,
    registry: Option<Arc<ComponentRegistry>>,
}

impl Scene {
    /// Creates an empty scene with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SceneConfig::default())
    }

    /// Creates an empty scene.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the configuration does not validate.
    pub fn with_config(config: SceneConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates a scene with a store for every type in `registry`.
    ///
    /// The registry is kept for [`load_description`](Self::load_description).
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the configuration does not validate.
    pub fn with_registry(config: SceneConfig, registry: Arc<ComponentRegistry>) -> EcsResult<Self> {
        let mut scene = Self::with_config(config)?;
        registry.install_all(&mut scene)?;
        scene.registry = Some(registry);
        Ok(scene)
    }

    fn build(config: SceneConfig) -> Self {
        let id = SceneId::next();
        let entities = if config.trace_lifecycle {
            EntityStore::with_listener(
                id,
                config.entity_chunk_size,
                Arc::new(Mutex::new(LifecycleTracer)),
            )
        } else {
            EntityStore::new(id, config.entity_chunk_size)
        };
        debug!(scene = id.value(), chunk = config.entity_chunk_size, "scene created");
        Self {
            id,
            config,
            entities,
            stores: HashMap::new(),
            store_order: Vec::new(),
            registry: None,
        }
    }

    /// Identifier carried by every handle this scene issues.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SceneId {
        self.id
    }

    /// Configuration the scene was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Component registry, if the scene was built with one.
    #[must_use]
    pub fn registry(&self) -> Option<&Arc<ComponentRegistry>> {
        self.registry.as_ref()
    }

    // =========================================================================
    // Component stores
    // =========================================================================

    /// Creates the store for `T`.
    ///
    /// Stores are also created on demand by [`add_component`](Self::add_component).
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentTypeAlreadyRegistered`] if `T` already has a store.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        if self.supports_component::<T>() {
            return Err(EcsError::ComponentTypeAlreadyRegistered(T::type_name()));
        }
        self.ensure_component::<T>()
    }

    /// Returns the store for `T`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponentType`] if the store registered for `T`
    /// has an unexpected type.
    pub fn ensure_component<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        Self::store_entry::<T>(&mut self.stores, &mut self.store_order, self.id)
    }

    /// Whether a store for `T` exists.
    #[must_use]
    pub fn supports_component<T: Component>(&self) -> bool {
        self.stores.contains_key(&TypeId::of::<T>())
    }

    /// Store for `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponentType`] if no store for `T` exists.
    pub fn components<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|store| store.as_any().downcast_ref::<ComponentStore<T>>())
            .ok_or(EcsError::UnknownComponentType(T::type_name()))
    }

    /// Mutable store for `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponentType`] if no store for `T` exists.
    pub fn components_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .ok_or(EcsError::UnknownComponentType(T::type_name()))
    }

    /// Type names of the component stores, in registration order.
    pub fn component_type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.store_order
            .iter()
            .filter_map(|type_id| self.stores.get(type_id))
            .map(|store| store.type_name())
    }

    fn store_entry<'a, T: Component>(
        stores: &'a mut HashMap<TypeId, Box<dyn AnyComponentStore>>,
        store_order: &mut Vec<TypeId>,
        scene: SceneId,
    ) -> EcsResult<&'a mut ComponentStore<T>> {
        let type_id = TypeId::of::<T>();
        let store = stores.entry(type_id).or_insert_with(|| {
            store_order.push(type_id);
            debug!(scene = scene.value(), component = T::type_name(), "component store registered");
            Box::new(ComponentStore::<T>::new(scene)) as Box<dyn AnyComponentStore>
        });
        store
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::UnknownComponentType(T::type_name()))
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// The entity store.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Mutable entity store, for graph and lifecycle operations that do not
    /// involve components.
    #[inline]
    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    /// Creates an inert, unnamed entity.
    pub fn create_entity(&mut self) -> EntityHandle {
        self.entities.create(None)
    }

    /// Creates an inert, named entity.
    pub fn create_named_entity(&mut self, name: impl Into<String>) -> EntityHandle {
        self.entities.create(Some(name.into()))
    }

    /// Read view of an entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] / [`EcsError::ForeignEntity`].
    pub fn entity(&self, handle: EntityHandle) -> EcsResult<EntityRef<'_>> {
        let entity = self.entities.get(handle)?;
        Ok(EntityRef::new(self, entity))
    }

    /// Write view of an entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] / [`EcsError::ForeignEntity`].
    pub fn entity_mut(&mut self, handle: EntityHandle) -> EcsResult<EntityMut<'_>> {
        self.entities.get(handle)?;
        Ok(EntityMut::new(self, handle))
    }

    /// Number of activated entities.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.entities.activated_count()
    }

    /// Queues an entity and its children for activation.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::activate`].
    pub fn activate(&mut self, handle: EntityHandle) -> EcsResult<()> {
        self.entities.activate(handle)
    }

    /// Queues an entity and its descendants for destruction.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::destroy`].
    pub fn destroy(&mut self, handle: EntityHandle) -> EcsResult<()> {
        self.entities.destroy(handle)
    }

    /// Queues every descendant of an entity for destruction.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::destroy_all_children`].
    pub fn destroy_all_children(&mut self, handle: EntityHandle) -> EcsResult<()> {
        self.entities.destroy_all_children(handle)
    }

    /// Attaches `child` under `parent`.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::add_child`].
    pub fn add_child(&mut self, parent: EntityHandle, child: EntityHandle) -> EcsResult<()> {
        self.entities.add_child(parent, child)
    }

    /// Detaches `child` from `parent`.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::remove_child`].
    pub fn remove_child(&mut self, parent: EntityHandle, child: EntityHandle) -> EcsResult<()> {
        self.entities.remove_child(parent, child)
    }

    /// Clones an entity, its components and its whole subtree.
    ///
    /// The clone keeps the name, is not activated and has no parent.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] / [`EcsError::ForeignEntity`].
    pub fn clone_entity(&mut self, handle: EntityHandle) -> EcsResult<EntityHandle> {
        self.entities.get(handle)?;
        let mut root = None;
        // (source, parent of its clone); pre-order so siblings keep their order.
        let mut work: Vec<(EntityHandle, Option<EntityId>)> = vec![(handle, None)];
        while let Some((source, parent)) = work.pop() {
            let entity = self.entities.get(source)?;
            let name = entity.name.clone();
            let children: Vec<EntityHandle> = entity
                .children
                .iter()
                .filter_map(|&id| self.entities.with_id(id))
                .collect();

            let clone = self.entities.create(name);
            let dest = self.entities.get(clone)?;
            for type_id in &self.store_order {
                if let Some(store) = self.stores.get_mut(type_id) {
                    store.clone_entity(source, dest)?;
                }
            }

            match parent {
                Some(parent) => self.entities.attach(parent, clone.id()),
                None => root = Some(clone),
            }
            work.extend(children.into_iter().rev().map(|child| (child, Some(clone.id()))));
        }
        root.ok_or(EcsError::InvalidEntity(handle))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches `value` to an entity, creating the store for `T` if needed.
    ///
    /// When the entity is already activated, listeners see `Add` right away;
    /// otherwise they see it when the entity is activated.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`], [`EcsError::ForeignEntity`] or
    /// [`EcsError::AlreadyHasComponent`].
    pub fn add_component<T: Component>(&mut self, handle: EntityHandle, value: T) -> EcsResult<&mut T> {
        let entity = self.entities.get(handle)?;
        Self::store_entry::<T>(&mut self.stores, &mut self.store_order, self.id)?.add(entity, value)
    }

    /// Detaches and returns the `T` of an entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`], [`EcsError::ForeignEntity`] or
    /// [`EcsError::NoSuchComponent`].
    pub fn remove_component<T: Component>(&mut self, handle: EntityHandle) -> EcsResult<T> {
        self.entities.get(handle)?;
        self.typed_store_mut::<T>(handle)?.remove(handle)
    }

    /// Replaces the `T` of an entity in place.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`], [`EcsError::ForeignEntity`] or
    /// [`EcsError::NoSuchComponent`].
    pub fn replace_component<T: Component>(&mut self, handle: EntityHandle, value: T) -> EcsResult<&mut T> {
        self.entities.get(handle)?;
        self.typed_store_mut::<T>(handle)?.replace(handle, value)
    }

    /// Whether an entity holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, handle: EntityHandle) -> bool {
        self.components::<T>().is_ok_and(|store| store.has(handle))
    }

    /// The `T` of an entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`], [`EcsError::ForeignEntity`] or
    /// [`EcsError::NoSuchComponent`].
    pub fn component<T: Component>(&self, handle: EntityHandle) -> EcsResult<&T> {
        self.entities.get(handle)?;
        self.components::<T>()
            .map_err(|_| Self::no_such::<T>(handle))?
            .get(handle)
    }

    /// Mutable variant of [`component`](Self::component).
    ///
    /// # Errors
    ///
    /// Same as [`component`](Self::component).
    pub fn component_mut<T: Component>(&mut self, handle: EntityHandle) -> EcsResult<&mut T> {
        self.entities.get(handle)?;
        self.typed_store_mut::<T>(handle)?.get_mut(handle)
    }

    fn typed_store_mut<T: Component>(&mut self, handle: EntityHandle) -> EcsResult<&mut ComponentStore<T>> {
        self.components_mut::<T>()
            .map_err(|_| Self::no_such::<T>(handle))
    }

    fn no_such<T: Component>(entity: EntityHandle) -> EcsError {
        EcsError::NoSuchComponent {
            entity,
            type_name: T::type_name(),
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Applies every queued creation, activation and destruction.
    ///
    /// Work queued by the time `refresh` starts is applied in full; the
    /// result is visible to iteration and queries once it returns.
    pub fn refresh(&mut self) {
        if !self.entities.has_pending() {
            return;
        }

        let created = self.entities.take_pending_creation();
        for &id in &created {
            self.entities.commit_creation(id);
        }

        let activations = self.entities.take_pending_activation();
        for &id in &activations {
            let Some(handle) = self.entities.commit_activation(id) else {
                continue;
            };
            for type_id in &self.store_order {
                if let Some(store) = self.stores.get_mut(type_id) {
                    store.activate_entity(handle);
                }
            }
            self.entities.finish_activation(id);
        }

        let destructions = self.entities.take_pending_destruction();
        for &id in &destructions {
            let Some(handle) = self.entities.commit_destruction(id) else {
                continue;
            };
            for type_id in &self.store_order {
                if let Some(store) = self.stores.get_mut(type_id) {
                    store.remove_entity(handle);
                }
            }
            self.entities.finish_destruction(id);
        }

        debug!(
            scene = self.id.value(),
            created = created.len(),
            activated = activations.len(),
            destroyed = destructions.len(),
            live = self.entities.activated_count(),
            "scene refreshed"
        );
    }

    // =========================================================================
    // Descriptions
    // =========================================================================

    /// Builds the entities of a description, activates every root and
    /// refreshes.
    ///
    /// Components are decoded through the scene's registry. On failure the
    /// partially built root is queued for destruction and the error returned;
    /// roots built before it stay queued for activation.
    ///
    /// # Errors
    ///
    /// - [`EcsError::MissingRegistry`] if the scene has no registry
    /// - [`EcsError::UnknownComponentTag`] / [`EcsError::Decode`] for bad
    ///   component entries
    pub fn load_description(&mut self, description: &SceneDescription) -> EcsResult<Vec<EntityHandle>> {
        let registry = self.registry.clone().ok_or(EcsError::MissingRegistry)?;
        let mut roots = Vec::with_capacity(description.entities.len());
        for entry in &description.entities {
            let root = self.create_entity();
            if let Err(err) = self.build_entity(&registry, root, entry) {
                self.entities.destroy(root)?;
                return Err(err);
            }
            self.entities.activate(root)?;
            roots.push(root);
        }
        self.refresh();
        Ok(roots)
    }

    fn build_entity(
        &mut self,
        registry: &ComponentRegistry,
        entity: EntityHandle,
        description: &EntityDescription,
    ) -> EcsResult<()> {
        self.entities.set_name(entity, description.name.clone())?;
        for (tag, value) in &description.components {
            registry.decode(self, entity, tag, value.clone())?;
        }
        for child_description in &description.children {
            let child = self.create_entity();
            self.entities.add_child(entity, child)?;
            self.build_entity(registry, child, child_description)?;
        }
        Ok(())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every entity lifecycle transition at trace level.
struct LifecycleTracer;

impl EntityListener for LifecycleTracer {
    fn receive_event(&mut self, event: &EntityEvent, entity: &Entity) {
        trace!(
            scene = event.entity.scene().value(),
            entity = event.entity.id().index(),
            generation = event.entity.generation(),
            name = entity.name().unwrap_or(""),
            kind = ?event.kind,
            "entity event"
        );
    }
}
