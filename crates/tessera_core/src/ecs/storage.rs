//! # Component Storage
//!
//! One store per component type. The store keeps:
//! - A dense slot array indexed by component id
//! - A reverse map from entity id to component id
//! - The listeners interested in this component type
//!
//! Structural mutation (`add`, `remove`, `replace`) goes through the
//! [`Scene`](super::Scene), which validates the owning entity first.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use super::component::{Component, ComponentHandle, ComponentId};
use super::entity::{Entity, EntityHandle, SceneId};
use super::event::{ComponentEvent, ComponentEventKind, ComponentListener, Dispatcher};
use super::iter::{ComponentIter, ComponentIterMut};
use crate::error::{EcsError, EcsResult};
use crate::memory::IdPool;

/// Live component plus the bookkeeping the store needs.
pub(crate) struct ComponentRecord<T> {
    pub(crate) value: T,
    pub(crate) entity: EntityHandle,
    pub(crate) generation: u32,
    /// Mirrors the owning entity's activation.
    pub(crate) activated: bool,
}

pub(crate) enum ComponentSlot<T> {
    Vacant { generation: u32 },
    Occupied(ComponentRecord<T>),
}

impl<T> ComponentSlot<T> {
    fn record(&self) -> Option<&ComponentRecord<T>> {
        match self {
            Self::Occupied(record) => Some(record),
            Self::Vacant { .. } => None,
        }
    }

    fn record_mut(&mut self) -> Option<&mut ComponentRecord<T>> {
        match self {
            Self::Occupied(record) => Some(record),
            Self::Vacant { .. } => None,
        }
    }
}

/// Storage for every component of type `T` in one scene.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Component, Scene};
///
/// #[derive(Clone)]
/// struct Health(u32);
/// impl Component for Health {}
///
/// let mut scene = Scene::new();
/// let entity = scene.create_entity();
/// scene.add_component(entity, Health(10)).unwrap();
/// scene.activate(entity).unwrap();
/// scene.refresh();
///
/// let healths = scene.components::<Health>().unwrap();
/// let total: u32 = healths.iter().map(|(_, h)| h.0).sum();
/// assert_eq!(total, 10);
/// ```
pub struct ComponentStore<T: Component> {
    scene: SceneId,
    slots: Vec<ComponentSlot<T>>,
    ids: IdPool,
    /// Indexed by entity id.
    entity_to_component: Vec<Option<ComponentId>>,
    listeners: Dispatcher<dyn ComponentListener<T>>,
}

impl<T: Component> ComponentStore<T> {
    pub(crate) fn new(scene: SceneId) -> Self {
        Self {
            scene,
            slots: Vec::new(),
            ids: IdPool::new(),
            entity_to_component: Vec::new(),
            listeners: Dispatcher::new(),
        }
    }

    /// Number of live components, activated or not.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.allocated_count()
    }

    /// Whether the store holds no components.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, including vacant ones.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether `entity` holds a component of this type.
    #[must_use]
    pub fn has(&self, entity: EntityHandle) -> bool {
        self.locate(entity).is_some()
    }

    /// Returns the component of `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ForeignEntity`] for a handle of another scene,
    /// [`EcsError::NoSuchComponent`] if the entity holds no `T`.
    pub fn get(&self, entity: EntityHandle) -> EcsResult<&T> {
        let id = self.require(entity)?;
        self.record(id)
            .map(|record| &record.value)
            .ok_or_else(|| Self::missing(entity))
    }

    /// Mutable variant of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut(&mut self, entity: EntityHandle) -> EcsResult<&mut T> {
        let id = self.require(entity)?;
        self.record_mut(id)
            .map(|record| &mut record.value)
            .ok_or_else(|| Self::missing(entity))
    }

    /// Returns a weak handle to the component of `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn handle(&self, entity: EntityHandle) -> EcsResult<ComponentHandle<T>> {
        let id = self.require(entity)?;
        self.record(id)
            .map(|record| ComponentHandle::new(self.scene, id, record.generation))
            .ok_or_else(|| Self::missing(entity))
    }

    /// Returns the live component in slot `id`, if any.
    #[must_use]
    pub fn with_id(&self, id: ComponentId) -> Option<&T> {
        self.record(id).map(|record| &record.value)
    }

    /// Whether `handle` still refers to a live component.
    #[must_use]
    pub fn is_valid(&self, handle: ComponentHandle<T>) -> bool {
        self.resolve_record(handle).is_some()
    }

    /// Dereferences a weak handle.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidComponent`] if the component was removed.
    pub fn resolve(&self, handle: ComponentHandle<T>) -> EcsResult<&T> {
        self.resolve_record(handle)
            .map(|record| &record.value)
            .ok_or(EcsError::InvalidComponent(T::type_name()))
    }

    /// Mutable variant of [`resolve`](Self::resolve).
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidComponent`] if the component was removed.
    pub fn resolve_mut(&mut self, handle: ComponentHandle<T>) -> EcsResult<&mut T> {
        if self.resolve_record(handle).is_none() {
            return Err(EcsError::InvalidComponent(T::type_name()));
        }
        self.record_mut(handle.id())
            .map(|record| &mut record.value)
            .ok_or(EcsError::InvalidComponent(T::type_name()))
    }

    /// Returns the entity owning the component behind `handle`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidComponent`] if the component was removed.
    pub fn entity_of(&self, handle: ComponentHandle<T>) -> EcsResult<EntityHandle> {
        self.resolve_record(handle)
            .map(|record| record.entity)
            .ok_or(EcsError::InvalidComponent(T::type_name()))
    }

    /// Iterates components of activated entities in component id order.
    #[must_use]
    pub fn iter(&self) -> ComponentIter<'_, T> {
        ComponentIter::new(&self.slots)
    }

    /// Mutable variant of [`iter`](Self::iter).
    #[must_use]
    pub fn iter_mut(&mut self) -> ComponentIterMut<'_, T> {
        ComponentIterMut::new(&mut self.slots)
    }

    /// First component (in iteration order) matching `predicate`.
    pub fn find_first(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<ComponentHandle<T>> {
        self.activated_records()
            .find(|(_, record)| predicate(&record.value))
            .map(|(id, record)| ComponentHandle::new(self.scene, id, record.generation))
    }

    /// All components (in iteration order) matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<ComponentHandle<T>> {
        self.activated_records()
            .filter(|(_, record)| predicate(&record.value))
            .map(|(id, record)| ComponentHandle::new(self.scene, id, record.generation))
            .collect()
    }

    /// Registers a listener for `Add` / `Remove` events.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`] if this listener is already registered.
    pub fn register_listener<L>(&mut self, listener: Arc<Mutex<L>>) -> EcsResult<()>
    where
        L: ComponentListener<T> + 'static,
    {
        let listener: Arc<Mutex<dyn ComponentListener<T>>> = listener;
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

    /// Attaches `value` to `entity`.
    ///
    /// Dispatches `Add` right away when the entity is already activated.
    pub(crate) fn add(&mut self, entity: &Entity, value: T) -> EcsResult<&mut T> {
        let owner = entity.handle();
        if self.has(owner) {
            return Err(EcsError::AlreadyHasComponent {
                entity: owner,
                type_name: T::type_name(),
            });
        }

        let id = ComponentId::new(self.ids.create());
        let index = id.as_usize();
        if index >= self.slots.len() {
            self.slots
                .resize_with(index + 1, || ComponentSlot::Vacant { generation: 0 });
        }
        let generation = match self.slots[index] {
            ComponentSlot::Vacant { generation } => generation,
            ComponentSlot::Occupied(_) => {
                error!("component slot {id} of {} handed out twice", T::type_name());
                return Err(EcsError::InvalidComponent(T::type_name()));
            }
        };
        self.slots[index] = ComponentSlot::Occupied(ComponentRecord {
            value,
            entity: owner,
            generation,
            activated: entity.is_activated(),
        });

        let entity_index = owner.id().as_usize();
        if entity_index >= self.entity_to_component.len() {
            self.entity_to_component.resize(entity_index + 1, None);
        }
        self.entity_to_component[entity_index] = Some(id);

        if entity.is_activated() {
            self.dispatch(ComponentEventKind::Add, id);
        }
        self.record_mut(id)
            .map(|record| &mut record.value)
            .ok_or(EcsError::InvalidComponent(T::type_name()))
    }

    /// Detaches and returns the component of `entity`.
    ///
    /// Dispatches `Remove` first when the entity is activated.
    pub(crate) fn remove(&mut self, entity: EntityHandle) -> EcsResult<T> {
        let id = self.require(entity)?;
        let activated = self.record(id).is_some_and(|record| record.activated);
        if activated {
            self.dispatch(ComponentEventKind::Remove, id);
        }

        let slot = &mut self.slots[id.as_usize()];
        let generation = slot.record().map_or(0, |record| record.generation);
        let previous = std::mem::replace(
            slot,
            ComponentSlot::Vacant {
                generation: generation.wrapping_add(1),
            },
        );
        let ComponentSlot::Occupied(record) = previous else {
            return Err(Self::missing(entity));
        };

        self.entity_to_component[entity.id().as_usize()] = None;
        self.ids.destroy(id.index());
        Ok(record.value)
    }

    /// Swaps the value in place, keeping the component id and handles.
    ///
    /// Dispatches `Remove` for the old value and `Add` for the new one when
    /// the entity is activated.
    pub(crate) fn replace(&mut self, entity: EntityHandle, value: T) -> EcsResult<&mut T> {
        let id = self.require(entity)?;
        let activated = self.record(id).is_some_and(|record| record.activated);
        if activated {
            self.dispatch(ComponentEventKind::Remove, id);
        }
        if let Some(record) = self.record_mut(id) {
            record.value = value;
        }
        if activated {
            self.dispatch(ComponentEventKind::Add, id);
        }
        self.record_mut(id)
            .map(|record| &mut record.value)
            .ok_or_else(|| Self::missing(entity))
    }

    /// Copies the component of `source` (if any) onto `dest`.
    pub(crate) fn clone_component(&mut self, source: EntityHandle, dest: &Entity) -> EcsResult<()> {
        let Some(value) = self.get(source).ok().cloned() else {
            return Ok(());
        };
        self.add(dest, value)?;
        Ok(())
    }

    /// Marks the component of `entity` activated and dispatches `Add`.
    pub(crate) fn activate_entity(&mut self, entity: EntityHandle) {
        let Some(id) = self.locate(entity) else {
            return;
        };
        if let Some(record) = self.record_mut(id) {
            record.activated = true;
        }
        self.dispatch(ComponentEventKind::Add, id);
    }

    fn dispatch(&self, kind: ComponentEventKind, id: ComponentId) {
        if self.listeners.is_empty() {
            return;
        }
        let Some(record) = self.record(id) else {
            return;
        };
        let event = ComponentEvent {
            kind,
            entity: record.entity,
            component: ComponentHandle::new(self.scene, id, record.generation),
        };
        self.listeners
            .dispatch(|listener| listener.receive_event(&event, &record.value));
    }

    fn record(&self, id: ComponentId) -> Option<&ComponentRecord<T>> {
        self.slots.get(id.as_usize()).and_then(ComponentSlot::record)
    }

    fn record_mut(&mut self, id: ComponentId) -> Option<&mut ComponentRecord<T>> {
        self.slots
            .get_mut(id.as_usize())
            .and_then(ComponentSlot::record_mut)
    }

    fn resolve_record(&self, handle: ComponentHandle<T>) -> Option<&ComponentRecord<T>> {
        if handle.scene() != self.scene {
            return None;
        }
        self.record(handle.id())
            .filter(|record| record.generation == handle.generation())
    }

    /// Component id held by exactly this entity (generation included).
    fn locate(&self, entity: EntityHandle) -> Option<ComponentId> {
        if entity.scene() != self.scene {
            return None;
        }
        let id = (*self.entity_to_component.get(entity.id().as_usize())?)?;
        self.record(id)
            .filter(|record| record.entity == entity)
            .map(|_| id)
    }

    fn require(&self, entity: EntityHandle) -> EcsResult<ComponentId> {
        if entity.scene() != self.scene {
            return Err(EcsError::ForeignEntity(entity));
        }
        self.locate(entity).ok_or_else(|| Self::missing(entity))
    }

    fn activated_records(&self) -> impl Iterator<Item = (ComponentId, &ComponentRecord<T>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let record = slot.record()?;
            #[allow(clippy::cast_possible_truncation)]
            let id = ComponentId::new(index as u32);
            record.activated.then_some((id, record))
        })
    }

    fn missing(entity: EntityHandle) -> EcsError {
        EcsError::NoSuchComponent {
            entity,
            type_name: T::type_name(),
        }
    }
}

impl<'a, T: Component> IntoIterator for &'a ComponentStore<T> {
    type Item = (EntityHandle, &'a T);
    type IntoIter = ComponentIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Type-erased view of a [`ComponentStore`] used by the scene.
pub(crate) trait AnyComponentStore: Send {
    fn type_name(&self) -> &'static str;
    fn activate_entity(&mut self, entity: EntityHandle);
    fn remove_entity(&mut self, entity: EntityHandle);
    fn clone_entity(&mut self, source: EntityHandle, dest: &Entity) -> EcsResult<()>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyComponentStore for ComponentStore<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn activate_entity(&mut self, entity: EntityHandle) {
        ComponentStore::activate_entity(self, entity);
    }

    fn remove_entity(&mut self, entity: EntityHandle) {
        if self.has(entity) {
            // Value is dropped; listeners already saw `Remove`.
            let _ = self.remove(entity);
        }
    }

    fn clone_entity(&mut self, source: EntityHandle, dest: &Entity) -> EcsResult<()> {
        self.clone_component(source, dest)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::EntityId;

    #[derive(Clone, Debug, PartialEq)]
    struct Mass(f32);

    impl Component for Mass {}

    #[derive(Default)]
    struct Recorder {
        events: Vec<(ComponentEventKind, EntityHandle, f32)>,
    }

    impl ComponentListener<Mass> for Recorder {
        fn receive_event(&mut self, event: &ComponentEvent<Mass>, component: &Mass) {
            self.events.push((event.kind, event.entity, component.0));
        }
    }

    fn entity(scene: SceneId, index: u32, activated: bool) -> Entity {
        let mut entity = Entity::new(EntityHandle::new(scene, EntityId::new(index), 0), None);
        entity.activated = activated;
        entity
    }

    #[test]
    fn test_add_get_remove() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        let e = entity(scene, 4, false);

        store.add(&e, Mass(2.0)).unwrap();
        assert!(store.has(e.handle()));
        assert_eq!(store.get(e.handle()).unwrap(), &Mass(2.0));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove(e.handle()).unwrap(), Mass(2.0));
        assert!(!store.has(e.handle()));
        assert!(store.is_empty());
        assert!(matches!(
            store.get(e.handle()),
            Err(EcsError::NoSuchComponent { .. })
        ));
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        let e = entity(scene, 0, false);
        store.add(&e, Mass(1.0)).unwrap();
        assert!(matches!(
            store.add(&e, Mass(3.0)),
            Err(EcsError::AlreadyHasComponent { .. })
        ));
        assert_eq!(store.get(e.handle()).unwrap(), &Mass(1.0));
    }

    #[test]
    fn test_handle_invalidated_by_reuse() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        let a = entity(scene, 0, true);
        let b = entity(scene, 1, true);

        store.add(&a, Mass(1.0)).unwrap();
        let stale = store.handle(a.handle()).unwrap();
        store.remove(a.handle()).unwrap();
        store.add(&b, Mass(5.0)).unwrap();

        let fresh = store.handle(b.handle()).unwrap();
        assert_eq!(stale.id(), fresh.id());
        assert_ne!(stale, fresh);
        assert!(!store.is_valid(stale));
        assert_eq!(store.resolve(stale), Err(EcsError::InvalidComponent(Mass::type_name())));
        assert_eq!(store.resolve(fresh).unwrap(), &Mass(5.0));
        assert_eq!(store.entity_of(fresh).unwrap(), b.handle());
    }

    #[test]
    fn test_events_only_for_activated_entities() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        store.register_listener(recorder.clone()).unwrap();

        let inert = entity(scene, 0, false);
        let live = entity(scene, 1, true);
        store.add(&inert, Mass(1.0)).unwrap();
        store.add(&live, Mass(2.0)).unwrap();
        store.remove(inert.handle()).unwrap();
        store.remove(live.handle()).unwrap();

        let recorder = recorder.lock();
        assert_eq!(
            recorder.events.as_slice(),
            &[
                (ComponentEventKind::Add, live.handle(), 2.0),
                (ComponentEventKind::Remove, live.handle(), 2.0),
            ]
        );
    }

    #[test]
    fn test_replace_dispatches_remove_then_add() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        store.register_listener(recorder.clone()).unwrap();

        let e = entity(scene, 0, true);
        store.add(&e, Mass(1.0)).unwrap();
        let before = store.handle(e.handle()).unwrap();
        store.replace(e.handle(), Mass(9.0)).unwrap();

        assert_eq!(store.handle(e.handle()).unwrap(), before);
        let kinds: Vec<_> = recorder.lock().events.iter().map(|(k, _, v)| (*k, *v)).collect();
        assert_eq!(
            kinds,
            vec![
                (ComponentEventKind::Add, 1.0),
                (ComponentEventKind::Remove, 1.0),
                (ComponentEventKind::Add, 9.0),
            ]
        );
    }

    #[test]
    fn test_listener_registration_errors() {
        let mut store = ComponentStore::<Mass>::new(SceneId::next());
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        assert_eq!(store.unregister_listener(&recorder), Err(EcsError::NotRegistered));
        store.register_listener(recorder.clone()).unwrap();
        assert_eq!(
            store.register_listener(recorder.clone()),
            Err(EcsError::AlreadyRegistered)
        );
        store.unregister_listener(&recorder).unwrap();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_iteration_skips_inactive() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        store.add(&entity(scene, 0, false), Mass(0.0)).unwrap();
        store.add(&entity(scene, 1, true), Mass(1.0)).unwrap();
        store.add(&entity(scene, 2, true), Mass(2.0)).unwrap();

        let values: Vec<f32> = store.iter().map(|(_, m)| m.0).collect();
        assert_eq!(values, vec![1.0, 2.0]);

        for (_, mass) in store.iter_mut() {
            mass.0 *= 10.0;
        }
        let values: Vec<f32> = store.iter().map(|(_, m)| m.0).collect();
        assert_eq!(values, vec![10.0, 20.0]);
    }

    #[test]
    fn test_find() {
        let scene = SceneId::next();
        let mut store = ComponentStore::<Mass>::new(scene);
        store.add(&entity(scene, 0, true), Mass(1.0)).unwrap();
        store.add(&entity(scene, 1, false), Mass(7.0)).unwrap();
        store.add(&entity(scene, 2, true), Mass(7.0)).unwrap();
        store.add(&entity(scene, 3, true), Mass(8.0)).unwrap();

        let first = store.find_first(|m| m.0 > 5.0).unwrap();
        assert_eq!(store.resolve(first).unwrap(), &Mass(7.0));
        assert_eq!(store.entity_of(first).unwrap().id().index(), 2);

        let all = store.find(|m| m.0 > 5.0);
        assert_eq!(all.len(), 2);
        assert!(store.find_first(|m| m.0 > 100.0).is_none());
    }

    #[test]
    fn test_foreign_entity_rejected() {
        let mut store = ComponentStore::<Mass>::new(SceneId::next());
        let foreign = entity(SceneId::next(), 0, false);
        assert!(!store.has(foreign.handle()));
        assert_eq!(
            store.get(foreign.handle()),
            Err(EcsError::ForeignEntity(foreign.handle()))
        );
        assert!(store.get_mut(foreign.handle()).is_err());
    }
}
