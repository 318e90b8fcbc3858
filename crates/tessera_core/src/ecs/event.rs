//! # Lifecycle Events
//!
//! Systems observe a scene by registering listeners:
//! - [`ComponentListener<T>`] on a component store (`Add` / `Remove`)
//! - [`EntityListener`] on the entity store (`Create` / `Activate` / `Destroy`)
//!
//! Listeners are shared as `Arc<Mutex<_>>` so the registering system keeps
//! its own reference to the listener state.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::component::ComponentHandle;
use super::entity::{Entity, EntityHandle};
use crate::error::{EcsError, EcsResult};

/// What happened to a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentEventKind {
    /// Component became visible: its entity was activated, or it was added to
    /// an already activated entity.
    Add,
    /// Component of an activated entity is about to be removed.
    Remove,
}

/// Event delivered to [`ComponentListener`]s.
pub struct ComponentEvent<T> {
    /// What happened.
    pub kind: ComponentEventKind,
    /// Owning entity.
    pub entity: EntityHandle,
    /// The component concerned.
    pub component: ComponentHandle<T>,
}

impl<T> Clone for ComponentEvent<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentEvent<T> {}

impl<T> fmt::Debug for ComponentEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentEvent")
            .field("kind", &self.kind)
            .field("entity", &self.entity)
            .field("component", &self.component)
            .finish()
    }
}

/// Receives component events of one component type.
pub trait ComponentListener<T>: Send {
    /// Called for every event; `component` is the value at dispatch time.
    fn receive_event(&mut self, event: &ComponentEvent<T>, component: &T);
}

/// What happened to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityEventKind {
    /// Entity was created (reported on the refresh following creation).
    Create,
    /// Entity became activated.
    Activate,
    /// Entity is about to be destroyed; its components are still attached.
    Destroy,
}

/// Event delivered to [`EntityListener`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityEvent {
    /// What happened.
    pub kind: EntityEventKind,
    /// The entity concerned.
    pub entity: EntityHandle,
}

/// Receives entity lifecycle events.
pub trait EntityListener: Send {
    /// Called for every event with the entity record at dispatch time.
    fn receive_event(&mut self, event: &EntityEvent, entity: &Entity);
}

/// Ordered set of shared listeners.
pub(crate) struct Dispatcher<L: ?Sized> {
    listeners: Vec<Arc<Mutex<L>>>,
}

impl<L: ?Sized> Dispatcher<L> {
    pub(crate) const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub(crate) fn with_listener(listener: Arc<Mutex<L>>) -> Self {
        Self {
            listeners: vec![listener],
        }
    }

    pub(crate) fn register(&mut self, listener: Arc<Mutex<L>>) -> EcsResult<()> {
        if self.position(&listener).is_some() {
            return Err(EcsError::AlreadyRegistered);
        }
        self.listeners.push(listener);
        Ok(())
    }

    pub(crate) fn unregister<M: ?Sized>(&mut self, listener: &Arc<Mutex<M>>) -> EcsResult<()> {
        let index = self.position(listener).ok_or(EcsError::NotRegistered)?;
        self.listeners.remove(index);
        Ok(())
    }

    /// Calls `f` on every listener in registration order.
    pub(crate) fn dispatch(&self, mut f: impl FnMut(&mut L)) {
        for listener in &self.listeners {
            f(&mut *listener.lock());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    // Identity is the address of the shared allocation; vtables are ignored.
    fn position<M: ?Sized>(&self, listener: &Arc<Mutex<M>>) -> Option<usize> {
        let target = Arc::as_ptr(listener).cast::<()>();
        self.listeners
            .iter()
            .position(|l| Arc::as_ptr(l).cast::<()>() == target)
    }
}

impl<L: ?Sized> Default for Dispatcher<L> {
    fn default() -> Self {
        Self::new()
    }
}
