//! # Component System
//!
//! Components are plain data attached to entities, at most one value of a
//! given type per entity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::entity::SceneId;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Clone`: entities can be cloned together with their components
/// - `Send`: a scene can be moved to the thread that drives it
///
/// # Example
///
/// ```rust
/// use tessera_core::Component;
///
/// #[derive(Clone, Debug)]
/// struct Health {
///     value: u32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Clone + Send + 'static {
    /// Human-readable type name used in error messages and logs.
    #[must_use]
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Slot index of a component inside its store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Wraps a raw slot index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weak reference to a component of type `T`.
///
/// Like [`EntityHandle`](super::EntityHandle), the handle carries the slot
/// generation and is rejected once the component is removed.
pub struct ComponentHandle<T> {
    scene: SceneId,
    id: ComponentId,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentHandle<T> {
    #[inline]
    pub(crate) const fn new(scene: SceneId, id: ComponentId, generation: u32) -> Self {
        Self {
            scene,
            id,
            generation,
            _marker: PhantomData,
        }
    }

    /// Scene that issued this handle.
    #[inline]
    #[must_use]
    pub const fn scene(&self) -> SceneId {
        self.scene
    }

    /// Slot id of the component.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Generation of the slot when the handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: derives would put bounds on `T`.
impl<T> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentHandle<T> {}

impl<T> PartialEq for ComponentHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.scene == other.scene && self.id == other.id && self.generation == other.generation
    }
}

impl<T> Eq for ComponentHandle<T> {}

impl<T> Hash for ComponentHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scene.hash(state);
        self.id.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("scene", &self.scene)
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish()
    }
}
