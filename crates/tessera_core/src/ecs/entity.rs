//! # Entity Management
//!
//! Entities are lightweight records identified by:
//! - A slot id into the entity store
//! - A generation counter for safe reuse
//! - The id of the scene that owns them

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Slot index of an entity inside its store.
///
/// Ids are recycled after destruction; hold an [`EntityHandle`] to refer to
/// an entity across a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
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

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-unique identifier of a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SceneId(u32);

impl SceneId {
    /// Allocates the next scene id.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weak reference to an entity.
///
/// A handle stays cheap to copy and never keeps the entity alive. Once the
/// entity is destroyed and its slot recycled, the slot generation moves on
/// and the handle is rejected by every lookup instead of aliasing the new
/// occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    scene: SceneId,
    id: EntityId,
    generation: u32,
}

impl EntityHandle {
    #[inline]
    pub(crate) const fn new(scene: SceneId, id: EntityId, generation: u32) -> Self {
        Self {
            scene,
            id,
            generation,
        }
    }

    /// Scene that issued this handle.
    #[inline]
    #[must_use]
    pub const fn scene(self) -> SceneId {
        self.scene
    }

    /// Slot id of the entity.
    #[inline]
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Generation of the slot when the handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}@scene{}", self.id, self.generation, self.scene)
    }
}

/// Entity record owned by an [`EntityStore`](super::EntityStore).
///
/// Holds no component data, only identity, activation state and the
/// parent/child links.
#[derive(Clone, Debug)]
pub struct Entity {
    pub(crate) handle: EntityHandle,
    pub(crate) name: Option<String>,
    pub(crate) activated: bool,
    pub(crate) pending_activation: bool,
    pub(crate) pending_destruction: bool,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
}

impl Entity {
    pub(crate) const fn new(handle: EntityHandle, name: Option<String>) -> Self {
        Self {
            handle,
            name,
            activated: false,
            pending_activation: false,
            pending_destruction: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Handle referring to this entity.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Slot id of this entity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.handle.id
    }

    /// Optional label; not required to be unique.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the entity is visible to iteration and queries.
    #[inline]
    #[must_use]
    pub const fn is_activated(&self) -> bool {
        self.activated
    }

    /// Whether the entity will be activated on the next refresh.
    #[inline]
    #[must_use]
    pub const fn is_pending_activation(&self) -> bool {
        self.pending_activation
    }

    /// Whether the entity will be destroyed on the next refresh.
    #[inline]
    #[must_use]
    pub const fn is_pending_destruction(&self) -> bool {
        self.pending_destruction
    }

    /// Activated, or about to be.
    #[inline]
    pub(crate) const fn is_live(&self) -> bool {
        self.activated || self.pending_activation
    }

    /// Slot id of the parent, if any.
    #[inline]
    #[must_use]
    pub const fn parent_id(&self) -> Option<EntityId> {
        self.parent
    }

    /// Slot ids of the children, in insertion order.
    #[inline]
    #[must_use]
    pub fn child_ids(&self) -> &[EntityId] {
        &self.children
    }

    /// Whether the entity has at least one child.
    #[inline]
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}
