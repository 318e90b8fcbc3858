//! # TESSERA Core
//!
//! Entity Component System built around scenes:
//! - Entities are created inert, activated in a batch and destroyed in a batch
//! - Components live in one typed store per component type
//! - Every cross-reference goes through a generation-checked handle
//!
//! ## Lifecycle
//!
//! 1. **create** - the entity exists but is invisible to iteration
//! 2. **activate** - the entity (and its children) is queued
//! 3. **refresh** - queued entities become visible and listeners are notified
//! 4. **destroy** + **refresh** - components are removed and the slot recycled
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Component, Scene};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//! impl Component for Position {}
//!
//! let mut scene = Scene::new();
//! let entity = scene.create_entity();
//! scene.add_component(entity, Position { x: 1.0, y: 2.0 }).unwrap();
//! scene.activate(entity).unwrap();
//! assert_eq!(scene.entity_count(), 0);
//!
//! scene.refresh();
//! assert_eq!(scene.entity_count(), 1);
//!
//! scene.destroy(entity).unwrap();
//! scene.refresh();
//! assert!(scene.entity(entity).is_err());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::SceneConfig;
pub use ecs::{
    AncestorIter, ChildIter, Component, ComponentEvent, ComponentEventKind, ComponentHandle,
    ComponentId, ComponentIter, ComponentIterMut, ComponentListener, ComponentRegistry,
    ComponentStore, DescendantIter, Entity, EntityDescription, EntityEvent, EntityEventKind,
    EntityHandle, EntityId, EntityIter, EntityListener, EntityMut, EntityRef, EntityStore, Scene,
    SceneDescription, SceneId,
};
pub use error::{EcsError, EcsResult, ErrorKind};
pub use memory::IdPool;
