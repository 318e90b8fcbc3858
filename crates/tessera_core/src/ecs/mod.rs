//! # Entity Component System
//!
//! Scene-based ECS with deferred structural changes.
//!
//! ## Design Philosophy
//!
//! - Entities and components are addressed by weak, generation-checked handles
//! - Activation and destruction are queued and applied in `Scene::refresh`
//! - Parents own the lifecycle of their children
//! - Systems observe changes through listeners, never by polling

mod component;
mod description;
mod entity;
mod entity_store;
mod event;
mod iter;
mod registry;
mod scene;
mod storage;
mod view;

pub use component::{Component, ComponentHandle, ComponentId};
pub use description::{EntityDescription, SceneDescription};
pub use entity::{Entity, EntityHandle, EntityId, SceneId};
pub use entity_store::EntityStore;
pub use event::{
    ComponentEvent, ComponentEventKind, ComponentListener, EntityEvent, EntityEventKind,
    EntityListener,
};
pub use iter::{AncestorIter, ChildIter, ComponentIter, ComponentIterMut, DescendantIter, EntityIter};
pub use registry::ComponentRegistry;
pub use scene::Scene;
pub use storage::ComponentStore;
pub use view::{EntityMut, EntityRef};
