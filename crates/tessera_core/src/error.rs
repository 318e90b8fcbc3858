//! # ECS Error Types
//!
//! All errors that can occur while mutating or querying a scene.

use thiserror::Error;

use crate::ecs::EntityHandle;

/// Broad classification of an [`EcsError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller asked for something the current scene state does not allow.
    InvalidOperation,
    /// The environment failed (unreadable or malformed configuration).
    Fatal,
}

/// Errors that can occur in the ECS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Handle refers to an entity that no longer exists.
    #[error("invalid entity: {0}")]
    InvalidEntity(EntityHandle),

    /// Handle was issued by a different scene.
    #[error("entity {0} belongs to another scene")]
    ForeignEntity(EntityHandle),

    /// Entity is already activated.
    #[error("entity {0} is already activated")]
    AlreadyActivated(EntityHandle),

    /// Entity is already queued for activation.
    #[error("entity {0} is already pending activation")]
    AlreadyPendingActivation(EntityHandle),

    /// Entity is already queued for destruction.
    #[error("entity {0} is already pending destruction")]
    AlreadyPendingDestruction(EntityHandle),

    /// Operation is not allowed on an entity queued for destruction.
    #[error("entity {0} is pending destruction")]
    PendingDestruction(EntityHandle),

    /// Entity cannot be activated before its parent.
    #[error("entity {0} cannot be activated before its parent")]
    ParentNotActivated(EntityHandle),

    /// Child already has a parent.
    #[error("entity {0} already has a parent")]
    AlreadyHasParent(EntityHandle),

    /// Parent and child disagree on their activation state.
    #[error("activation state of parent {parent} does not match child {child}")]
    ActivationMismatch {
        /// The would-be parent.
        parent: EntityHandle,
        /// The would-be child.
        child: EntityHandle,
    },

    /// Attaching the child would make an entity its own ancestor.
    #[error("attaching {child} to {parent} would create a cycle")]
    CyclicHierarchy {
        /// The would-be parent.
        parent: EntityHandle,
        /// The would-be child.
        child: EntityHandle,
    },

    /// Entity is not a child of the given parent.
    #[error("entity {child} is not a child of {parent}")]
    NotAChild {
        /// The parent that was named.
        parent: EntityHandle,
        /// The entity that is not its child.
        child: EntityHandle,
    },

    /// Entity already holds a component of this type.
    #[error("entity {entity} already has a component of type {type_name}")]
    AlreadyHasComponent {
        /// The entity.
        entity: EntityHandle,
        /// The component type.
        type_name: &'static str,
    },

    /// Entity holds no component of this type.
    #[error("entity {entity} has no component of type {type_name}")]
    NoSuchComponent {
        /// The entity.
        entity: EntityHandle,
        /// The component type.
        type_name: &'static str,
    },

    /// Component handle no longer refers to a live component.
    #[error("invalid component handle for type {0}")]
    InvalidComponent(&'static str),

    /// No store exists for this component type.
    #[error("component type {0} is not registered with the scene")]
    UnknownComponentType(&'static str),

    /// A store for this component type already exists.
    #[error("component type {0} is already registered")]
    ComponentTypeAlreadyRegistered(&'static str),

    /// No component type is registered under the tag.
    #[error("unknown component tag: {0}")]
    UnknownComponentTag(String),

    /// Another component type already uses the tag.
    #[error("duplicate component tag: {0}")]
    DuplicateComponentTag(String),

    /// Listener is already registered.
    #[error("listener is already registered")]
    AlreadyRegistered,

    /// Listener was never registered.
    #[error("listener is not registered")]
    NotRegistered,

    /// Operation requires a component registry but the scene has none.
    #[error("scene has no component registry")]
    MissingRegistry,

    /// Component value could not be decoded.
    #[error("failed to decode component {tag}: {reason}")]
    Decode {
        /// Tag of the component being decoded.
        tag: String,
        /// Decoder message.
        reason: String,
    },

    /// Scene description could not be parsed.
    #[error("invalid scene description: {0}")]
    InvalidDescription(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EcsError {
    /// Returns the class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::Fatal,
            _ => ErrorKind::InvalidOperation,
        }
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
