//! # Component Registry
//!
//! Maps stable string tags to component types so that scenes can be
//! described in data. A registry is built once at startup and shared by
//! every scene that needs it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use super::component::Component;
use super::entity::EntityHandle;
use super::scene::Scene;
use crate::error::{EcsError, EcsResult};

type InstallFn = fn(&mut Scene) -> EcsResult<()>;
type DecodeFn = fn(&mut Scene, EntityHandle, &str, toml::Value) -> EcsResult<()>;

struct Registration {
    tag: String,
    type_name: &'static str,
    install: InstallFn,
    decode: DecodeFn,
}

/// Tag to component type table.
///
/// # Example
///
/// ```rust
/// use serde::Deserialize;
/// use tessera_core::{Component, ComponentRegistry};
///
/// #[derive(Clone, Deserialize)]
/// struct Health {
///     value: u32,
/// }
/// impl Component for Health {}
///
/// let mut registry = ComponentRegistry::new();
/// registry.register::<Health>("health").unwrap();
/// assert!(registry.register::<Health>("hp").is_err());
/// assert_eq!(registry.tag_of::<Health>(), Some("health"));
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    registrations: Vec<Registration>,
    by_tag: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `tag`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponentTag`] if the tag is taken
    /// - [`EcsError::ComponentTypeAlreadyRegistered`] if `T` already has a tag
    pub fn register<T>(&mut self, tag: impl Into<String>) -> EcsResult<()>
    where
        T: Component + DeserializeOwned,
    {
        let tag = tag.into();
        if self.by_tag.contains_key(&tag) {
            return Err(EcsError::DuplicateComponentTag(tag));
        }
        let type_id = TypeId::of::<T>();
        if self.by_type.contains_key(&type_id) {
            return Err(EcsError::ComponentTypeAlreadyRegistered(T::type_name()));
        }

        let index = self.registrations.len();
        self.by_tag.insert(tag.clone(), index);
        self.by_type.insert(type_id, index);
        self.registrations.push(Registration {
            tag,
            type_name: T::type_name(),
            install: install_store::<T>,
            decode: decode_component::<T>,
        });
        Ok(())
    }

    /// Whether a type is registered under `tag`.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Tag of `T`, if registered.
    #[must_use]
    pub fn tag_of<T: Component>(&self) -> Option<&str> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| self.registrations[index].tag.as_str())
    }

    /// Type name registered under `tag`.
    #[must_use]
    pub fn type_name_of(&self, tag: &str) -> Option<&'static str> {
        self.by_tag
            .get(tag)
            .map(|&index| self.registrations[index].type_name)
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.registrations.iter().map(|r| r.tag.as_str())
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Creates a store in `scene` for every registered type.
    pub(crate) fn install_all(&self, scene: &mut Scene) -> EcsResult<()> {
        for registration in &self.registrations {
            (registration.install)(scene)?;
        }
        Ok(())
    }

    /// Decodes `value` as the component registered under `tag` and adds it
    /// to `entity`.
    pub(crate) fn decode(
        &self,
        scene: &mut Scene,
        entity: EntityHandle,
        tag: &str,
        value: toml::Value,
    ) -> EcsResult<()> {
        let index = *self
            .by_tag
            .get(tag)
            .ok_or_else(|| EcsError::UnknownComponentTag(tag.to_owned()))?;
        (self.registrations[index].decode)(scene, entity, tag, value)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.registrations.iter().map(|r| (&r.tag, r.type_name)))
            .finish()
    }
}

fn install_store<T: Component>(scene: &mut Scene) -> EcsResult<()> {
    scene.ensure_component::<T>()?;
    Ok(())
}

fn decode_component<T>(scene: &mut Scene, entity: EntityHandle, tag: &str, value: toml::Value) -> EcsResult<()>
where
    T: Component + DeserializeOwned,
{
    let component: T = value.try_into().map_err(|e: toml::de::Error| EcsError::Decode {
        tag: tag.to_owned(),
        reason: e.to_string(),
    })?;
    scene.add_component(entity, component)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    impl Component for Velocity {}

    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct Label(String);

    impl Component for Label {}

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Velocity>("velocity").unwrap();
        assert_eq!(
            registry.register::<Label>("velocity"),
            Err(EcsError::DuplicateComponentTag("velocity".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Velocity>("velocity").unwrap();
        registry.register::<Label>("label").unwrap();

        assert!(registry.contains("label"));
        assert!(!registry.contains("mesh"));
        assert_eq!(registry.tag_of::<Label>(), Some("label"));
        assert!(registry.type_name_of("velocity").unwrap().ends_with("Velocity"));
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["velocity", "label"]);
    }

    #[test]
    fn test_decode_into_scene() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Velocity>("velocity").unwrap();
        let mut scene = Scene::new();
        let e = scene.create_entity();

        let value = toml::Value::Table(toml::from_str("x = 1.5\ny = -2.0").unwrap());
        registry.decode(&mut scene, e, "velocity", value).unwrap();
        assert_eq!(
            scene.component::<Velocity>(e).unwrap(),
            &Velocity { x: 1.5, y: -2.0 }
        );
    }

    #[test]
    fn test_decode_errors() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Velocity>("velocity").unwrap();
        let mut scene = Scene::new();
        let e = scene.create_entity();

        let err = registry
            .decode(&mut scene, e, "mesh", toml::Value::Boolean(true))
            .unwrap_err();
        assert_eq!(err, EcsError::UnknownComponentTag("mesh".into()));

        let err = registry
            .decode(&mut scene, e, "velocity", toml::Value::Integer(3))
            .unwrap_err();
        assert!(matches!(err, EcsError::Decode { ref tag, .. } if tag == "velocity"));
        assert!(!scene.has_component::<Velocity>(e));
    }
}
