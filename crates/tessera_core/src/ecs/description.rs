//! # Scene Descriptions
//!
//! Entity hierarchies written in TOML. Component tables are keyed by the
//! tags of a [`ComponentRegistry`](super::ComponentRegistry):
//!
//! ```toml
//! [[entity]]
//! name = "car"
//!
//! [entity.components.transform]
//! x = 0.0
//! y = 0.0
//!
//! [[entity.child]]
//! name = "wheel"
//!
//! [entity.child.components.transform]
//! x = 1.0
//! y = 0.0
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Root entities of a scene.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SceneDescription {
    /// Root entities, built in order.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityDescription>,
}

/// One entity, its components and its children.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EntityDescription {
    /// Optional entity name.
    #[serde(default)]
    pub name: Option<String>,
    /// Component values keyed by registry tag, in file order.
    #[serde(default)]
    pub components: toml::Table,
    /// Child entities, attached in order.
    #[serde(default, rename = "child")]
    pub children: Vec<EntityDescription>,
}

impl SceneDescription {
    /// Parses a description from TOML text.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidDescription`] if the text does not parse.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        toml::from_str(text).map_err(|e| EcsError::InvalidDescription(e.to_string()))
    }

    /// Reads and parses a description file.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidDescription`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidDescription(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Total number of entities, children included.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.iter().map(EntityDescription::entity_count).sum()
    }
}

impl EntityDescription {
    /// This entity plus all of its descendants.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Self::entity_count)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: &str = r#"
        [[entity]]
        name = "car"

        [entity.components.speed]
        value = 3

        [[entity.child]]
        name = "wheel"

        [[entity.child]]
        name = "seat"

        [[entity.child.child]]
        name = "cushion"

        [[entity]]
        name = "tree"
    "#;

    #[test]
    fn test_parse_hierarchy() {
        let description = SceneDescription::from_toml_str(CAR).unwrap();
        assert_eq!(description.entities.len(), 2);
        assert_eq!(description.entity_count(), 5);

        let car = &description.entities[0];
        assert_eq!(car.name.as_deref(), Some("car"));
        assert!(car.components.contains_key("speed"));
        let children: Vec<_> = car.children.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(children, vec![Some("wheel"), Some("seat")]);
        assert_eq!(car.children[1].children[0].name.as_deref(), Some("cushion"));
    }

    #[test]
    fn test_components_keep_file_order() {
        let description = SceneDescription::from_toml_str(
            r#"
            [[entity]]
            [entity.components.velocity]
            x = 1
            [entity.components.armor]
            value = 2
            [entity.components.mass]
            value = 3
            "#,
        )
        .unwrap();
        let tags: Vec<_> = description.entities[0].components.keys().map(String::as_str).collect();
        assert_eq!(tags, vec!["velocity", "armor", "mass"]);
    }

    #[test]
    fn test_empty_description() {
        let description = SceneDescription::from_toml_str("").unwrap();
        assert!(description.entities.is_empty());
    }

    #[test]
    fn test_invalid_description() {
        let err = SceneDescription::from_toml_str("[[entity]]\nchild = 3").unwrap_err();
        assert!(matches!(err, EcsError::InvalidDescription(_)));
    }
}
