//! Parent/child rules, graph queries and cloning.

use tessera_core::{Component, EcsError, EntityHandle, EntityRef, Scene};

#[derive(Clone, Debug, PartialEq)]
struct Label(&'static str);

impl Component for Label {}

#[derive(Clone, Debug, PartialEq)]
struct Marker;

impl Component for Marker {}

fn names<'a>(entities: impl IntoIterator<Item = EntityRef<'a>>) -> Vec<&'a str> {
    entities.into_iter().filter_map(|e| e.name()).collect()
}

/// Parent/child chain `depth` levels deep, built from the leaf up.
fn chain(scene: &mut Scene, depth: usize) -> (EntityHandle, EntityHandle) {
    let leaf = scene.create_entity();
    let mut root = leaf;
    for _ in 0..depth {
        let parent = scene.create_entity();
        scene.add_child(parent, root).unwrap();
        root = parent;
    }
    (root, leaf)
}

const DEEP: usize = 100_000;

#[test]
fn test_add_child_from_other_scene_fails() {
    let mut first = Scene::new();
    let mut second = Scene::new();
    let a = first.create_entity();
    let b = second.create_entity();
    assert_eq!(first.add_child(a, b), Err(EcsError::ForeignEntity(b)));
    assert_eq!(second.add_child(b, a), Err(EcsError::ForeignEntity(a)));
}

#[test]
fn test_add_child_that_already_has_parent_fails() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    let c = scene.create_entity();
    scene.add_child(a, c).unwrap();
    assert_eq!(scene.add_child(b, c), Err(EcsError::AlreadyHasParent(c)));
}

#[test]
fn test_add_inert_child_to_pending_parent_fails() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.activate(a).unwrap();
    assert_eq!(
        scene.add_child(a, b),
        Err(EcsError::ActivationMismatch { parent: a, child: b })
    );
}

#[test]
fn test_add_inert_child_to_activated_parent_fails() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.activate(a).unwrap();
    scene.refresh();
    assert_eq!(
        scene.add_child(a, b),
        Err(EcsError::ActivationMismatch { parent: a, child: b })
    );
}

#[test]
fn test_add_activated_child_to_inert_parent_fails() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.activate(b).unwrap();
    scene.refresh();
    assert_eq!(
        scene.add_child(a, b),
        Err(EcsError::ActivationMismatch { parent: a, child: b })
    );
}

#[test]
fn test_add_child_to_parent_pending_destruction_fails() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.destroy(a).unwrap();
    assert_eq!(scene.add_child(a, b), Err(EcsError::PendingDestruction(a)));
}

#[test]
fn test_add_activated_child_to_activated_parent() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.activate(a).unwrap();
    scene.activate(b).unwrap();
    scene.refresh();

    scene.add_child(a, b).unwrap();
    assert_eq!(scene.entities().parent(b).unwrap(), Some(a));

    scene.destroy(a).unwrap();
    scene.refresh();
    assert_eq!(scene.entity_count(), 0);
}

#[test]
fn test_cycle_rejected() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    let c = scene.create_entity();
    scene.add_child(a, b).unwrap();
    scene.add_child(b, c).unwrap();
    scene.remove_child(a, b).unwrap();
    assert_eq!(
        scene.add_child(c, b),
        Err(EcsError::CyclicHierarchy { parent: c, child: b })
    );
}

#[test]
fn test_child_cannot_activate_before_parent() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.add_child(a, b).unwrap();
    assert_eq!(scene.activate(b), Err(EcsError::ParentNotActivated(b)));
}

#[test]
fn test_removed_child_keeps_activation() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    let b = scene.create_entity();
    scene.add_child(a, b).unwrap();
    scene.activate(a).unwrap();
    scene.refresh();

    scene.entity_mut(a).unwrap().remove_child(b).unwrap();
    scene.destroy(a).unwrap();
    scene.refresh();

    assert!(scene.entity(b).unwrap().is_activated());
    assert!(scene.entity(b).unwrap().parent().is_none());
    assert_eq!(scene.entity_count(), 1);
}

#[test]
fn test_graph_queries_through_views() {
    let mut scene = Scene::new();
    let a = scene.create_named_entity("a");
    let b = scene.create_named_entity("b");
    let c = scene.create_named_entity("c");
    let d = scene.create_named_entity("d");
    scene.add_child(a, b).unwrap();
    scene.add_child(a, c).unwrap();
    scene.add_child(c, d).unwrap();
    scene.add_component(c, Marker).unwrap();
    scene.add_component(d, Marker).unwrap();
    scene.activate(a).unwrap();
    scene.refresh();

    let root = scene.entity(a).unwrap();
    assert_eq!(names(root.children()), vec!["b", "c"]);
    assert_eq!(names(root.find_descendants(|_| true)), vec!["b", "c", "d"]);
    assert_eq!(names(root.find_descendants(|e| e.has::<Marker>())), vec!["c", "d"]);
    assert_eq!(
        root.find_first_descendant(|e| e.has::<Marker>()).map(|e| e.handle()),
        Some(c)
    );
    assert_eq!(
        root.find_first_child(|e| e.name() == Some("b")).map(|e| e.handle()),
        Some(b)
    );
    assert!(root.find_first_child(|e| e.name() == Some("d")).is_none());
    assert_eq!(names(root.find_children(|e| e.has::<Marker>())), vec!["c"]);

    let leaf = scene.entity(d).unwrap();
    assert_eq!(names(leaf.find_ancestors(|_| true)), vec!["c", "a"]);
    assert_eq!(
        leaf.find_first_ancestor(|e| e.has::<Marker>()).map(|e| e.handle()),
        Some(c)
    );
    assert_eq!(leaf.parent().map(|p| p.handle()), Some(c));
    assert_eq!(scene.entities().root(d).unwrap(), a);
}

#[test]
fn test_clone_copies_subtree() {
    let mut scene = Scene::new();
    let a = scene.create_named_entity("a");
    let b = scene.create_named_entity("b");
    let c = scene.create_named_entity("c");
    scene.add_child(a, b).unwrap();
    scene.add_child(b, c).unwrap();
    scene.add_component(a, Label("root")).unwrap();
    scene.add_component(c, Label("leaf")).unwrap();
    scene.activate(a).unwrap();
    scene.refresh();

    let copy = scene.clone_entity(a).unwrap();
    let view = scene.entity(copy).unwrap();
    assert!(!view.is_activated());
    assert!(view.parent().is_none());
    assert_eq!(view.name(), Some("a"));
    assert_eq!(view.get::<Label>().unwrap(), &Label("root"));

    let copied: Vec<_> = view.find_descendants(|_| true);
    assert_eq!(names(copied.iter().copied()), vec!["b", "c"]);
    assert!(copied.iter().all(|e| e.handle() != b && e.handle() != c));
    assert!(!copied[0].has::<Label>());
    assert_eq!(copied[1].get::<Label>().unwrap(), &Label("leaf"));

    scene.activate(copy).unwrap();
    scene.refresh();
    assert_eq!(scene.entity_count(), 6);
}

#[test]
fn test_create_child_follows_parent_state() {
    let mut scene = Scene::new();
    let a = scene.create_entity();
    scene.activate(a).unwrap();
    scene.refresh();

    let child = scene
        .entity_mut(a)
        .unwrap()
        .create_child(Some("spawned".into()))
        .unwrap();
    assert!(scene.entity(child).unwrap().is_pending_activation());
    scene.refresh();
    assert!(scene.entity(child).unwrap().is_activated());
    assert_eq!(scene.entities().parent(child).unwrap(), Some(a));
}

#[test]
fn test_clone_deep_chain() {
    let mut scene = Scene::new();
    let (root, leaf) = chain(&mut scene, DEEP);
    scene.add_component(leaf, Label("leaf")).unwrap();

    let copy = scene.clone_entity(root).unwrap();
    assert_eq!(scene.entities().len(), 2 * (DEEP + 1));

    let view = scene.entity(copy).unwrap();
    assert!(view.parent().is_none());
    let copied = view.find_descendants(|_| true);
    assert_eq!(copied.len(), DEEP);
    let copied_leaf = copied[DEEP - 1];
    assert_ne!(copied_leaf.handle(), leaf);
    assert_eq!(copied_leaf.get::<Label>().unwrap(), &Label("leaf"));
    assert_eq!(copied_leaf.children().count(), 0);
    assert_eq!(scene.entities().root(copied_leaf.handle()).unwrap(), copy);

    scene.activate(copy).unwrap();
    scene.refresh();
    assert_eq!(scene.entity_count(), DEEP + 1);
}

#[test]
fn test_graph_queries_on_deep_chain() {
    let mut scene = Scene::new();
    let (root, leaf) = chain(&mut scene, DEEP);
    scene.add_component(leaf, Marker).unwrap();
    scene.activate(root).unwrap();
    scene.refresh();

    let top = scene.entity(root).unwrap();
    assert_eq!(top.find_descendants(|_| true).len(), DEEP);
    assert_eq!(
        top.find_first_descendant(|e| e.has::<Marker>()).map(|e| e.handle()),
        Some(leaf)
    );
    assert_eq!(scene.entities().descendants(root).unwrap().count(), DEEP);

    let bottom = scene.entity(leaf).unwrap();
    assert_eq!(bottom.find_ancestors(|_| true).len(), DEEP);
    assert_eq!(
        bottom.find_first_ancestor(|e| e.parent().is_none()).map(|e| e.handle()),
        Some(root)
    );
    assert_eq!(scene.entities().root(leaf).unwrap(), root);
}
