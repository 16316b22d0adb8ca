//! Entity store: named entities with a transform, a parent/children hierarchy and typed
//! components, kept in a `hecs::World`. `EntityId`s are generation checked, so handles held
//! by other entities go stale instead of dangling once their target is deleted.

use std::any::type_name;

use hecs::{Component, ComponentError, QueryOneError, World};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{AffineTransform, ModelError, ModelResult};

pub use hecs::Ref;

pub type EntityId = hecs::Entity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Parent(pub EntityId);

/// Direct children, in the order they were attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub Vec<EntityId>);

#[derive(Default)]
pub struct Scene {
    world: World,
}
impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_entity(&mut self, name: impl Into<String>, transform: AffineTransform) -> EntityId {
        let id = self.world.spawn((Name(name.into()), transform, Children::default()));
        trace!("Created entity {:?}.", id);
        id
    }

    /// Deletes `id` and everything under it. Returns every entity removed, children first.
    pub fn delete_entity(&mut self, id: EntityId) -> ModelResult<Vec<EntityId>> {
        if !self.world.contains(id) {
            return Err(ModelError::StaleEntity(id));
        }
        self.detach(id);
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Ok(Children(children)) = self.world.remove_one::<Children>(next) {
                stack.extend(children);
            }
            if self.world.despawn(next).is_ok() {
                removed.push(next);
            }
        }
        removed.reverse();
        trace!("Deleted {:?} ({} entities).", id, removed.len());
        Ok(removed)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.world.contains(id)
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.world.iter().map(|e| e.entity())
    }

    pub fn name(&self, id: EntityId) -> ModelResult<String> {
        Ok(self.component::<Name>(id)?.0.clone())
    }

    pub fn transform(&self, id: EntityId) -> ModelResult<AffineTransform> {
        Ok(*self.component::<AffineTransform>(id)?)
    }

    pub fn transform_mut(&mut self, id: EntityId) -> ModelResult<&mut AffineTransform> {
        self.component_mut::<AffineTransform>(id)
    }

    // hierarchy

    fn detach(&mut self, child: EntityId) {
        let Ok(Parent(parent)) = self.world.remove_one::<Parent>(child) else {
            return;
        };
        if let Ok(siblings) = self.world.query_one_mut::<&mut Children>(parent) {
            siblings.0.retain(|c| *c != child);
        }
    }

    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> ModelResult<()> {
        for id in [child, parent] {
            if !self.world.contains(id) {
                return Err(ModelError::StaleEntity(id));
            }
        }
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(ModelError::InvalidParent { child, parent });
            }
            cursor = self.parent(ancestor);
        }
        self.detach(child);
        self.world
            .insert_one(child, Parent(parent))
            .map_err(|_| ModelError::StaleEntity(child))?;
        self.component_mut::<Children>(parent)?.0.push(child);
        Ok(())
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.world.get::<&Parent>(id).ok().map(|p| p.0)
    }

    pub fn children(&self, id: EntityId) -> ModelResult<Vec<EntityId>> {
        Ok(self.component::<Children>(id)?.0.clone())
    }

    /// Every entity below `id`, depth first.
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntityId> = self.children(id).map(|c| c.into_iter().rev().collect()).unwrap_or_default();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Ok(children) = self.children(next) {
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }

    // components

    /// Attaches `component`, handing back whatever it replaced.
    pub fn insert_component<C: Component>(&mut self, id: EntityId, component: C) -> ModelResult<Option<C>> {
        if !self.world.contains(id) {
            return Err(ModelError::StaleEntity(id));
        }
        let previous = self.world.remove_one::<C>(id).ok();
        self.world
            .insert_one(id, component)
            .map_err(|_| ModelError::StaleEntity(id))?;
        Ok(previous)
    }

    pub fn remove_component<C: Component>(&mut self, id: EntityId) -> Option<C> {
        self.world.remove_one::<C>(id).ok()
    }

    pub fn has_component<C: Component>(&self, id: EntityId) -> bool {
        self.world.entity(id).map_or(false, |e| e.has::<C>())
    }

    pub fn try_component<C: Component>(&self, id: EntityId) -> Option<Ref<'_, C>> {
        self.world.get::<&C>(id).ok()
    }

    pub fn try_component_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.world.query_one_mut::<&mut C>(id).ok()
    }

    /// Shared borrow of a component. Drop the guard before touching the scene mutably.
    pub fn component<C: Component>(&self, id: EntityId) -> ModelResult<Ref<'_, C>> {
        self.world.get::<&C>(id).map_err(|e| match e {
            ComponentError::NoSuchEntity => ModelError::StaleEntity(id),
            ComponentError::MissingComponent(_) => ModelError::MissingComponent {
                entity: id,
                component: type_name::<C>(),
            },
        })
    }

    pub fn component_mut<C: Component>(&mut self, id: EntityId) -> ModelResult<&mut C> {
        self.world.query_one_mut::<&mut C>(id).map_err(|e| match e {
            QueryOneError::NoSuchEntity => ModelError::StaleEntity(id),
            QueryOneError::Unsatisfied => ModelError::MissingComponent {
                entity: id,
                component: type_name::<C>(),
            },
        })
    }
}
