use crate::ecs::component::Component;
use crate::ecs::world::World;
use crate::ecs::Entity;
use crate::errors::*;

/// Help builder for entities. The first failed attachment is kept and reported
/// by `finish`.
pub struct EntityBuilder<'a> {
    ent: Entity,
    world: &'a mut World,
    error: Option<Error>,
}

impl<'a> EntityBuilder<'a> {
    pub(crate) fn new(world: &'a mut World, ent: Entity) -> Self {
        EntityBuilder {
            ent,
            world,
            error: None,
        }
    }

    pub fn with<T>(mut self, value: T) -> Self
    where
        T: Component,
    {
        if self.error.is_none() {
            self.error = self.world.add(self.ent, value).err();
        }

        self
    }

    pub fn with_default<T>(self) -> Self
    where
        T: Component + Default,
    {
        self.with(T::default())
    }

    /// Returns the built entity. Components attached before a failure are left
    /// in place, so callers could `World::destroy` the entity if required.
    pub fn finish(self) -> Result<Entity> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.ent),
        }
    }
}
