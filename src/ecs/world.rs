use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ecs::builder::EntityBuilder;
use crate::ecs::cell::{Ref, RefCell, RefMut};
use crate::ecs::component::Component;
use crate::ecs::entity::{Entity, EntityAllocator};
use crate::ecs::store::{ComponentStore, ErasedStore};
use crate::errors::*;
use crate::settings::WorldParams;

/// The `World` struct contains all the data, which is entities and
/// their components. Component stores are registered per type and kept
/// behind thread-safe cells, so that several stores could be borrowed at the
/// same time (e.g. to join them in a `View`).
pub struct World {
    allocator: Arc<EntityAllocator>,
    stores: HashMap<TypeId, RefCell<Box<dyn ErasedStore>>>,
    reserve: usize,
}

impl World {
    /// Constructs a new empty `World` with its own entity allocator.
    pub fn new() -> Self {
        World::with_params(WorldParams::default())
    }

    pub fn with_params(params: WorldParams) -> Self {
        World {
            allocator: Arc::new(EntityAllocator::with_seed(params.seed)),
            stores: HashMap::new(),
            reserve: params.reserve,
        }
    }

    /// Constructs a new empty `World` which creates its entities from a shared
    /// allocator. Worlds sharing one allocator never produce colliding ids, so
    /// they could be merged safely.
    pub fn with_allocator(allocator: Arc<EntityAllocator>) -> Self {
        World {
            allocator,
            stores: HashMap::new(),
            reserve: 0,
        }
    }

    #[inline]
    pub fn allocator(&self) -> &Arc<EntityAllocator> {
        &self.allocator
    }

    /// Registers a new component type.
    pub fn register<T>(&mut self) -> Result<()>
    where
        T: Component,
    {
        let tid = TypeId::of::<T>();
        if self.stores.contains_key(&tid) {
            return Err(Error::DuplicatedRegistration(T::type_name()));
        }

        let store: Box<dyn ErasedStore> = Box::new(ComponentStore::<T>::with_capacity(self.reserve));
        self.stores.insert(tid, RefCell::new(store));
        info!("[World] registers component {}.", T::type_name());
        Ok(())
    }

    #[inline]
    pub fn is_registered<T>(&self) -> bool
    where
        T: Component,
    {
        self.stores.contains_key(&TypeId::of::<T>())
    }

    /// Creates and returns a fresh `Entity`.
    #[inline]
    pub fn create(&self) -> Result<Entity> {
        self.allocator.create()
    }

    /// Creates a fresh `Entity` and returns a builder to attach its components.
    pub fn build(&mut self) -> Result<EntityBuilder> {
        let ent = self.create()?;
        Ok(EntityBuilder::new(self, ent))
    }

    /// Adds component to entity. Fails if the entity has one already.
    pub fn add<T>(&mut self, ent: Entity, value: T) -> Result<()>
    where
        T: Component,
    {
        self.store_mut_unchecked::<T>()?.insert(ent, value)?;
        Ok(())
    }

    /// Adds a default constructed component to entity.
    pub fn add_default<T>(&mut self, ent: Entity) -> Result<()>
    where
        T: Component + Default,
    {
        self.add(ent, T::default())
    }

    /// Removes component of entity from the world, and returns it.
    pub fn remove<T>(&mut self, ent: Entity) -> Result<T>
    where
        T: Component,
    {
        self.store_mut_unchecked::<T>()?.erase(ent)
    }

    /// Returns true if `ent` has a component of type `T`. Unregistered types
    /// are reported as absent.
    pub fn has<T>(&self, ent: Entity) -> bool
    where
        T: Component,
    {
        match self.stores.get(&TypeId::of::<T>()) {
            Some(cell) => cell.borrow().contains(ent),
            None => false,
        }
    }

    /// Returns a copy of the component of `ent`.
    pub fn get<T>(&self, ent: Entity) -> Option<T>
    where
        T: Component + Clone,
    {
        self.store::<T>().ok()?.get(ent).cloned()
    }

    /// Borrows the store of component `T` immutably.
    ///
    /// # Panics
    ///
    /// Panics if the store is currently borrowed mutably.
    pub fn store<T>(&self) -> Result<Ref<ComponentStore<T>>>
    where
        T: Component,
    {
        let cell = self
            .stores
            .get(&TypeId::of::<T>())
            .ok_or_else(|| Error::ComponentNotRegistered(T::type_name()))?;

        Ok(Ref::map(cell.borrow(), |v| {
            v.as_any()
                .downcast_ref::<ComponentStore<T>>()
                .expect("stores are keyed by the type id of their component.")
        }))
    }

    /// Borrows the store of component `T` mutably.
    ///
    /// # Panics
    ///
    /// Panics if the store is currently borrowed.
    pub fn store_mut<T>(&self) -> Result<RefMut<ComponentStore<T>>>
    where
        T: Component,
    {
        let cell = self
            .stores
            .get(&TypeId::of::<T>())
            .ok_or_else(|| Error::ComponentNotRegistered(T::type_name()))?;

        Ok(RefMut::map(cell.borrow_mut(), |v| {
            v.as_any_mut()
                .downcast_mut::<ComponentStore<T>>()
                .expect("stores are keyed by the type id of their component.")
        }))
    }

    /// Removes every component of `ent` from every store. Returns the number of
    /// components dropped.
    pub fn destroy(&mut self, ent: Entity) -> usize {
        let mut count = 0;
        for v in self.stores.values_mut() {
            if v.get_mut().erase_entity(ent) {
                count += 1;
            }
        }

        count
    }

    /// Moves all components of `other` into this world, `other` is left with no
    /// registered stores at all. Types only registered in `other` are
    /// registered here too.
    ///
    /// Nothing is moved if any entity of `other` already has a component of the
    /// same type here.
    pub fn merge(&mut self, other: &mut World) -> Result<()> {
        for (tid, cell) in &mut other.stores {
            if let Some(dst) = self.stores.get_mut(tid) {
                let (dst, src) = (dst.get_mut(), cell.get_mut());
                for i in 0..src.len() {
                    if let Some(ent) = src.entity_at(i) {
                        if dst.contains(ent) {
                            return Err(Error::DuplicatedComponent(ent, dst.type_name()));
                        }
                    }
                }
            }
        }

        for (tid, cell) in other.stores.drain() {
            match self.stores.get_mut(&tid) {
                Some(dst) => {
                    let mut cell = cell;
                    dst.get_mut().merge_erased(&mut **cell.get_mut())?;
                }
                None => {
                    self.stores.insert(tid, cell);
                }
            }
        }

        Ok(())
    }

    /// Drops every component of every registered type.
    pub fn clear(&mut self) {
        for v in self.stores.values_mut() {
            v.get_mut().clear();
        }
    }

    fn store_mut_unchecked<T>(&mut self) -> Result<&mut ComponentStore<T>>
    where
        T: Component,
    {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.get_mut().as_any_mut().downcast_mut::<ComponentStore<T>>())
            .ok_or_else(|| Error::ComponentNotRegistered(T::type_name()))
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}
