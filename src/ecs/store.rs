//! Dense, entity-keyed storage of one component type.

use std::any::Any;
use std::collections::HashMap;
use std::slice;

use crate::ecs::Entity;
use crate::errors::*;

/// Packed storage for components of type `T`.
///
/// Entities and their components live in two parallel vectors, so iterating a
/// store is a linear walk over contiguous memory. A sparse `Entity -> index`
/// map provides O(1) lookups. Removal swaps the last entry into the freed slot,
/// which means positional indices are NOT stable across erases; only the
/// entity-keyed relationship is.
#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    entities: Vec<Entity>,
    components: Vec<T>,
    sparse: HashMap<Entity, usize>,
}

impl<T> ComponentStore<T> {
    /// Constructs a new, empty `ComponentStore`.
    pub fn new() -> Self {
        ComponentStore {
            entities: Vec::new(),
            components: Vec::new(),
            sparse: HashMap::new(),
        }
    }

    /// Constructs a new `ComponentStore` with room for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        ComponentStore {
            entities: Vec::with_capacity(capacity),
            components: Vec::with_capacity(capacity),
            sparse: HashMap::with_capacity(capacity),
        }
    }

    /// Reserves capacity for at least `additional` more components.
    pub fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
        self.components.reserve(additional);
        self.sparse.reserve(additional);
    }

    /// Returns the number of components in this store.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drops every component.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.components.clear();
        self.sparse.clear();
    }

    /// Attaches `value` to `ent` and returns a mutable reference to the stored
    /// component.
    ///
    /// Fails if `ent` is invalid or already has a component in this store, the
    /// existing component is left untouched in that case.
    pub fn insert(&mut self, ent: Entity, value: T) -> Result<&mut T> {
        if !ent.is_valid() {
            return Err(Error::InvalidEntity);
        }

        if self.sparse.contains_key(&ent) {
            return Err(Error::DuplicatedComponent(ent, type_name::<T>()));
        }

        let index = self.components.len();
        self.sparse.insert(ent, index);
        self.entities.push(ent);
        self.components.push(value);
        Ok(&mut self.components[index])
    }

    /// Attaches a default constructed component to `ent`.
    pub fn insert_default(&mut self, ent: Entity) -> Result<&mut T>
    where
        T: Default,
    {
        self.insert(ent, T::default())
    }

    /// Returns true if `ent` has a component in this store.
    #[inline]
    pub fn has(&self, ent: Entity) -> bool {
        self.sparse.contains_key(&ent)
    }

    /// Returns the position of `ent`'s component in the dense arrays.
    #[inline]
    pub fn index_of(&self, ent: Entity) -> Option<usize> {
        self.sparse.get(&ent).cloned()
    }

    #[inline]
    pub fn get(&self, ent: Entity) -> Option<&T> {
        let index = *self.sparse.get(&ent)?;
        Some(&self.components[index])
    }

    #[inline]
    pub fn get_mut(&mut self, ent: Entity) -> Option<&mut T> {
        let index = *self.sparse.get(&ent)?;
        Some(&mut self.components[index])
    }

    /// Detaches and returns the component of `ent` in O(1). The last entry is
    /// moved into the freed slot.
    ///
    /// Erasing an entity which has no component here is rejected with
    /// `ComponentNotFound`.
    pub fn erase(&mut self, ent: Entity) -> Result<T> {
        self.remove(ent)
            .ok_or_else(|| Error::ComponentNotFound(ent, type_name::<T>()))
    }

    /// Like `erase`, but returns `None` instead of failing when `ent` has no
    /// component here.
    pub fn remove(&mut self, ent: Entity) -> Option<T> {
        let index = self.sparse.remove(&ent)?;

        self.entities.swap_remove(index);
        let value = self.components.swap_remove(index);

        if index < self.entities.len() {
            let moved = self.entities[index];
            self.sparse.insert(moved, index);
        }

        Some(value)
    }

    #[inline]
    pub fn entity_at(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).cloned()
    }

    #[inline]
    pub fn component_at(&self, index: usize) -> Option<&T> {
        self.components.get(index)
    }

    #[inline]
    pub fn component_at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.components.get_mut(index)
    }

    /// Entities in storage order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Components in storage order, `components()[i]` belongs to `entities()[i]`.
    #[inline]
    pub fn components(&self) -> &[T] {
        &self.components
    }

    #[inline]
    pub fn components_mut(&mut self) -> &mut [T] {
        &mut self.components
    }

    /// Splits the store into its entity array and a mutable component array.
    /// This is the usual entry point of parallel per-component updates.
    #[inline]
    pub fn split_mut(&mut self) -> (&[Entity], &mut [T]) {
        (&self.entities, &mut self.components)
    }

    /// Gets an iterator over `(Entity, &T)` in storage order.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            entities: self.entities.iter(),
            components: self.components.iter(),
        }
    }

    /// Gets an iterator over `(Entity, &mut T)` in storage order.
    pub fn iter_mut(&mut self) -> IterMut<T> {
        IterMut {
            entities: self.entities.iter(),
            components: self.components.iter_mut(),
        }
    }

    /// Moves every component of `other` into this store, leaving `other` empty.
    ///
    /// Nothing is moved if any entity of `other` already has a component here.
    pub fn merge(&mut self, other: &mut ComponentStore<T>) -> Result<()> {
        if let Some(&ent) = other.entities.iter().find(|v| self.has(**v)) {
            return Err(Error::DuplicatedComponent(ent, type_name::<T>()));
        }

        self.reserve(other.len());
        for (ent, value) in other.entities.drain(..).zip(other.components.drain(..)) {
            self.sparse.insert(ent, self.components.len());
            self.entities.push(ent);
            self.components.push(value);
        }

        other.sparse.clear();
        Ok(())
    }

    pub(crate) fn raw_parts_mut(&mut self) -> (&[Entity], &HashMap<Entity, usize>, &mut [T]) {
        (&self.entities, &self.sparse, &mut self.components)
    }
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        ComponentStore::new()
    }
}

impl<'a, T> IntoIterator for &'a ComponentStore<T> {
    type Item = (Entity, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut ComponentStore<T> {
    type Item = (Entity, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

pub struct Iter<'a, T> {
    entities: slice::Iter<'a, Entity>,
    components: slice::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Entity, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        Some((*self.entities.next()?, self.components.next()?))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.components.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

pub struct IterMut<'a, T> {
    entities: slice::Iter<'a, Entity>,
    components: slice::IterMut<'a, T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Entity, &'a mut T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        Some((*self.entities.next()?, self.components.next()?))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.components.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}

/// The type-erased capabilities of a `ComponentStore`, which lets containers
/// hold stores of arbitrary component types side by side.
pub trait ErasedStore: Any + Send + Sync {
    /// Name of the component type held by this store.
    fn type_name(&self) -> &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, ent: Entity) -> bool;

    fn entity_at(&self, index: usize) -> Option<Entity>;

    /// Drops the component of `ent`, returns false if there was none.
    fn erase_entity(&mut self, ent: Entity) -> bool;

    fn clear(&mut self);

    /// Moves all components of `other` into this store. Both stores must hold
    /// the same component type.
    fn merge_erased(&mut self, other: &mut dyn ErasedStore) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ErasedStore for ComponentStore<T>
where
    T: Send + Sync + 'static,
{
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn contains(&self, ent: Entity) -> bool {
        self.has(ent)
    }

    fn entity_at(&self, index: usize) -> Option<Entity> {
        ComponentStore::entity_at(self, index)
    }

    fn erase_entity(&mut self, ent: Entity) -> bool {
        self.remove(ent).is_some()
    }

    fn clear(&mut self) {
        ComponentStore::clear(self)
    }

    fn merge_erased(&mut self, other: &mut dyn ErasedStore) -> Result<()> {
        match other.as_any_mut().downcast_mut::<ComponentStore<T>>() {
            Some(other) => self.merge(other),
            None => Err(Error::ComponentNotRegistered(type_name::<T>())),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[inline]
fn type_name<T>() -> &'static str {
    ::std::any::type_name::<T>()
}
