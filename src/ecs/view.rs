//! Utilities to iterate over one or more `ComponentStore`s safely.
//!
//! A `View` walks the entities of its first ("driving") store in storage order
//! and yields only those entities which are present in every other joined
//! store:
//!
//! ```
//! use hearth::ecs::{ComponentStore, Entity, View};
//!
//! let mut positions = ComponentStore::new();
//! let mut velocities = ComponentStore::new();
//! for i in 1..4 {
//!     positions.insert(Entity::new(i), 0.0f32).unwrap();
//! }
//! velocities.insert(Entity::new(2), 1.0f32).unwrap();
//!
//! for (_, (p, v)) in View::new((positions.fetch_mut(), velocities.fetch())) {
//!     *p += *v;
//! }
//!
//! assert_eq!(positions.get(Entity::new(2)), Some(&1.0));
//! ```
//!
//! Views never copy component data. Structural mutation (insert or erase) of a
//! joined store while a view over it is alive is prevented by the borrows the
//! view holds.

use std::collections::HashMap;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::ecs::store::ComponentStore;
use crate::ecs::Entity;

/// Immutable access into the components of a store.
pub struct Fetch<'a, T> {
    store: &'a ComponentStore<T>,
}

/// Mutable access into the components of a store. The entity layout of the
/// store stays borrowed immutably, only component values could be changed.
pub struct FetchMut<'a, T> {
    entities: &'a [Entity],
    sparse: &'a HashMap<Entity, usize>,
    components: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<'a, T: Send> Send for FetchMut<'a, T> {}
unsafe impl<'a, T: Sync> Sync for FetchMut<'a, T> {}

impl<T> ComponentStore<T> {
    /// Gets read access for joining this store into a `View`.
    #[inline]
    pub fn fetch(&self) -> Fetch<T> {
        Fetch { store: self }
    }

    /// Gets write access for joining this store into a `View`.
    #[inline]
    pub fn fetch_mut(&mut self) -> FetchMut<T> {
        let (entities, sparse, components) = self.raw_parts_mut();
        FetchMut {
            entities,
            sparse,
            len: components.len(),
            components: components.as_mut_ptr(),
            _marker: PhantomData,
        }
    }

    /// Shortcut of `View::new(self.fetch())`.
    #[inline]
    pub fn view(&self) -> View<Fetch<T>> {
        View::new(self.fetch())
    }

    /// Shortcut of `View::new(self.fetch_mut())`.
    #[inline]
    pub fn view_mut(&mut self) -> View<FetchMut<T>> {
        View::new(self.fetch_mut())
    }
}

impl<'a, T> Fetch<'a, T> {
    #[inline]
    pub fn get(&self, ent: Entity) -> Option<&'a T> {
        self.store.get(ent)
    }
}

impl<'a, T> FetchMut<'a, T> {
    #[inline]
    pub fn get(&self, ent: Entity) -> Option<&T> {
        let index = *self.sparse.get(&ent)?;
        debug_assert!(index < self.len);
        unsafe { Some(&*self.components.add(index)) }
    }

    #[inline]
    pub fn get_mut(&mut self, ent: Entity) -> Option<&mut T> {
        let index = *self.sparse.get(&ent)?;
        debug_assert!(index < self.len);
        unsafe { Some(&mut *self.components.add(index)) }
    }
}

/// `Join` trait is used to provide a convenient way to access entities which
/// have specific components at the same time.
pub trait Join: Sized {
    type Item;

    /// Number of entities in the driving store.
    fn driver_len(&self) -> usize;

    /// The entity at `index` of the driving store.
    fn driver_entity(&self, index: usize) -> Option<Entity>;

    /// Returns true if `ent` is present in every joined store.
    fn contains(&self, ent: Entity) -> bool;

    /// Fetches the components of `ent`.
    ///
    /// # Safety
    ///
    /// Mutable joins hand out references which outlive `&mut self`, the caller
    /// must not fetch the same entity twice while a previous item is alive.
    unsafe fn fetch(&mut self, ent: Entity) -> Option<Self::Item>;
}

impl<'a, T> Join for Fetch<'a, T> {
    type Item = &'a T;

    #[inline]
    fn driver_len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    fn driver_entity(&self, index: usize) -> Option<Entity> {
        self.store.entity_at(index)
    }

    #[inline]
    fn contains(&self, ent: Entity) -> bool {
        self.store.has(ent)
    }

    #[inline]
    unsafe fn fetch(&mut self, ent: Entity) -> Option<Self::Item> {
        self.store.get(ent)
    }
}

impl<'a, T> Join for FetchMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn driver_len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    fn driver_entity(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).cloned()
    }

    #[inline]
    fn contains(&self, ent: Entity) -> bool {
        self.sparse.contains_key(&ent)
    }

    #[inline]
    unsafe fn fetch(&mut self, ent: Entity) -> Option<Self::Item> {
        let index = *self.sparse.get(&ent)?;
        debug_assert!(index < self.len);
        Some(&mut *self.components.add(index))
    }
}

macro_rules! impl_join {
    ($first:ident $(, $tps:ident)*) => (
        impl<$first: Join, $($tps: Join, )*> Join for ($first, $($tps, )*) {
            type Item = ($first::Item, $($tps::Item, )*);

            #[inline]
            fn driver_len(&self) -> usize {
                self.0.driver_len()
            }

            #[inline]
            fn driver_entity(&self, index: usize) -> Option<Entity> {
                self.0.driver_entity(index)
            }

            #[allow(non_snake_case)]
            #[inline]
            fn contains(&self, ent: Entity) -> bool {
                let ($first, $($tps, )*) = self;
                $first.contains(ent) $(&& $tps.contains(ent))*
            }

            #[allow(non_snake_case)]
            #[inline]
            unsafe fn fetch(&mut self, ent: Entity) -> Option<Self::Item> {
                let ($first, $($tps, )*) = self;
                Some(($first.fetch(ent)?, $($tps.fetch(ent)?, )*))
            }
        }
    );
}

impl_join!(T1);
impl_join!(T1, T2);
impl_join!(T1, T2, T3);
impl_join!(T1, T2, T3, T4);
impl_join!(T1, T2, T3, T4, T5);
impl_join!(T1, T2, T3, T4, T5, T6);
impl_join!(T1, T2, T3, T4, T5, T6, T7);
impl_join!(T1, T2, T3, T4, T5, T6, T7, T8);

/// A non-owning iteration adaptor over joined stores.
pub struct View<J: Join> {
    join: J,
}

impl<J: Join> View<J> {
    pub fn new(join: J) -> Self {
        View { join }
    }

    /// Upper bound of the number of items, which is the length of the driving
    /// store.
    #[inline]
    pub fn len_hint(&self) -> usize {
        self.join.driver_len()
    }

    /// Returns true if `ent` would be visited by this view.
    #[inline]
    pub fn contains(&self, ent: Entity) -> bool {
        self.join.contains(ent)
    }
}

impl<J: Join> IntoIterator for View<J> {
    type Item = (Entity, J::Item);
    type IntoIter = ViewIter<J>;

    fn into_iter(self) -> Self::IntoIter {
        ViewIter {
            join: self.join,
            cursor: 0,
        }
    }
}

/// The `ViewIter` iterates over the entities of a `View` in the storage order
/// of its driving store, and returns the `Entity` and its components.
pub struct ViewIter<J: Join> {
    join: J,
    cursor: usize,
}

impl<J: Join> Iterator for ViewIter<J> {
    type Item = (Entity, J::Item);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ent) = self.join.driver_entity(self.cursor) {
            self.cursor += 1;

            if !self.join.contains(ent) {
                continue;
            }

            // Entities are unique inside the driving store, so every entity is
            // fetched at most once.
            if let Some(item) = unsafe { self.join.fetch(ent) } {
                return Some((ent, item));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.join.driver_len();
        (0, Some(len.saturating_sub(self.cursor)))
    }
}

impl<J: Join> FusedIterator for ViewIter<J> {}
