//! Entity Component System (ECS)
//!
//! Entities are opaque 32-bit keys handed out by an `EntityAllocator`. Every
//! component type is stored densely in its own `ComponentStore`, and `View`s
//! join several stores by entity for iteration.

#[macro_use]
pub mod component;
pub mod builder;
pub mod cell;
pub mod entity;
pub mod store;
pub mod view;
pub mod world;

pub use self::builder::EntityBuilder;
pub use self::component::Component;
pub use self::entity::{Entity, EntityAllocator};
pub use self::store::{ComponentStore, ErasedStore};
pub use self::view::{Fetch, FetchMut, Join, View, ViewIter};
pub use self::world::World;
