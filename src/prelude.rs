pub use crate::ecs;
pub use crate::ecs::{
    Component, ComponentStore, Entity, EntityAllocator, EntityBuilder, Fetch, FetchMut, View,
    World,
};

pub use crate::sched;
pub use crate::sched::{Context, JobArgs, JobDispatcher, JobSystem, Scope};

pub use crate::errors;
pub use crate::errors::{Error, Result};

pub use crate::settings::{JobSystemParams, Settings, WorldParams};
