//! Hearth is a small runtime core for simulations: a sparse-set entity
//! component system and a data-parallel job system.

#[macro_use]
extern crate log;
extern crate failure;
extern crate crossbeam_channel;
extern crate serde;
extern crate serde_json;

#[macro_use]
pub mod ecs;
pub mod errors;
pub mod prelude;
pub mod sched;
pub mod settings;
