//! Functions for loading runtime settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::*;

/// A structure containing configuration data for the runtime, which are used
/// to setup the job system and the worlds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub world: WorldParams,
    pub jobs: JobSystemParams,
}

impl Settings {
    /// Parses settings from a JSON document. Missing fields fall back to their
    /// defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        info!("Loads settings from {:?}.", path.as_ref());
        Settings::from_json(&text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldParams {
    /// Initial capacity of every component store.
    pub reserve: usize,
    /// The first entity id handed out by the world's own allocator.
    pub seed: u32,
}

impl Default for WorldParams {
    fn default() -> Self {
        WorldParams { reserve: 0, seed: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSystemParams {
    /// Number of worker threads. `None` picks one less than the available
    /// hardware parallelism, leaving a core to the dispatching thread.
    pub workers: Option<usize>,
    /// Capacity of the bounded job queue. Dispatching into a full queue makes
    /// the dispatching thread execute jobs itself.
    pub queue_capacity: usize,
    /// Stack size of worker threads in bytes.
    pub stack_size: Option<usize>,
    /// Worker threads are named `{thread_name}-{index}`.
    pub thread_name: String,
}

impl JobSystemParams {
    /// Resolves the number of worker threads to spawn.
    pub fn num_workers(&self) -> usize {
        match self.workers {
            Some(num) => num,
            None => ::std::thread::available_parallelism()
                .map(|v| v.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1),
        }
    }
}

impl Default for JobSystemParams {
    fn default() -> Self {
        JobSystemParams {
            workers: None,
            queue_capacity: 128,
            stack_size: None,
            thread_name: "jobsystem-worker".to_owned(),
        }
    }
}
