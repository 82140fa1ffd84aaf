//! Serialized access to one shared value.
//!
//! A [`ValueContainer`] owns a value and a [`CommandQueue`]. Every read and
//! write is a mutator run under the queue's execution lock, either right away
//! ([`Tier::Immediate`]) or after being placed in a priority heap with a
//! [`PriorityTag`] ([`Tier::Highest`], [`Tier::Lowest`]).
//!
//! Operations are reached through schedulers that hold the container weakly:
//!
//! ```ignore
//! let counter = ValueContainer::new(0u64);
//! let sync = counter.sync();
//! sync.lowest_priority().update(|n| *n += 1)?;
//!
//! let ui = SerialExecutor::new("ui")?;
//! counter.async_on(ui).highest_priority().get(|n| println!("{n:?}"));
//!
//! drop(counter);
//! assert!(sync.immediate().get().unwrap_err().is_container_gone());
//! ```

mod command;
mod container;
mod error;
mod queue;
mod scheduler;
mod spec;

pub use command::{Command, PriorityTag, Work};
pub use container::ValueContainer;
pub use error::{ContainerError, Result};
pub use queue::CommandQueue;
pub use scheduler::{AsyncActions, AsyncScheduler, SyncActions, SyncScheduler, Tier};
pub use spec::ContainerSpec;
pub use warden_exec::{ExecutionContext, Job, SerialExecutor, runtime_handle};
