//! Synchronization primitives shared between the simulation and the destruction system.

pub mod physics_lock;
pub mod unfreeze_queue;

pub use physics_lock::{PhysicsLock, PhysicsRead, PhysicsWrite};
pub use unfreeze_queue::UnfreezeQueue;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("the {0} lock was poisoned by a panicking holder")]
    Poisoned(&'static str),
}

pub type SyncResult<T> = Result<T, SyncError>;
