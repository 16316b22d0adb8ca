//! Runtime destruction: pre-fractures a mesh into frozen chunks glued by breakable joints,
//! keeps track of which chunks are still held up by an anchor, and lets loose chunks fall.

extern crate nalgebra as na;
extern crate totality_model as model;
extern crate totality_sim as sim;
extern crate totality_sync as sync;

pub mod anchor;
pub mod config;
pub mod destruction;
pub mod fracture;
pub mod graph;
pub mod kernel;
pub mod node;
mod shatter;

pub use anchor::{AnchorMask, Face, FaceRegion};
pub use config::ShatterConfig;
pub use destruction::{ChunkState, Destruction, TickSummary};
pub use fracture::{Fracture, FractureRequest};
pub use graph::ConnectivityGraph;
pub use kernel::{Fragment, FractureKernel, SlabKernel};
pub use node::{ChunkBody, ChunkMesh, ChunkNode, Materials};

#[derive(Debug, thiserror::Error)]
pub enum ShatterError {
    #[error(transparent)]
    Model(#[from] model::ModelError),
    #[error(transparent)]
    Sim(#[from] sim::SimError),
    #[error(transparent)]
    Sync(#[from] sync::SyncError),
}

pub type ShatterResult<T> = Result<T, ShatterError>;
