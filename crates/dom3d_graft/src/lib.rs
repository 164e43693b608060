//! # dom3d_graft - Renderer Side of the 3D DOM
//!
//! Grafts a facade onto a live native scene. The renderer's objects never
//! leave this crate; kernels see only IDs, snapshots and messages.
//!
//! ## Architecture
//!
//! ```text
//! NativeScene ──► CorrelatedSceneGraph ──► snapshot ──► kernels
//!      ▲                   │
//!      └── fan-out ◄───────┴──── MutationRequest (by ID)
//! ```
//!
//! ## Key Concepts
//!
//! - **NativeScene**: What correlation needs from a renderer
//! - **CorrelatedGroup**: The native objects that are one logical element
//! - **ModelGraft**: Serves snapshots and applies remote mutations

pub mod config;
pub mod correlation;
pub mod error;
pub mod graft;
pub mod native;

#[cfg(feature = "gltf")]
mod gltf_import;

pub use config::GraftConfig;
pub use correlation::{CorrelatedGroup, CorrelatedSceneGraph, MaterialOrder};
pub use error::{ConfigError, NativeError};
pub use graft::{ChangeHandler, GraftState, ModelGraft};
pub use native::{
    ImageDef, MaterialDef, MaterialParams, MemoryScene, NativeHandle, NativeMaterial, NativeScene,
    NativeTextureSlot, SamplerDef, SamplerParams, TextureBinding, TextureDef, TextureSlot,
};
