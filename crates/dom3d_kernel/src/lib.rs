//! # dom3d_kernel - Consumer Side of the 3D DOM
//!
//! Runs in the isolated realm. Holds a private copy of the model built from
//! a snapshot and exposes it as facade elements; writes travel to the graft
//! as messages and settle as tickets.
//!
//! ## Key Concepts
//!
//! - **ModelKernel**: Owns the arena, the channel and the pending mutations
//! - **ThreeDomElement**: Common surface of Model, Material, PBR, textures
//! - **MutationTicket**: Settles once the graft answers (or the kernel stops)
//!
//! ## Example
//!
//! ```ignore
//! let kernel = ModelKernel::new(endpoint, snapshot)?;
//! let material = &kernel.model().materials()[0];
//! let ticket = material.set_metallic_factor(0.5);
//! // ... graft pumps, then:
//! kernel.pump();
//! assert_eq!(ticket.try_result(), Some(Ok(())));
//! ```

pub mod config;
pub mod facade;
pub mod kernel;
pub mod ticket;

pub use config::{ConfigError, KernelConfig};
pub use facade::{
    Image, Material, Model, PbrMetallicRoughness, Sampler, Texture, TextureInfo, ThreeDomElement,
};
pub use kernel::{ChangeHandler, KernelStatus, ModelKernel};
pub use ticket::{MutationResult, MutationTicket};
