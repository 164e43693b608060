//! # dom3d_core - Identity Primitives
//!
//! Every facade element and every correlated group of renderer objects is
//! referenced across realms by a [`LocallyUniqueId`]. Each realm runs its own
//! [`IdAllocator`]; IDs are only meaningful inside the snapshot that produced
//! them.

pub mod id;

pub use id::{IdAllocator, LocallyUniqueId, SubscriberId};
