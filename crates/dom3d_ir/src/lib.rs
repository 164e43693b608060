//! # dom3d_ir - Shared Vocabulary of the 3D DOM
//!
//! Everything both realms must agree on: the element arena, the snapshot
//! format and its codec, the typed mutation vocabulary, the wire messages
//! and the channel that carries them.
//!
//! ## Architecture
//!
//! ```text
//! Renderer realm                              Consumer realm
//! ┌───────────────┐   snapshot (JSON)   ┌───────────────┐
//! │ ModelGraft    │ ──────────────────► │ ModelKernel   │
//! │  ElementArena │ ◄── MutationRequest │  ElementArena │
//! │               │ MutationResponse ─► │               │
//! │               │ ChangeNotification► │               │
//! └───────────────┘                     └───────────────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **ElementArena**: Flat, ID-indexed store of one model's elements
//! - **Mutation**: A property write narrowed through a per-kind allow-list
//! - **SerializedModel**: The JSON snapshot a kernel is built from
//! - **Endpoint**: One end of the message channel

pub mod arena;
pub mod channel;
pub mod codec;
pub mod error;
pub mod message;
pub mod property;
pub mod snapshot;
pub mod value;

pub use arena::{
    Element, ElementArena, ImageRecord, MaterialRecord, ModelRecord, PbrRecord, SamplerRecord,
    TextureInfoRecord, TextureRecord,
};
pub use channel::Endpoint;
pub use error::{ChannelError, CodecError, CodecResult, MutationError};
pub use message::{ChangeNotification, MutationRequest, MutationResponse, RequestId, WireMessage};
pub use property::{AlphaMode, ElementKind, MagFilter, MinFilter, Mutation, Property, WrapMode};
pub use snapshot::{
    SerializedImage, SerializedMaterial, SerializedModel, SerializedPbrMetallicRoughness,
    SerializedSampler, SerializedTexture, SerializedTextureInfo,
};
pub use value::Value;

pub use dom3d_core::LocallyUniqueId;
