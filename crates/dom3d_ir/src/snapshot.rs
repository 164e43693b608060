//! Serialized snapshot records
//!
//! The JSON-safe shape of a model as it crosses realms. Field names follow
//! the document format. Optional fields that are absent in the source are
//! omitted from the output rather than written as `null`.

use crate::property::{AlphaMode, MagFilter, MinFilter, WrapMode};
use dom3d_core::LocallyUniqueId;
use serde::{Deserialize, Serialize};

/// Root of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedModel {
    pub id: LocallyUniqueId,
    pub model_uri: String,
    pub materials: Vec<SerializedMaterial>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<SerializedTexture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samplers: Vec<SerializedSampler>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<SerializedImage>,
}

/// A material with its PBR block and texture infos inlined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedMaterial {
    pub id: LocallyUniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<SerializedPbrMetallicRoughness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<SerializedTextureInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<SerializedTextureInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<SerializedTextureInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_factor: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<AlphaMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_sided: Option<bool>,
}

/// Metallic-roughness parameters of a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPbrMetallicRoughness {
    pub id: LocallyUniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_factor: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness_factor: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<SerializedTextureInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<SerializedTextureInfo>,
}

/// A material's reference to a texture
///
/// `scale` is only present on normal textures and `strength` only on
/// occlusion textures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTextureInfo {
    pub id: LocallyUniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<LocallyUniqueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tex_coord: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

/// A texture, pairing an optional sampler with an optional image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTexture {
    pub id: LocallyUniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<LocallyUniqueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LocallyUniqueId>,
}

/// Texture sampling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSampler {
    pub id: LocallyUniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<MagFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<MinFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_s: Option<WrapMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_t: Option<WrapMode>,
}

/// Image metadata; pixel data never crosses the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedImage {
    pub id: LocallyUniqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}
