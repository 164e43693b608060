//! Serialization codec - element arena to snapshot and back
//!
//! Serializing walks the unique logical elements of an arena (never the
//! individual native occurrences behind them), inlining owned sub-elements
//! and listing textures, samplers and images once at model level.
//! Deserializing rebuilds an arena from a snapshot without any renderer.

use crate::arena::{Element, ElementArena, MaterialRecord, PbrRecord};
use crate::error::{CodecError, CodecResult};
use crate::snapshot::{
    SerializedMaterial, SerializedModel, SerializedPbrMetallicRoughness, SerializedTextureInfo,
};
use dom3d_core::LocallyUniqueId;

/// Produce a snapshot of `arena`
///
/// Deterministic: serializing an unchanged arena twice yields identical JSON.
pub fn serialize(arena: &ElementArena) -> SerializedModel {
    let model = arena.model();
    let info = |id: Option<LocallyUniqueId>| id.and_then(|id| arena.texture_info(id)).cloned();

    let materials = arena
        .materials()
        .map(|material| SerializedMaterial {
            id: material.id,
            name: material.name.clone(),
            pbr_metallic_roughness: material
                .pbr_metallic_roughness
                .and_then(|id| arena.pbr_metallic_roughness(id))
                .map(|pbr| SerializedPbrMetallicRoughness {
                    id: pbr.id,
                    base_color_factor: pbr.base_color_factor,
                    metallic_factor: pbr.metallic_factor,
                    roughness_factor: pbr.roughness_factor,
                    base_color_texture: info(pbr.base_color_texture),
                    metallic_roughness_texture: info(pbr.metallic_roughness_texture),
                }),
            normal_texture: info(material.normal_texture),
            occlusion_texture: info(material.occlusion_texture),
            emissive_texture: info(material.emissive_texture),
            emissive_factor: material.emissive_factor,
            alpha_mode: material.alpha_mode,
            alpha_cutoff: material.alpha_cutoff,
            double_sided: material.double_sided,
        })
        .collect();

    SerializedModel {
        id: model.id,
        model_uri: model.model_uri.clone(),
        materials,
        textures: arena.textures().cloned().collect(),
        samplers: arena.samplers().cloned().collect(),
        images: arena.images().cloned().collect(),
    }
}

/// Rebuild an arena from a snapshot
///
/// Fails on duplicate IDs and on references to IDs the snapshot does not
/// define with the expected kind.
pub fn deserialize(snapshot: SerializedModel) -> CodecResult<ElementArena> {
    let mut arena = ElementArena::new(snapshot.id, snapshot.model_uri);
    let mut infos: Vec<(LocallyUniqueId, Option<LocallyUniqueId>)> = Vec::new();

    let mut insert_info = |arena: &mut ElementArena,
                           info: Option<SerializedTextureInfo>|
     -> CodecResult<Option<LocallyUniqueId>> {
        match info {
            Some(info) => {
                let id = info.id;
                infos.push((id, info.texture));
                arena.insert(Element::TextureInfo(info))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    };

    for material in snapshot.materials {
        let pbr_id = match material.pbr_metallic_roughness {
            Some(pbr) => {
                let record = PbrRecord {
                    id: pbr.id,
                    base_color_factor: pbr.base_color_factor,
                    metallic_factor: pbr.metallic_factor,
                    roughness_factor: pbr.roughness_factor,
                    base_color_texture: insert_info(&mut arena, pbr.base_color_texture)?,
                    metallic_roughness_texture: insert_info(
                        &mut arena,
                        pbr.metallic_roughness_texture,
                    )?,
                };
                arena.insert(Element::PbrMetallicRoughness(record))?;
                Some(pbr.id)
            }
            None => None,
        };

        let record = MaterialRecord {
            id: material.id,
            name: material.name,
            pbr_metallic_roughness: pbr_id,
            normal_texture: insert_info(&mut arena, material.normal_texture)?,
            occlusion_texture: insert_info(&mut arena, material.occlusion_texture)?,
            emissive_texture: insert_info(&mut arena, material.emissive_texture)?,
            emissive_factor: material.emissive_factor,
            alpha_mode: material.alpha_mode,
            alpha_cutoff: material.alpha_cutoff,
            double_sided: material.double_sided,
        };
        arena.insert(Element::Material(record))?;
    }

    for texture in snapshot.textures {
        arena.insert(Element::Texture(texture))?;
    }
    for sampler in snapshot.samplers {
        arena.insert(Element::Sampler(sampler))?;
    }
    for image in snapshot.images {
        arena.insert(Element::Image(image))?;
    }

    for (info, texture) in infos {
        check_reference(info, texture, "Texture", |id| arena.texture(id).is_some())?;
    }
    for texture in arena.textures() {
        check_reference(texture.id, texture.sampler, "Sampler", |id| arena.sampler(id).is_some())?;
        check_reference(texture.id, texture.source, "Image", |id| arena.image(id).is_some())?;
    }

    Ok(arena)
}

fn check_reference(
    element: LocallyUniqueId,
    target: Option<LocallyUniqueId>,
    expected: &'static str,
    exists: impl Fn(LocallyUniqueId) -> bool,
) -> CodecResult<()> {
    match target {
        Some(target) if !exists(target) => Err(CodecError::DanglingReference {
            element,
            target,
            expected,
        }),
        _ => Ok(()),
    }
}

/// Encode a snapshot as JSON text
pub fn to_json(snapshot: &SerializedModel) -> CodecResult<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Decode a snapshot from JSON text
pub fn from_json(json: &str) -> CodecResult<SerializedModel> {
    Ok(serde_json::from_str(json)?)
}

/// Decode JSON text straight into an arena
pub fn decode(json: &str) -> CodecResult<ElementArena> {
    deserialize(from_json(json)?)
}
