//! glTF import into a [`MemoryScene`]
//!
//! Materials, textures, samplers and images become definitions; every mesh
//! primitive gets its own native material object, the way a renderer clones
//! a material per draw. Primitives without a material share a synthetic
//! default definition placed after the document's materials.

use crate::native::{
    ImageDef, MaterialDef, MaterialParams, MemoryScene, SamplerDef, SamplerParams, TextureBinding,
    TextureDef, TextureSlot,
};
use dom3d_ir::{AlphaMode, MagFilter, MinFilter, WrapMode};

impl MemoryScene {
    /// Build a native scene from a parsed glTF document
    pub fn from_gltf(document: &gltf::Document) -> Self {
        let mut scene = MemoryScene::new();

        for image in document.images() {
            let (uri, mime_type) = match image.source() {
                gltf::image::Source::Uri { uri, mime_type } => {
                    (Some(uri.to_string()), mime_type.map(str::to_string))
                }
                gltf::image::Source::View { mime_type, .. } => (None, Some(mime_type.to_string())),
            };
            scene.add_image(ImageDef {
                name: image.name().map(str::to_string),
                uri,
                mime_type,
            });
        }

        for sampler in document.samplers() {
            scene.add_sampler(convert_sampler(&sampler));
        }

        for texture in document.textures() {
            scene.add_texture(TextureDef {
                name: texture.name().map(str::to_string),
                sampler: texture.sampler().index(),
                source: Some(texture.source().index()),
            });
        }

        for material in document.materials() {
            scene.add_material(convert_material(&material));
        }

        let mut default_material = None;
        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                let definition = match primitive.material().index() {
                    Some(index) => index,
                    None => *default_material
                        .get_or_insert_with(|| scene.add_material(MaterialDef::default())),
                };
                if scene.instantiate(definition).is_none() {
                    log::warn!(
                        "Primitive {} of mesh {} references missing material {}",
                        primitive.index(),
                        mesh.index(),
                        definition
                    );
                }
            }
        }

        log::debug!(
            "Imported glTF: {} material definitions, {} native material objects",
            scene.definition_count(),
            scene.objects().len()
        );
        scene
    }
}

fn convert_material(material: &gltf::Material<'_>) -> MaterialDef {
    let pbr = material.pbr_metallic_roughness();
    let mut textures = Vec::new();

    if let Some(info) = pbr.base_color_texture() {
        textures.push(binding(TextureSlot::BaseColor, &info));
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        textures.push(binding(TextureSlot::MetallicRoughness, &info));
    }
    if let Some(normal) = material.normal_texture() {
        textures.push(TextureBinding {
            tex_coord: Some(normal.tex_coord()),
            scale: Some(normal.scale()),
            ..TextureBinding::new(TextureSlot::Normal, normal.texture().index())
        });
    }
    if let Some(occlusion) = material.occlusion_texture() {
        textures.push(TextureBinding {
            tex_coord: Some(occlusion.tex_coord()),
            strength: Some(occlusion.strength()),
            ..TextureBinding::new(TextureSlot::Occlusion, occlusion.texture().index())
        });
    }
    if let Some(info) = material.emissive_texture() {
        textures.push(binding(TextureSlot::Emissive, &info));
    }

    let alpha_mode = match material.alpha_mode() {
        gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
        gltf::material::AlphaMode::Mask => AlphaMode::Mask,
        gltf::material::AlphaMode::Blend => AlphaMode::Blend,
    };

    MaterialDef {
        name: material.name().map(str::to_string),
        params: MaterialParams {
            base_color_factor: pbr.base_color_factor(),
            metallic_factor: pbr.metallic_factor(),
            roughness_factor: pbr.roughness_factor(),
            emissive_factor: Some(material.emissive_factor()),
            alpha_mode: Some(alpha_mode),
            alpha_cutoff: material.alpha_cutoff(),
            double_sided: Some(material.double_sided()),
        },
        textures,
    }
}

fn binding(slot: TextureSlot, info: &gltf::texture::Info<'_>) -> TextureBinding {
    TextureBinding {
        tex_coord: Some(info.tex_coord()),
        ..TextureBinding::new(slot, info.texture().index())
    }
}

fn convert_sampler(sampler: &gltf::texture::Sampler<'_>) -> SamplerDef {
    let params = SamplerParams {
        mag_filter: sampler
            .mag_filter()
            .and_then(|f| MagFilter::try_from(f.as_gl_enum()).ok()),
        min_filter: sampler
            .min_filter()
            .and_then(|f| MinFilter::try_from(f.as_gl_enum()).ok()),
        wrap_s: WrapMode::try_from(sampler.wrap_s().as_gl_enum()).ok(),
        wrap_t: WrapMode::try_from(sampler.wrap_t().as_gl_enum()).ok(),
    };
    SamplerDef {
        name: sampler.name().map(str::to_string),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelatedSceneGraph, MaterialOrder};
    use dom3d_core::IdAllocator;
    use dom3d_ir::ElementKind;

    const DOCUMENT: &str = r#"{
        "asset": { "version": "2.0" },
        "images": [{ "uri": "albedo.png", "mimeType": "image/png" }],
        "samplers": [{ "magFilter": 9729, "minFilter": 9987, "wrapS": 33071 }],
        "textures": [{ "sampler": 0, "source": 0 }],
        "materials": [
            {
                "name": "Paint",
                "pbrMetallicRoughness": {
                    "baseColorFactor": [1, 0, 0, 1],
                    "metallicFactor": 0.5,
                    "baseColorTexture": { "index": 0 }
                },
                "alphaMode": "MASK",
                "alphaCutoff": 0.25
            }
        ],
        "meshes": [
            { "primitives": [
                { "attributes": {}, "material": 0 },
                { "attributes": {}, "material": 0 },
                { "attributes": {} }
            ] }
        ]
    }"#;

    fn document() -> gltf::Document {
        gltf::Gltf::from_slice_without_validation(DOCUMENT.as_bytes())
            .unwrap()
            .document
    }

    #[test]
    fn test_each_primitive_gets_its_own_object() {
        let scene = MemoryScene::from_gltf(&document());
        assert_eq!(scene.definition_count(), 2);
        assert_eq!(scene.objects().len(), 3);

        let paint = &scene.objects()[0];
        assert_eq!(paint.name.as_deref(), Some("Paint"));
        assert_eq!(paint.params.base_color_factor, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(paint.params.alpha_mode, Some(AlphaMode::Mask));
        assert_eq!(paint.params.alpha_cutoff, Some(0.25));
        assert_eq!(paint.textures[0].sampling.min_filter, Some(MinFilter::LinearMipmapLinear));
        // Unset wrap modes take the glTF default
        assert_eq!(paint.textures[0].sampling.wrap_t, Some(WrapMode::Repeat));
    }

    #[test]
    fn test_imported_scene_correlates() {
        let scene = MemoryScene::from_gltf(&document());
        let graph = CorrelatedSceneGraph::build(&scene, &IdAllocator::new(), "a.gltf", MaterialOrder::default());

        assert_eq!(graph.materials().count(), 2);
        let paint = graph.materials().next().unwrap();
        assert_eq!(graph.group(paint.id).unwrap().len(), 2);

        let arena = graph.arena();
        assert_eq!(arena.images().next().unwrap().uri.as_deref(), Some("albedo.png"));
        let sampler = arena.samplers().next().unwrap();
        assert_eq!(graph.kind_of(sampler.id), Some(ElementKind::Sampler));
        assert_eq!(sampler.mag_filter, Some(MagFilter::Linear));
    }
}
