//! Native scene capability and an in-memory implementation
//!
//! Renderers typically clone a document material once per draw, so a single
//! material definition shows up as several native objects. [`NativeScene`]
//! is the narrow surface the correlation layer needs from a renderer: walk
//! every native material object, resolve definition indices, and write a
//! validated mutation into one object.
//!
//! [`MemoryScene`] implements it without a GPU. It is what the tests run
//! against and what the glTF import produces.

use crate::error::NativeError;
use dom3d_ir::{AlphaMode, MagFilter, MinFilter, Mutation, WrapMode};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies one native object in a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native:{}", self.0)
    }
}

/// Material slot a texture is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    BaseColor,
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
}

impl TextureSlot {
    /// Whether the slot belongs to the PBR block rather than the material
    pub fn is_pbr(self) -> bool {
        matches!(self, Self::BaseColor | Self::MetallicRoughness)
    }
}

/// Scalar material state
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Option<[f32; 3]>,
    pub alpha_mode: Option<AlphaMode>,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: Option<bool>,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: None,
            alpha_mode: None,
            alpha_cutoff: None,
            double_sided: None,
        }
    }
}

/// A material's binding of a texture definition to a slot
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub slot: TextureSlot,
    /// Texture definition index
    pub texture: usize,
    pub tex_coord: Option<u32>,
    pub scale: Option<f32>,
    pub strength: Option<f32>,
}

impl TextureBinding {
    /// Bind texture `texture` to `slot` with no extra parameters
    pub fn new(slot: TextureSlot, texture: usize) -> Self {
        Self {
            slot,
            texture,
            tex_coord: None,
            scale: None,
            strength: None,
        }
    }
}

/// A material definition as stored in the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialDef {
    pub name: Option<String>,
    pub params: MaterialParams,
    pub textures: Vec<TextureBinding>,
}

/// Sampling state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplerParams {
    pub mag_filter: Option<MagFilter>,
    pub min_filter: Option<MinFilter>,
    pub wrap_s: Option<WrapMode>,
    pub wrap_t: Option<WrapMode>,
}

/// A texture definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureDef {
    pub name: Option<String>,
    /// Sampler definition index
    pub sampler: Option<usize>,
    /// Image definition index
    pub source: Option<usize>,
}

/// A sampler definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplerDef {
    pub name: Option<String>,
    pub params: SamplerParams,
}

/// An image definition; only metadata, pixels stay in the renderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageDef {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
}

/// A native texture object living in one material slot
#[derive(Debug, Clone, PartialEq)]
pub struct NativeTextureSlot {
    pub handle: NativeHandle,
    pub binding: TextureBinding,
    pub sampling: SamplerParams,
}

/// A native material object
#[derive(Debug, Clone, PartialEq)]
pub struct NativeMaterial {
    pub handle: NativeHandle,
    /// Index of the material definition this object was created from
    pub definition: usize,
    pub name: Option<String>,
    pub params: MaterialParams,
    pub textures: Vec<NativeTextureSlot>,
}

/// What the correlation layer needs from a renderer
pub trait NativeScene {
    /// Visit every native material object in traversal order
    fn for_each_material_user(&self, visit: &mut dyn FnMut(&NativeMaterial));

    /// Look up a texture definition
    fn resolve_texture_ref(&self, index: usize) -> Option<&TextureDef>;

    /// Look up a sampler definition
    fn resolve_sampler_ref(&self, index: usize) -> Option<&SamplerDef>;

    /// Look up an image definition
    fn resolve_image_ref(&self, index: usize) -> Option<&ImageDef>;

    /// Write a validated mutation into one native object
    fn apply(&mut self, handle: NativeHandle, mutation: &Mutation) -> Result<(), NativeError>;
}

#[derive(Debug, Clone, Copy)]
enum Location {
    Material(usize),
    Texture(usize, usize),
}

/// In-memory native scene
#[derive(Debug, Default)]
pub struct MemoryScene {
    definitions: Vec<MaterialDef>,
    objects: Vec<NativeMaterial>,
    textures: Vec<TextureDef>,
    samplers: Vec<SamplerDef>,
    images: Vec<ImageDef>,
    locations: HashMap<NativeHandle, Location>,
    failing: HashSet<NativeHandle>,
    next_handle: u64,
}

impl MemoryScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material definition, returning its index
    pub fn add_material(&mut self, def: MaterialDef) -> usize {
        self.definitions.push(def);
        self.definitions.len() - 1
    }

    /// Add a texture definition, returning its index
    pub fn add_texture(&mut self, def: TextureDef) -> usize {
        self.textures.push(def);
        self.textures.len() - 1
    }

    /// Add a sampler definition, returning its index
    pub fn add_sampler(&mut self, def: SamplerDef) -> usize {
        self.samplers.push(def);
        self.samplers.len() - 1
    }

    /// Add an image definition, returning its index
    pub fn add_image(&mut self, def: ImageDef) -> usize {
        self.images.push(def);
        self.images.len() - 1
    }

    /// Create a native material object from definition `definition`
    ///
    /// Each call yields a fresh object with its own texture objects, the way
    /// a renderer clones a material per draw. Returns `None` for an unknown
    /// definition.
    pub fn instantiate(&mut self, definition: usize) -> Option<NativeHandle> {
        let def = self.definitions.get(definition)?.clone();
        let object_index = self.objects.len();
        let handle = self.allocate(Location::Material(object_index));

        let mut textures = Vec::with_capacity(def.textures.len());
        for (slot_index, binding) in def.textures.into_iter().enumerate() {
            let sampling = self
                .textures
                .get(binding.texture)
                .and_then(|t| t.sampler)
                .and_then(|s| self.samplers.get(s))
                .map(|s| s.params)
                .unwrap_or_default();
            textures.push(NativeTextureSlot {
                handle: self.allocate(Location::Texture(object_index, slot_index)),
                binding,
                sampling,
            });
        }

        self.objects.push(NativeMaterial {
            handle,
            definition,
            name: def.name,
            params: def.params,
            textures,
        });
        Some(handle)
    }

    /// Make every later write to `handle` fail
    pub fn fail_on(&mut self, handle: NativeHandle) {
        self.failing.insert(handle);
    }

    /// Clear all injected failures
    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Look up a native material object
    pub fn material(&self, handle: NativeHandle) -> Option<&NativeMaterial> {
        match self.locations.get(&handle)? {
            Location::Material(index) => self.objects.get(*index),
            Location::Texture(..) => None,
        }
    }

    /// Look up a native texture object
    pub fn texture_slot(&self, handle: NativeHandle) -> Option<&NativeTextureSlot> {
        match self.locations.get(&handle)? {
            Location::Texture(object, slot) => self.objects.get(*object)?.textures.get(*slot),
            Location::Material(_) => None,
        }
    }

    /// All native material objects
    pub fn objects(&self) -> &[NativeMaterial] {
        &self.objects
    }

    /// Number of material definitions
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    fn allocate(&mut self, location: Location) -> NativeHandle {
        let handle = NativeHandle(self.next_handle);
        self.next_handle += 1;
        self.locations.insert(handle, location);
        handle
    }
}

impl NativeScene for MemoryScene {
    fn for_each_material_user(&self, visit: &mut dyn FnMut(&NativeMaterial)) {
        for object in &self.objects {
            visit(object);
        }
    }

    fn resolve_texture_ref(&self, index: usize) -> Option<&TextureDef> {
        self.textures.get(index)
    }

    fn resolve_sampler_ref(&self, index: usize) -> Option<&SamplerDef> {
        self.samplers.get(index)
    }

    fn resolve_image_ref(&self, index: usize) -> Option<&ImageDef> {
        self.images.get(index)
    }

    fn apply(&mut self, handle: NativeHandle, mutation: &Mutation) -> Result<(), NativeError> {
        if self.failing.contains(&handle) {
            return Err(NativeError::Rejected(handle));
        }
        let unsupported = NativeError::Unsupported {
            handle,
            property: mutation.property(),
        };

        match *self.locations.get(&handle).ok_or(NativeError::UnknownHandle(handle))? {
            Location::Material(index) => {
                let params = &mut self
                    .objects
                    .get_mut(index)
                    .ok_or(NativeError::UnknownHandle(handle))?
                    .params;
                match *mutation {
                    Mutation::BaseColorFactor(c) => params.base_color_factor = c,
                    Mutation::MetallicFactor(f) => params.metallic_factor = f,
                    Mutation::RoughnessFactor(f) => params.roughness_factor = f,
                    Mutation::EmissiveFactor(c) => params.emissive_factor = Some(c),
                    Mutation::AlphaMode(mode) => params.alpha_mode = Some(mode),
                    Mutation::AlphaCutoff(cutoff) => params.alpha_cutoff = Some(cutoff),
                    Mutation::DoubleSided(b) => params.double_sided = Some(b),
                    _ => return Err(unsupported),
                }
            }
            Location::Texture(object, slot) => {
                let sampling = &mut self
                    .objects
                    .get_mut(object)
                    .and_then(|o| o.textures.get_mut(slot))
                    .ok_or(NativeError::UnknownHandle(handle))?
                    .sampling;
                match *mutation {
                    Mutation::MinFilter(filter) => sampling.min_filter = Some(filter),
                    Mutation::MagFilter(filter) => sampling.mag_filter = Some(filter),
                    Mutation::WrapS(wrap) => sampling.wrap_s = Some(wrap),
                    Mutation::WrapT(wrap) => sampling.wrap_t = Some(wrap),
                    _ => return Err(unsupported),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_scene() -> (MemoryScene, usize) {
        let mut scene = MemoryScene::new();
        let sampler = scene.add_sampler(SamplerDef {
            name: None,
            params: SamplerParams {
                mag_filter: Some(MagFilter::Linear),
                ..Default::default()
            },
        });
        let texture = scene.add_texture(TextureDef {
            sampler: Some(sampler),
            ..Default::default()
        });
        let material = scene.add_material(MaterialDef {
            name: Some("Paint".into()),
            textures: vec![TextureBinding::new(TextureSlot::BaseColor, texture)],
            ..Default::default()
        });
        (scene, material)
    }

    #[test]
    fn test_instantiate_clones_definition() {
        let (mut scene, material) = textured_scene();
        let a = scene.instantiate(material).unwrap();
        let b = scene.instantiate(material).unwrap();
        assert_ne!(a, b);
        assert_eq!(scene.objects().len(), 2);

        let slot = scene.material(a).unwrap().textures[0].handle;
        assert_eq!(scene.texture_slot(slot).unwrap().sampling.mag_filter, Some(MagFilter::Linear));
        assert!(scene.instantiate(99).is_none());
    }

    #[test]
    fn test_apply_targets_one_object() {
        let (mut scene, material) = textured_scene();
        let a = scene.instantiate(material).unwrap();
        let b = scene.instantiate(material).unwrap();

        scene.apply(a, &Mutation::MetallicFactor(0.25)).unwrap();
        assert_eq!(scene.material(a).unwrap().params.metallic_factor, 0.25);
        assert_eq!(scene.material(b).unwrap().params.metallic_factor, 1.0);

        let slot = scene.material(b).unwrap().textures[0].handle;
        scene.apply(slot, &Mutation::WrapS(WrapMode::Repeat)).unwrap();
        assert_eq!(scene.texture_slot(slot).unwrap().sampling.wrap_s, Some(WrapMode::Repeat));
    }

    #[test]
    fn test_apply_errors() {
        let (mut scene, material) = textured_scene();
        let a = scene.instantiate(material).unwrap();

        assert!(matches!(
            scene.apply(a, &Mutation::WrapS(WrapMode::Repeat)),
            Err(NativeError::Unsupported { .. })
        ));
        assert_eq!(
            scene.apply(NativeHandle(999), &Mutation::DoubleSided(true)),
            Err(NativeError::UnknownHandle(NativeHandle(999)))
        );

        scene.fail_on(a);
        assert_eq!(scene.apply(a, &Mutation::DoubleSided(true)), Err(NativeError::Rejected(a)));
        scene.clear_failures();
        assert!(scene.apply(a, &Mutation::DoubleSided(true)).is_ok());
    }
}
