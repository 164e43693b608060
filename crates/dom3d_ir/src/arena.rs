//! Element arena - the flat, ID-indexed store of one realm's element tree
//!
//! The graft fills an arena during correlation; every kernel fills its own
//! from a snapshot. Arenas hold plain records linked by ID and never share
//! references with each other.

use crate::error::{CodecError, MutationError};
use crate::property::{AlphaMode, ElementKind, Mutation, Property};
use crate::snapshot::{SerializedImage, SerializedSampler, SerializedTexture, SerializedTextureInfo};
use crate::value::Value;
use dom3d_core::LocallyUniqueId;
use std::collections::HashMap;

/// Texture info records are stored exactly as serialized
pub type TextureInfoRecord = SerializedTextureInfo;
/// Texture records are stored exactly as serialized
pub type TextureRecord = SerializedTexture;
/// Sampler records are stored exactly as serialized
pub type SamplerRecord = SerializedSampler;
/// Image records are stored exactly as serialized
pub type ImageRecord = SerializedImage;

/// Root record
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub id: LocallyUniqueId,
    pub model_uri: String,
    /// Materials in model order
    pub materials: Vec<LocallyUniqueId>,
}

/// Material record with its owned sub-elements referenced by ID
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialRecord {
    pub id: LocallyUniqueId,
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<LocallyUniqueId>,
    pub normal_texture: Option<LocallyUniqueId>,
    pub occlusion_texture: Option<LocallyUniqueId>,
    pub emissive_texture: Option<LocallyUniqueId>,
    pub emissive_factor: Option<[f32; 3]>,
    pub alpha_mode: Option<AlphaMode>,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: Option<bool>,
}

/// PBR metallic-roughness record
///
/// Factors absent from the source stay `None` so they are not written back
/// out; reads go through the effective accessors, which fall back to the
/// document-format defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrRecord {
    pub id: LocallyUniqueId,
    pub base_color_factor: Option<[f32; 4]>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
    pub base_color_texture: Option<LocallyUniqueId>,
    pub metallic_roughness_texture: Option<LocallyUniqueId>,
}

impl PbrRecord {
    /// A record with every factor unset and no textures
    pub fn new(id: LocallyUniqueId) -> Self {
        Self {
            id,
            base_color_factor: None,
            metallic_factor: None,
            roughness_factor: None,
            base_color_texture: None,
            metallic_roughness_texture: None,
        }
    }

    pub fn base_color(&self) -> [f32; 4] {
        self.base_color_factor.unwrap_or([1.0, 1.0, 1.0, 1.0])
    }

    pub fn metallic(&self) -> f32 {
        self.metallic_factor.unwrap_or(1.0)
    }

    pub fn roughness(&self) -> f32 {
        self.roughness_factor.unwrap_or(1.0)
    }
}

/// Any non-root element
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Material(MaterialRecord),
    PbrMetallicRoughness(PbrRecord),
    TextureInfo(TextureInfoRecord),
    Texture(TextureRecord),
    Sampler(SamplerRecord),
    Image(ImageRecord),
}

impl Element {
    /// The element's ID
    pub fn id(&self) -> LocallyUniqueId {
        match self {
            Self::Material(r) => r.id,
            Self::PbrMetallicRoughness(r) => r.id,
            Self::TextureInfo(r) => r.id,
            Self::Texture(r) => r.id,
            Self::Sampler(r) => r.id,
            Self::Image(r) => r.id,
        }
    }

    /// The element's kind
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Material(_) => ElementKind::Material,
            Self::PbrMetallicRoughness(_) => ElementKind::PbrMetallicRoughness,
            Self::TextureInfo(_) => ElementKind::TextureInfo,
            Self::Texture(_) => ElementKind::Texture,
            Self::Sampler(_) => ElementKind::Sampler,
            Self::Image(_) => ElementKind::Image,
        }
    }

    /// The element's name, for kinds that carry one
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Material(r) => r.name.as_deref(),
            Self::Texture(r) => r.name.as_deref(),
            Self::Sampler(r) => r.name.as_deref(),
            Self::Image(r) => r.name.as_deref(),
            Self::PbrMetallicRoughness(_) | Self::TextureInfo(_) => None,
        }
    }
}

macro_rules! typed_lookup {
    ($(#[$meta:meta])* $fn_name:ident, $variant:ident, $record:ty) => {
        $(#[$meta])*
        pub fn $fn_name(&self, id: LocallyUniqueId) -> Option<&$record> {
            match self.elements.get(&id) {
                Some(Element::$variant(record)) => Some(record),
                _ => None,
            }
        }
    };
}

/// Flat store of one model's elements
#[derive(Debug, Clone)]
pub struct ElementArena {
    model: ModelRecord,
    elements: HashMap<LocallyUniqueId, Element>,
    textures: Vec<LocallyUniqueId>,
    samplers: Vec<LocallyUniqueId>,
    images: Vec<LocallyUniqueId>,
}

impl ElementArena {
    /// Create an arena holding only the model root
    pub fn new(model_id: LocallyUniqueId, model_uri: impl Into<String>) -> Self {
        Self {
            model: ModelRecord {
                id: model_id,
                model_uri: model_uri.into(),
                materials: Vec::new(),
            },
            elements: HashMap::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
            images: Vec::new(),
        }
    }

    /// The model root
    pub fn model(&self) -> &ModelRecord {
        &self.model
    }

    /// ID of the owning model, shared by every element
    pub fn owner_model_id(&self) -> LocallyUniqueId {
        self.model.id
    }

    /// Insert a record
    ///
    /// Materials are appended to the model's material list; textures,
    /// samplers and images to their model-level lists.
    pub fn insert(&mut self, element: Element) -> Result<(), CodecError> {
        let id = element.id();
        if id == self.model.id || self.elements.contains_key(&id) {
            return Err(CodecError::DuplicateId(id));
        }
        match element.kind() {
            ElementKind::Material => self.model.materials.push(id),
            ElementKind::Texture => self.textures.push(id),
            ElementKind::Sampler => self.samplers.push(id),
            ElementKind::Image => self.images.push(id),
            _ => {}
        }
        self.elements.insert(id, element);
        Ok(())
    }

    /// Reorder the model's materials
    ///
    /// `order` must be a permutation of the current material list; anything
    /// else leaves the order untouched and returns `false`.
    pub fn reorder_materials(&mut self, order: Vec<LocallyUniqueId>) -> bool {
        let mut current = self.model.materials.clone();
        let mut proposed = order.clone();
        current.sort();
        proposed.sort();
        if current != proposed {
            return false;
        }
        self.model.materials = order;
        true
    }

    /// Look up any element
    pub fn get(&self, id: LocallyUniqueId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Kind of the element with `id`, including the model root
    pub fn kind_of(&self, id: LocallyUniqueId) -> Option<ElementKind> {
        if id == self.model.id {
            return Some(ElementKind::Model);
        }
        self.elements.get(&id).map(Element::kind)
    }

    /// Whether `id` names the root or any element
    pub fn contains(&self, id: LocallyUniqueId) -> bool {
        self.kind_of(id).is_some()
    }

    /// Number of elements including the root
    pub fn len(&self) -> usize {
        self.elements.len() + 1
    }

    /// An arena always holds at least the root
    pub fn is_empty(&self) -> bool {
        false
    }

    typed_lookup!(
        /// Look up a material
        material, Material, MaterialRecord
    );
    typed_lookup!(
        /// Look up a PBR block
        pbr_metallic_roughness, PbrMetallicRoughness, PbrRecord
    );
    typed_lookup!(
        /// Look up a texture info
        texture_info, TextureInfo, TextureInfoRecord
    );
    typed_lookup!(
        /// Look up a texture
        texture, Texture, TextureRecord
    );
    typed_lookup!(
        /// Look up a sampler
        sampler, Sampler, SamplerRecord
    );
    typed_lookup!(
        /// Look up an image
        image, Image, ImageRecord
    );

    /// Materials in model order
    pub fn materials(&self) -> impl Iterator<Item = &MaterialRecord> + '_ {
        self.model.materials.iter().filter_map(|id| self.material(*id))
    }

    /// Textures in insertion order
    pub fn textures(&self) -> impl Iterator<Item = &TextureRecord> + '_ {
        self.textures.iter().filter_map(|id| self.texture(*id))
    }

    /// Samplers in insertion order
    pub fn samplers(&self) -> impl Iterator<Item = &SamplerRecord> + '_ {
        self.samplers.iter().filter_map(|id| self.sampler(*id))
    }

    /// Images in insertion order
    pub fn images(&self) -> impl Iterator<Item = &ImageRecord> + '_ {
        self.images.iter().filter_map(|id| self.image(*id))
    }

    /// Resolve which record a mutation on `id` writes
    ///
    /// PBR factors addressed to a Material land on the Material's PBR block.
    pub fn resolve_target(
        &self,
        id: LocallyUniqueId,
        property: Property,
    ) -> Result<LocallyUniqueId, MutationError> {
        match self.elements.get(&id) {
            None if id == self.model.id => Err(MutationError::UnsupportedMutation),
            None => Err(MutationError::UnknownElement),
            Some(Element::Material(material)) if property.is_pbr() => material
                .pbr_metallic_roughness
                .ok_or(MutationError::UnsupportedMutation),
            Some(_) => Ok(id),
        }
    }

    /// Write a validated mutation into the record it targets
    ///
    /// Returns the ID of the record actually written.
    pub fn apply(
        &mut self,
        id: LocallyUniqueId,
        mutation: &Mutation,
    ) -> Result<LocallyUniqueId, MutationError> {
        let target = self.resolve_target(id, mutation.property())?;
        let element = self
            .elements
            .get_mut(&target)
            .ok_or(MutationError::UnknownElement)?;

        match (element, *mutation) {
            (Element::PbrMetallicRoughness(pbr), Mutation::BaseColorFactor(c)) => {
                pbr.base_color_factor = Some(c)
            }
            (Element::PbrMetallicRoughness(pbr), Mutation::MetallicFactor(f)) => {
                pbr.metallic_factor = Some(f)
            }
            (Element::PbrMetallicRoughness(pbr), Mutation::RoughnessFactor(f)) => {
                pbr.roughness_factor = Some(f)
            }
            (Element::Material(m), Mutation::EmissiveFactor(c)) => m.emissive_factor = Some(c),
            (Element::Material(m), Mutation::AlphaMode(mode)) => m.alpha_mode = Some(mode),
            (Element::Material(m), Mutation::AlphaCutoff(cutoff)) => m.alpha_cutoff = Some(cutoff),
            (Element::Material(m), Mutation::DoubleSided(b)) => m.double_sided = Some(b),
            (Element::Sampler(s), Mutation::MinFilter(filter)) => s.min_filter = Some(filter),
            (Element::Sampler(s), Mutation::MagFilter(filter)) => s.mag_filter = Some(filter),
            (Element::Sampler(s), Mutation::WrapS(wrap)) => s.wrap_s = Some(wrap),
            (Element::Sampler(s), Mutation::WrapT(wrap)) => s.wrap_t = Some(wrap),
            _ => return Err(MutationError::UnsupportedMutation),
        }
        Ok(target)
    }

    /// Current value of a mutable property, `None` when unset or not applicable
    pub fn value_of(&self, id: LocallyUniqueId, property: Property) -> Option<Value> {
        let target = self.resolve_target(id, property).ok()?;
        let value: Value = match (self.elements.get(&target)?, property) {
            (Element::PbrMetallicRoughness(pbr), Property::BaseColorFactor) => {
                pbr.base_color().into()
            }
            (Element::PbrMetallicRoughness(pbr), Property::MetallicFactor) => {
                pbr.metallic().into()
            }
            (Element::PbrMetallicRoughness(pbr), Property::RoughnessFactor) => {
                pbr.roughness().into()
            }
            (Element::Material(m), Property::EmissiveFactor) => m.emissive_factor?.into(),
            (Element::Material(m), Property::AlphaMode) => m.alpha_mode?.as_str().into(),
            (Element::Material(m), Property::AlphaCutoff) => m.alpha_cutoff?.into(),
            (Element::Material(m), Property::DoubleSided) => m.double_sided?.into(),
            (Element::Sampler(s), Property::MinFilter) => s.min_filter?.code().into(),
            (Element::Sampler(s), Property::MagFilter) => s.mag_filter?.code().into(),
            (Element::Sampler(s), Property::WrapS) => s.wrap_s?.code().into(),
            (Element::Sampler(s), Property::WrapT) => s.wrap_t?.code().into(),
            _ => return None,
        };
        Some(value)
    }
}
