//! Facade elements
//!
//! Lightweight handles onto a kernel's arena. Reads always see the kernel's
//! current view; writes return a [`MutationTicket`] and only show up in reads
//! once the graft has acknowledged them.

use crate::kernel::ModelKernel;
use crate::ticket::MutationTicket;
use dom3d_core::LocallyUniqueId;
use dom3d_ir::{
    AlphaMode, ElementArena, ElementKind, MagFilter, MinFilter, Mutation, Property, Value,
    WrapMode,
};

/// Common surface of every facade element
pub trait ThreeDomElement {
    /// The element's ID
    fn id(&self) -> LocallyUniqueId;

    /// ID of the model the element belongs to
    fn owner_model_id(&self) -> LocallyUniqueId;

    /// The element's name, if it has one
    fn name(&self) -> Option<String>;

    /// The element's kind
    fn kind(&self) -> ElementKind;

    /// Request a property write
    ///
    /// Properties outside the kind's allow-list and malformed values are
    /// rejected without a message being sent.
    fn mutate(&self, property: &str, value: Value) -> MutationTicket;
}

macro_rules! facade_element {
    (settable $(#[$meta:meta])* $name:ident, $kind:expr) => {
        facade_element!($(#[$meta])* $name, $kind);

        impl $name {
            fn send(&self, mutation: Mutation) -> MutationTicket {
                self.kernel
                    .mutate(self.id, mutation.property().as_str(), mutation.to_value())
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            id: LocallyUniqueId,
            kernel: ModelKernel,
        }

        impl $name {
            pub(crate) fn new(id: LocallyUniqueId, kernel: ModelKernel) -> Self {
                Self { id, kernel }
            }

            fn read<R>(&self, f: impl FnOnce(&ElementArena) -> R) -> R {
                self.kernel.read(f)
            }
        }

        impl ThreeDomElement for $name {
            fn id(&self) -> LocallyUniqueId {
                self.id
            }

            fn owner_model_id(&self) -> LocallyUniqueId {
                self.kernel.read(|arena| arena.owner_model_id())
            }

            fn name(&self) -> Option<String> {
                self.kernel
                    .read(|arena| arena.get(self.id).and_then(|e| e.name()).map(str::to_string))
            }

            fn kind(&self) -> ElementKind {
                $kind
            }

            fn mutate(&self, property: &str, value: Value) -> MutationTicket {
                self.kernel.mutate(self.id, property, value)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }
    };
}

facade_element!(
    /// The model root
    Model, ElementKind::Model
);
facade_element!(
    settable
    /// A material
    Material, ElementKind::Material
);
facade_element!(
    settable
    /// Metallic-roughness parameters of a material
    PbrMetallicRoughness, ElementKind::PbrMetallicRoughness
);
facade_element!(
    /// A material's reference to a texture
    TextureInfo, ElementKind::TextureInfo
);
facade_element!(
    /// A texture
    Texture, ElementKind::Texture
);
facade_element!(
    settable
    /// Texture sampling state
    Sampler, ElementKind::Sampler
);
facade_element!(
    /// Image metadata
    Image, ElementKind::Image
);

impl Model {
    /// Source URI of the model
    pub fn uri(&self) -> String {
        self.read(|arena| arena.model().model_uri.clone())
    }

    /// Materials in model order
    pub fn materials(&self) -> Vec<Material> {
        let ids: Vec<_> = self.read(|arena| arena.materials().map(|m| m.id).collect());
        ids.into_iter().map(|id| Material::new(id, self.kernel.clone())).collect()
    }

    /// Textures, each listed once
    pub fn textures(&self) -> Vec<Texture> {
        let ids: Vec<_> = self.read(|arena| arena.textures().map(|t| t.id).collect());
        ids.into_iter().map(|id| Texture::new(id, self.kernel.clone())).collect()
    }

    /// Samplers, each listed once
    pub fn samplers(&self) -> Vec<Sampler> {
        let ids: Vec<_> = self.read(|arena| arena.samplers().map(|s| s.id).collect());
        ids.into_iter().map(|id| Sampler::new(id, self.kernel.clone())).collect()
    }

    /// Images, each listed once
    pub fn images(&self) -> Vec<Image> {
        let ids: Vec<_> = self.read(|arena| arena.images().map(|i| i.id).collect());
        ids.into_iter().map(|id| Image::new(id, self.kernel.clone())).collect()
    }

    /// Find a material by name
    pub fn material_by_name(&self, name: &str) -> Option<Material> {
        self.materials().into_iter().find(|m| m.name().as_deref() == Some(name))
    }
}

impl Material {
    /// The owned PBR block
    pub fn pbr_metallic_roughness(&self) -> Option<PbrMetallicRoughness> {
        let id = self.read(|arena| arena.material(self.id)?.pbr_metallic_roughness)?;
        Some(PbrMetallicRoughness::new(id, self.kernel.clone()))
    }

    /// Normal map reference
    pub fn normal_texture(&self) -> Option<TextureInfo> {
        let id = self.read(|arena| arena.material(self.id)?.normal_texture)?;
        Some(TextureInfo::new(id, self.kernel.clone()))
    }

    /// Occlusion map reference
    pub fn occlusion_texture(&self) -> Option<TextureInfo> {
        let id = self.read(|arena| arena.material(self.id)?.occlusion_texture)?;
        Some(TextureInfo::new(id, self.kernel.clone()))
    }

    /// Emissive map reference
    pub fn emissive_texture(&self) -> Option<TextureInfo> {
        let id = self.read(|arena| arena.material(self.id)?.emissive_texture)?;
        Some(TextureInfo::new(id, self.kernel.clone()))
    }

    pub fn emissive_factor(&self) -> Option<[f32; 3]> {
        self.read(|arena| arena.material(self.id)?.emissive_factor)
    }

    pub fn alpha_mode(&self) -> Option<AlphaMode> {
        self.read(|arena| arena.material(self.id)?.alpha_mode)
    }

    pub fn alpha_cutoff(&self) -> Option<f32> {
        self.read(|arena| arena.material(self.id)?.alpha_cutoff)
    }

    pub fn double_sided(&self) -> Option<bool> {
        self.read(|arena| arena.material(self.id)?.double_sided)
    }

    /// Current value of any material property, PBR factors included
    pub fn get(&self, property: Property) -> Option<Value> {
        self.read(|arena| arena.value_of(self.id, property))
    }

    /// Routed to the owned PBR block
    pub fn set_base_color_factor(&self, color: [f32; 4]) -> MutationTicket {
        self.send(Mutation::BaseColorFactor(color))
    }

    /// Routed to the owned PBR block
    pub fn set_metallic_factor(&self, factor: f32) -> MutationTicket {
        self.send(Mutation::MetallicFactor(factor))
    }

    /// Routed to the owned PBR block
    pub fn set_roughness_factor(&self, factor: f32) -> MutationTicket {
        self.send(Mutation::RoughnessFactor(factor))
    }

    pub fn set_emissive_factor(&self, color: [f32; 3]) -> MutationTicket {
        self.send(Mutation::EmissiveFactor(color))
    }

    pub fn set_alpha_mode(&self, mode: AlphaMode) -> MutationTicket {
        self.send(Mutation::AlphaMode(mode))
    }

    pub fn set_alpha_cutoff(&self, cutoff: f32) -> MutationTicket {
        self.send(Mutation::AlphaCutoff(cutoff))
    }

    pub fn set_double_sided(&self, double_sided: bool) -> MutationTicket {
        self.send(Mutation::DoubleSided(double_sided))
    }
}

impl PbrMetallicRoughness {
    pub fn base_color_factor(&self) -> Option<[f32; 4]> {
        self.read(|arena| Some(arena.pbr_metallic_roughness(self.id)?.base_color()))
    }

    pub fn metallic_factor(&self) -> Option<f32> {
        self.read(|arena| Some(arena.pbr_metallic_roughness(self.id)?.metallic()))
    }

    pub fn roughness_factor(&self) -> Option<f32> {
        self.read(|arena| Some(arena.pbr_metallic_roughness(self.id)?.roughness()))
    }

    /// Base color map reference
    pub fn base_color_texture(&self) -> Option<TextureInfo> {
        let id = self.read(|arena| arena.pbr_metallic_roughness(self.id)?.base_color_texture)?;
        Some(TextureInfo::new(id, self.kernel.clone()))
    }

    /// Metallic-roughness map reference
    pub fn metallic_roughness_texture(&self) -> Option<TextureInfo> {
        let id =
            self.read(|arena| arena.pbr_metallic_roughness(self.id)?.metallic_roughness_texture)?;
        Some(TextureInfo::new(id, self.kernel.clone()))
    }

    pub fn set_base_color_factor(&self, color: [f32; 4]) -> MutationTicket {
        self.send(Mutation::BaseColorFactor(color))
    }

    pub fn set_metallic_factor(&self, factor: f32) -> MutationTicket {
        self.send(Mutation::MetallicFactor(factor))
    }

    pub fn set_roughness_factor(&self, factor: f32) -> MutationTicket {
        self.send(Mutation::RoughnessFactor(factor))
    }
}

impl TextureInfo {
    /// The referenced texture
    pub fn texture(&self) -> Option<Texture> {
        let id = self.read(|arena| arena.texture_info(self.id)?.texture)?;
        Some(Texture::new(id, self.kernel.clone()))
    }

    pub fn tex_coord(&self) -> Option<u32> {
        self.read(|arena| arena.texture_info(self.id)?.tex_coord)
    }

    /// Normal map scale
    pub fn scale(&self) -> Option<f32> {
        self.read(|arena| arena.texture_info(self.id)?.scale)
    }

    /// Occlusion strength
    pub fn strength(&self) -> Option<f32> {
        self.read(|arena| arena.texture_info(self.id)?.strength)
    }
}

impl Texture {
    pub fn sampler(&self) -> Option<Sampler> {
        let id = self.read(|arena| arena.texture(self.id)?.sampler)?;
        Some(Sampler::new(id, self.kernel.clone()))
    }

    pub fn source(&self) -> Option<Image> {
        let id = self.read(|arena| arena.texture(self.id)?.source)?;
        Some(Image::new(id, self.kernel.clone()))
    }
}

impl Sampler {
    pub fn mag_filter(&self) -> Option<MagFilter> {
        self.read(|arena| arena.sampler(self.id)?.mag_filter)
    }

    pub fn min_filter(&self) -> Option<MinFilter> {
        self.read(|arena| arena.sampler(self.id)?.min_filter)
    }

    pub fn wrap_s(&self) -> Option<WrapMode> {
        self.read(|arena| arena.sampler(self.id)?.wrap_s)
    }

    pub fn wrap_t(&self) -> Option<WrapMode> {
        self.read(|arena| arena.sampler(self.id)?.wrap_t)
    }

    pub fn set_mag_filter(&self, filter: MagFilter) -> MutationTicket {
        self.send(Mutation::MagFilter(filter))
    }

    pub fn set_min_filter(&self, filter: MinFilter) -> MutationTicket {
        self.send(Mutation::MinFilter(filter))
    }

    pub fn set_wrap_s(&self, wrap: WrapMode) -> MutationTicket {
        self.send(Mutation::WrapS(wrap))
    }

    pub fn set_wrap_t(&self, wrap: WrapMode) -> MutationTicket {
        self.send(Mutation::WrapT(wrap))
    }
}

impl Image {
    pub fn uri(&self) -> Option<String> {
        self.read(|arena| arena.image(self.id)?.uri.clone())
    }

    pub fn mime_type(&self) -> Option<String> {
        self.read(|arena| arena.image(self.id)?.mime_type.clone())
    }
}
