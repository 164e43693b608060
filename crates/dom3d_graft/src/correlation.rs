//! Correlated scene graph
//!
//! Collapses the renderer's native objects into logical elements. One pass
//! over the native material objects, first-seen-wins: the first object that
//! wraps a material definition allocates IDs for the Material, its PBR block
//! and its texture infos; every later object wrapping the same definition
//! joins the existing groups. Textures, samplers and images are deduplicated
//! by definition index the same way.
//!
//! The result is an [`ElementArena`] holding one record per logical element
//! plus a [`CorrelatedGroup`] per ID listing the native objects a mutation on
//! that ID must reach.

use crate::native::{NativeHandle, NativeMaterial, NativeScene, TextureSlot};
use dom3d_core::{IdAllocator, LocallyUniqueId};
use dom3d_ir::{
    Element, ElementArena, ElementKind, ImageRecord, MaterialRecord, PbrRecord, SamplerRecord,
    TextureInfoRecord, TextureRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order of materials in the model's material list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialOrder {
    /// Order in which traversal first met each material
    FirstSeen,
    /// Canonical document order, by material definition index
    #[default]
    Definition,
}

/// The native objects behind one logical element
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedGroup {
    pub id: LocallyUniqueId,
    pub kind: ElementKind,
    pub members: Vec<NativeHandle>,
}

impl CorrelatedGroup {
    fn new(id: LocallyUniqueId, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            members: Vec::new(),
        }
    }

    /// Number of native objects in the group
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no native objects
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Logical element graph with its routing index
#[derive(Debug, Clone)]
pub struct CorrelatedSceneGraph {
    arena: ElementArena,
    groups: HashMap<LocallyUniqueId, CorrelatedGroup>,
    by_handle: HashMap<(ElementKind, NativeHandle), LocallyUniqueId>,
}

impl CorrelatedSceneGraph {
    /// Correlate every native object reachable from `scene`
    ///
    /// Missing texture, sampler or image definitions correlate to `None`;
    /// traversal always completes.
    pub fn build(
        scene: &dyn NativeScene,
        allocator: &IdAllocator,
        model_uri: &str,
        order: MaterialOrder,
    ) -> Self {
        let mut builder = Builder {
            scene,
            allocator,
            arena: ElementArena::new(allocator.next_id(), model_uri),
            groups: HashMap::new(),
            by_handle: HashMap::new(),
            materials: HashMap::new(),
            discovered: Vec::new(),
            infos: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            images: HashMap::new(),
        };
        scene.for_each_material_user(&mut |material| builder.visit(material));

        let Builder {
            mut arena,
            groups,
            by_handle,
            mut discovered,
            ..
        } = builder;

        if order == MaterialOrder::Definition {
            discovered.sort_by_key(|(definition, _)| *definition);
            arena.reorder_materials(discovered.iter().map(|(_, id)| *id).collect());
        }

        log::debug!(
            "Correlated {} elements into {} groups ({} native bindings)",
            arena.len(),
            groups.len(),
            by_handle.len()
        );

        Self {
            arena,
            groups,
            by_handle,
        }
    }

    /// The native objects behind `id`
    pub fn group(&self, id: LocallyUniqueId) -> Option<&CorrelatedGroup> {
        self.groups.get(&id)
    }

    /// ID of the `kind` group containing native object `handle`
    pub fn group_of(&self, kind: ElementKind, handle: NativeHandle) -> Option<LocallyUniqueId> {
        self.by_handle.get(&(kind, handle)).copied()
    }

    /// Kind of the element with `id`
    pub fn kind_of(&self, id: LocallyUniqueId) -> Option<ElementKind> {
        self.arena.kind_of(id)
    }

    /// Material records in model order
    pub fn materials(&self) -> impl Iterator<Item = &MaterialRecord> + '_ {
        self.arena.materials()
    }

    /// Logical elements
    pub fn arena(&self) -> &ElementArena {
        &self.arena
    }

    /// Logical elements, mutable
    pub fn arena_mut(&mut self) -> &mut ElementArena {
        &mut self.arena
    }

    /// ID of the model root
    pub fn model_id(&self) -> LocallyUniqueId {
        self.arena.owner_model_id()
    }

    /// Number of logical elements including the model root
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// A graph always holds at least the model root
    pub fn is_empty(&self) -> bool {
        false
    }
}

struct Builder<'a> {
    scene: &'a dyn NativeScene,
    allocator: &'a IdAllocator,
    arena: ElementArena,
    groups: HashMap<LocallyUniqueId, CorrelatedGroup>,
    by_handle: HashMap<(ElementKind, NativeHandle), LocallyUniqueId>,
    /// Material definition index -> (material ID, PBR ID)
    materials: HashMap<usize, (LocallyUniqueId, LocallyUniqueId)>,
    discovered: Vec<(usize, LocallyUniqueId)>,
    infos: HashMap<(usize, TextureSlot), LocallyUniqueId>,
    textures: HashMap<usize, Option<LocallyUniqueId>>,
    samplers: HashMap<usize, Option<LocallyUniqueId>>,
    images: HashMap<usize, Option<LocallyUniqueId>>,
}

impl Builder<'_> {
    fn visit(&mut self, material: &NativeMaterial) {
        let scene = self.scene;
        let definition = material.definition;
        let (material_id, pbr_id, first_seen) = match self.materials.get(&definition) {
            Some(&(material_id, pbr_id)) => (material_id, pbr_id, false),
            None => {
                let material_id = self.allocator.next_id();
                let pbr_id = self.allocator.next_id();
                self.materials.insert(definition, (material_id, pbr_id));
                self.discovered.push((definition, material_id));
                (material_id, pbr_id, true)
            }
        };
        self.join(material_id, ElementKind::Material, material.handle);
        self.join(pbr_id, ElementKind::PbrMetallicRoughness, material.handle);

        let mut record = MaterialRecord {
            id: material_id,
            name: material.name.clone(),
            pbr_metallic_roughness: Some(pbr_id),
            emissive_factor: material.params.emissive_factor,
            alpha_mode: material.params.alpha_mode,
            alpha_cutoff: material.params.alpha_cutoff,
            double_sided: material.params.double_sided,
            ..Default::default()
        };
        let mut pbr = PbrRecord {
            base_color_factor: Some(material.params.base_color_factor),
            metallic_factor: Some(material.params.metallic_factor),
            roughness_factor: Some(material.params.roughness_factor),
            ..PbrRecord::new(pbr_id)
        };

        for slot in &material.textures {
            let key = (definition, slot.binding.slot);
            let info_id = match self.infos.get(&key) {
                Some(&id) => id,
                None if first_seen => {
                    let id = self.allocator.next_id();
                    self.infos.insert(key, id);
                    let texture = self.texture(slot.binding.texture);
                    self.insert(Element::TextureInfo(TextureInfoRecord {
                        id,
                        texture,
                        tex_coord: slot.binding.tex_coord,
                        scale: slot.binding.scale,
                        strength: slot.binding.strength,
                    }));
                    id
                }
                None => {
                    log::debug!(
                        "{} has a {:?} slot its first user lacked; skipping",
                        slot.handle,
                        slot.binding.slot
                    );
                    continue;
                }
            };
            self.join(info_id, ElementKind::TextureInfo, slot.handle);

            let link = Some(info_id);
            match slot.binding.slot {
                TextureSlot::BaseColor => pbr.base_color_texture = link,
                TextureSlot::MetallicRoughness => pbr.metallic_roughness_texture = link,
                TextureSlot::Normal => record.normal_texture = link,
                TextureSlot::Occlusion => record.occlusion_texture = link,
                TextureSlot::Emissive => record.emissive_texture = link,
            }

            let Some(texture_id) = self.texture(slot.binding.texture) else {
                continue;
            };
            self.join(texture_id, ElementKind::Texture, slot.handle);
            if let Some(def) = scene.resolve_texture_ref(slot.binding.texture) {
                if let Some(sampler_id) = def.sampler.and_then(|s| self.sampler(s)) {
                    self.join(sampler_id, ElementKind::Sampler, slot.handle);
                }
                if let Some(image_id) = def.source.and_then(|i| self.image(i)) {
                    self.join(image_id, ElementKind::Image, slot.handle);
                }
            }
        }

        if first_seen {
            self.insert(Element::Material(record));
            self.insert(Element::PbrMetallicRoughness(pbr));
        }
    }

    fn texture(&mut self, index: usize) -> Option<LocallyUniqueId> {
        if let Some(&id) = self.textures.get(&index) {
            return id;
        }
        let scene = self.scene;
        let id = match scene.resolve_texture_ref(index) {
            Some(def) => {
                let id = self.allocator.next_id();
                let sampler = def.sampler.and_then(|s| self.sampler(s));
                let source = def.source.and_then(|i| self.image(i));
                self.insert(Element::Texture(TextureRecord {
                    id,
                    name: def.name.clone(),
                    sampler,
                    source,
                }));
                Some(id)
            }
            None => {
                log::debug!("Texture {} is not defined; correlating to none", index);
                None
            }
        };
        self.textures.insert(index, id);
        id
    }

    fn sampler(&mut self, index: usize) -> Option<LocallyUniqueId> {
        if let Some(&id) = self.samplers.get(&index) {
            return id;
        }
        let scene = self.scene;
        let id = match scene.resolve_sampler_ref(index) {
            Some(def) => {
                let id = self.allocator.next_id();
                self.insert(Element::Sampler(SamplerRecord {
                    id,
                    name: def.name.clone(),
                    mag_filter: def.params.mag_filter,
                    min_filter: def.params.min_filter,
                    wrap_s: def.params.wrap_s,
                    wrap_t: def.params.wrap_t,
                }));
                Some(id)
            }
            None => {
                log::debug!("Sampler {} is not defined; correlating to none", index);
                None
            }
        };
        self.samplers.insert(index, id);
        id
    }

    fn image(&mut self, index: usize) -> Option<LocallyUniqueId> {
        if let Some(&id) = self.images.get(&index) {
            return id;
        }
        let scene = self.scene;
        let id = match scene.resolve_image_ref(index) {
            Some(def) => {
                let id = self.allocator.next_id();
                self.insert(Element::Image(ImageRecord {
                    id,
                    name: def.name.clone(),
                    uri: def.uri.clone(),
                    mime_type: def.mime_type.clone(),
                }));
                Some(id)
            }
            None => {
                log::debug!("Image {} is not defined; correlating to none", index);
                None
            }
        };
        self.images.insert(index, id);
        id
    }

    fn join(&mut self, id: LocallyUniqueId, kind: ElementKind, handle: NativeHandle) {
        let group = self
            .groups
            .entry(id)
            .or_insert_with(|| CorrelatedGroup::new(id, kind));
        if self.by_handle.insert((kind, handle), id).is_none() {
            group.members.push(handle);
        }
    }

    fn insert(&mut self, element: Element) {
        // IDs come straight from the allocator, so a clash means a broken allocator
        if let Err(e) = self.arena.insert(element) {
            log::error!("Correlation produced an invalid arena: {}", e);
        }
    }
}
