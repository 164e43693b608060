//! End-to-end tests: graft and kernels connected over real endpoints
//!
//! Both sides are stepped by hand, so every exchange is deterministic.

use dom3d_graft::{
    GraftConfig, MaterialDef, MaterialParams, MemoryScene, ModelGraft, SamplerDef, SamplerParams,
    TextureBinding, TextureDef, TextureSlot,
};
use dom3d_ir::{codec, Endpoint, MagFilter, MutationError, Property, Value, WrapMode};
use dom3d_kernel::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scenario_scene(users: usize) -> MemoryScene {
    let mut scene = MemoryScene::new();
    let def = scene.add_material(MaterialDef {
        name: None,
        params: MaterialParams {
            base_color_factor: [0.0, 0.0, 0.0, 1.0],
            metallic_factor: 0.0,
            roughness_factor: 0.0,
            ..Default::default()
        },
        textures: Vec::new(),
    });
    for _ in 0..users {
        scene.instantiate(def);
    }
    scene
}

fn connect(graft: &mut ModelGraft<MemoryScene>) -> ModelKernel {
    let (kernel_end, graft_end) = Endpoint::pair();
    graft.attach(graft_end);
    ModelKernel::new(kernel_end, graft.snapshot()).unwrap()
}

/// Step both sides until the graft has nothing left to do
fn settle(graft: &mut ModelGraft<MemoryScene>, kernels: &[&ModelKernel]) {
    loop {
        let handled = graft.pump();
        for kernel in kernels {
            kernel.pump();
        }
        if handled == 0 {
            break;
        }
    }
}

#[test]
fn test_scenario_metallic_factor_on_material() {
    init_logging();
    let mut graft = ModelGraft::new(scenario_scene(1), "", GraftConfig::default());
    let kernel = connect(&mut graft);

    let model = kernel.model();
    assert_eq!(model.id().raw(), 0);
    let material = model.materials().remove(0);
    assert_eq!(material.id().raw(), 1);
    let pbr = material.pbr_metallic_roughness().unwrap();
    assert_eq!(pbr.id().raw(), 2);
    assert_eq!(pbr.base_color_factor(), Some([0.0, 0.0, 0.0, 1.0]));

    let ticket = material.mutate("metallicFactor", Value::from(0.5));
    settle(&mut graft, &[&kernel]);

    assert_eq!(ticket.try_result(), Some(Ok(())));
    assert_eq!(pbr.metallic_factor(), Some(0.5));
    assert_eq!(graft.scene().objects()[0].params.metallic_factor, 0.5);
    assert_eq!(kernel.snapshot(), graft.snapshot());
}

#[test]
fn test_unknown_property_never_reaches_graft() {
    let mut graft = ModelGraft::new(scenario_scene(1), "", GraftConfig::default());
    let kernel = connect(&mut graft);
    let material = kernel.model().materials().remove(0);

    let ticket = material.mutate("nonExistentProp", Value::from(1));
    assert_eq!(ticket.try_result(), Some(Err(MutationError::UnsupportedMutation)));
    assert_eq!(graft.pump(), 0);
}

#[test]
fn test_fan_out_and_partial_application() {
    init_logging();
    let mut graft = ModelGraft::new(scenario_scene(4), "", GraftConfig::default());
    let kernel = connect(&mut graft);
    let material = kernel.model().materials().remove(0);

    let ticket = material.set_base_color_factor([1.0, 0.0, 0.0, 1.0]);
    settle(&mut graft, &[&kernel]);
    assert_eq!(ticket.try_result(), Some(Ok(())));
    for object in graft.scene().objects() {
        assert_eq!(object.params.base_color_factor, [1.0, 0.0, 0.0, 1.0]);
    }

    let victim = graft.scene().objects()[3].handle;
    graft.scene_mut().fail_on(victim);
    let ticket = material.set_double_sided(true);
    settle(&mut graft, &[&kernel]);

    assert_eq!(ticket.try_result(), Some(Err(MutationError::PartialApplication)));
    assert_eq!(material.double_sided(), None);
    assert_eq!(graft.scene().objects()[0].params.double_sided, Some(true));
    assert_eq!(graft.scene().objects()[3].params.double_sided, None);
}

#[test]
fn test_changes_propagate_to_other_kernels() {
    let mut graft = ModelGraft::new(scenario_scene(1), "", GraftConfig::default());
    let writer = connect(&mut graft);
    let observer = connect(&mut graft);

    let changes = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = changes.clone();
    observer.subscribe(move |n| sink.lock().push(n.property));

    let ticket = writer.model().materials()[0].set_alpha_mode(dom3d_ir::AlphaMode::Blend);
    settle(&mut graft, &[&writer, &observer]);

    assert_eq!(ticket.try_result(), Some(Ok(())));
    let seen = observer.model().materials()[0].alpha_mode();
    assert_eq!(seen, Some(dom3d_ir::AlphaMode::Blend));
    assert_eq!(*changes.lock(), vec![Property::AlphaMode]);
}

#[test]
fn test_renderer_side_edits_reach_kernels() {
    let mut graft = ModelGraft::new(scenario_scene(2), "", GraftConfig::default());
    let kernel = connect(&mut graft);

    let id = graft.model().materials().next().unwrap().id;
    graft.mutate(id, "emissiveFactor", &Value::from([1.0f32, 0.5, 0.0])).unwrap();
    kernel.pump();

    assert_eq!(kernel.model().materials()[0].emissive_factor(), Some([1.0, 0.5, 0.0]));
}

#[test]
fn test_sampler_mutation_fans_out_to_texture_objects() {
    let mut scene = MemoryScene::new();
    let sampler = scene.add_sampler(SamplerDef {
        name: Some("linear".into()),
        params: SamplerParams {
            mag_filter: Some(MagFilter::Linear),
            ..Default::default()
        },
    });
    let texture = scene.add_texture(TextureDef {
        name: None,
        sampler: Some(sampler),
        source: None,
    });
    let def = scene.add_material(MaterialDef {
        textures: vec![TextureBinding::new(TextureSlot::BaseColor, texture)],
        ..Default::default()
    });
    scene.instantiate(def);
    scene.instantiate(def);

    let mut graft = ModelGraft::new(scene, "", GraftConfig::default());
    let kernel = connect(&mut graft);

    let sampler = kernel.model().samplers().remove(0);
    assert_eq!(sampler.name().as_deref(), Some("linear"));
    let via_material = kernel.model().materials()[0]
        .pbr_metallic_roughness()
        .and_then(|pbr| pbr.base_color_texture())
        .and_then(|info| info.texture())
        .and_then(|texture| texture.sampler())
        .unwrap();
    assert_eq!(via_material, sampler);

    let ticket = sampler.set_wrap_s(WrapMode::MirroredRepeat);
    settle(&mut graft, &[&kernel]);
    assert_eq!(ticket.try_result(), Some(Ok(())));
    assert_eq!(sampler.wrap_s(), Some(WrapMode::MirroredRepeat));
    for object in graft.scene().objects() {
        assert_eq!(object.textures[0].sampling.wrap_s, Some(WrapMode::MirroredRepeat));
    }

    // Samplers only take sampler properties
    let ticket = sampler.mutate("metallicFactor", Value::from(0.5));
    assert_eq!(ticket.try_result(), Some(Err(MutationError::UnsupportedMutation)));
}

#[test]
fn test_materials_found_by_name() {
    let mut scene = MemoryScene::new();
    for name in ["body", "glass"] {
        let def = scene.add_material(MaterialDef {
            name: Some(name.into()),
            ..Default::default()
        });
        scene.instantiate(def);
    }
    let mut graft = ModelGraft::new(scene, "", GraftConfig::default());
    let kernel = connect(&mut graft);
    let model = kernel.model();

    let glass = model.material_by_name("glass").unwrap();
    assert_eq!(glass, model.materials()[1]);
    assert_eq!(glass.owner_model_id(), model.id());
    assert!(model.material_by_name("chrome").is_none());
}

#[test]
fn test_teardown() {
    init_logging();
    let mut graft = ModelGraft::new(scenario_scene(1), "", GraftConfig::default());
    let kernel = connect(&mut graft);
    let material = kernel.model().materials().remove(0);

    let in_flight = material.set_double_sided(true);
    kernel.deactivate();
    assert_eq!(in_flight.try_result(), Some(Err(MutationError::Deactivated)));
    assert_eq!(
        material.set_double_sided(false).try_result(),
        Some(Err(MutationError::Deactivated))
    );

    // The graft still applies what was already sent, then drops the endpoint
    graft.pump();
    assert_eq!(graft.endpoint_count(), 0);
}

#[test]
fn test_graft_deactivation_settles_kernel_tickets() {
    let mut graft = ModelGraft::new(scenario_scene(1), "", GraftConfig::default());
    let kernel = connect(&mut graft);
    let material = kernel.model().materials().remove(0);

    let queued = material.set_double_sided(true);
    graft.deactivate();
    kernel.pump();

    assert_eq!(queued.try_result(), Some(Err(MutationError::Deactivated)));
    assert!(!kernel.is_connected());
    assert_eq!(
        material.set_double_sided(false).try_result(),
        Some(Err(MutationError::ChannelClosed))
    );
}

#[test]
fn test_rebuild_strands_old_kernels() {
    let mut graft = ModelGraft::new(scenario_scene(1), "", GraftConfig::default());
    let stale = connect(&mut graft);

    let snapshot = graft.rebuild();
    let fresh = connect(&mut graft);
    assert_eq!(fresh.snapshot(), snapshot);

    let old_ticket = stale.model().materials()[0].set_double_sided(true);
    let new_ticket = fresh.model().materials()[0].set_double_sided(true);
    settle(&mut graft, &[&stale, &fresh]);

    assert_eq!(old_ticket.try_result(), Some(Err(MutationError::UnknownElement)));
    assert_eq!(new_ticket.try_result(), Some(Ok(())));
}

#[test]
fn test_snapshot_json_round_trip_through_kernel() {
    let graft = ModelGraft::new(scenario_scene(2), "scene.glb", GraftConfig::default());
    let json = codec::to_json(&graft.snapshot()).unwrap();

    let (kernel_end, _graft_end) = Endpoint::pair();
    let kernel = ModelKernel::from_json(kernel_end, &json).unwrap();
    assert_eq!(kernel.model().uri(), "scene.glb");
    assert_eq!(codec::to_json(&kernel.snapshot()).unwrap(), json);
}
