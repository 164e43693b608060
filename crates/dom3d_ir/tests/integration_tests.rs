//! Integration tests for dom3d_ir crate
//!
//! Exercises the arena, codec and wire vocabulary together the way a kernel
//! uses them: decode a snapshot, validate a request, apply the echo.

use dom3d_ir::*;

const SNAPSHOT: &str = r#"{
    "id": 0,
    "modelUri": "scene.glb",
    "materials": [
        {
            "id": 1,
            "name": "Body",
            "pbrMetallicRoughness": {
                "id": 2,
                "baseColorFactor": [0, 0, 0, 1],
                "metallicFactor": 0,
                "roughnessFactor": 0,
                "baseColorTexture": { "id": 3, "texture": 5, "texCoord": 0 }
            },
            "alphaMode": "OPAQUE"
        },
        { "id": 4, "name": "Glass", "doubleSided": true }
    ],
    "textures": [{ "id": 5, "sampler": 6, "source": 7 }],
    "samplers": [{ "id": 6, "magFilter": 9729, "wrapS": 10497, "wrapT": 10497 }],
    "images": [{ "id": 7, "uri": "albedo.png", "mimeType": "image/png" }]
}"#;

fn id(raw: u64) -> LocallyUniqueId {
    LocallyUniqueId::from_raw(raw)
}

#[test]
fn test_snapshot_exposes_every_element() {
    let arena = codec::decode(SNAPSHOT).expect("Failed to decode");

    assert_eq!(arena.len(), 8);
    assert_eq!(arena.kind_of(id(0)), Some(ElementKind::Model));
    assert_eq!(arena.kind_of(id(1)), Some(ElementKind::Material));
    assert_eq!(arena.kind_of(id(2)), Some(ElementKind::PbrMetallicRoughness));
    assert_eq!(arena.kind_of(id(3)), Some(ElementKind::TextureInfo));
    assert_eq!(arena.kind_of(id(5)), Some(ElementKind::Texture));
    assert_eq!(arena.kind_of(id(6)), Some(ElementKind::Sampler));
    assert_eq!(arena.kind_of(id(7)), Some(ElementKind::Image));

    let names: Vec<_> = arena.materials().map(|m| m.name.clone()).collect();
    assert_eq!(names, vec![Some("Body".to_string()), Some("Glass".to_string())]);
}

#[test]
fn test_request_validated_then_applied() {
    let mut arena = codec::decode(SNAPSHOT).unwrap();

    // A kernel validates before sending ...
    let request = MutationRequest {
        request_id: RequestId::new(1),
        id: id(6),
        property: "minFilter".into(),
        value: Value::from(9987),
    };
    let kind = arena.kind_of(request.id).unwrap();
    let mutation = Mutation::parse(kind, &request.property, &request.value).unwrap();

    // ... and commits once the graft acknowledges
    arena.apply(request.id, &mutation).unwrap();
    assert_eq!(arena.sampler(id(6)).unwrap().min_filter, Some(MinFilter::LinearMipmapLinear));

    let reserialized = codec::serialize(&arena);
    assert_eq!(reserialized.samplers[0].min_filter, Some(MinFilter::LinearMipmapLinear));
}

#[test]
fn test_notification_applies_to_decoded_arena() {
    let mut arena = codec::decode(SNAPSHOT).unwrap();
    let frame = WireMessage::from(ChangeNotification::new(
        id(2),
        &Mutation::BaseColorFactor([1.0, 0.0, 0.0, 1.0]),
    ))
    .to_json()
    .unwrap();

    let WireMessage::ChangeNotification(note) = WireMessage::from_json(&frame).unwrap() else {
        panic!("expected a notification");
    };
    arena.apply(note.id, &note.mutation().unwrap()).unwrap();

    assert_eq!(
        arena.value_of(id(1), Property::BaseColorFactor),
        Some(Value::from([1.0f32, 0.0, 0.0, 1.0]))
    );
}

#[test]
fn test_channel_carries_requests_and_responses() {
    let (kernel_end, graft_end) = Endpoint::pair();

    kernel_end
        .send(
            &MutationRequest {
                request_id: RequestId::new(7),
                id: id(1),
                property: "doubleSided".into(),
                value: Value::from(true),
            }
            .into(),
        )
        .unwrap();

    let Some(WireMessage::MutationRequest(request)) = graft_end.try_recv().unwrap() else {
        panic!("expected a request");
    };
    graft_end
        .send(&MutationResponse::failure(request.request_id, MutationError::UnknownElement).into())
        .unwrap();

    let Some(WireMessage::MutationResponse(response)) = kernel_end.try_recv().unwrap() else {
        panic!("expected a response");
    };
    assert_eq!(response.request_id, RequestId::new(7));
    assert_eq!(response.into_result(), Err(MutationError::UnknownElement));
}

#[test]
fn test_snapshot_rejects_texture_pointing_at_sampler_id() {
    // Texture 5 names 7 as its sampler, but 7 is an image
    let json = SNAPSHOT.replace(r#""sampler": 6"#, r#""sampler": 7"#);
    assert!(matches!(
        codec::decode(&json),
        Err(CodecError::DanglingReference { expected: "Sampler", .. })
    ));
}
