//! Scene Integration Tests
//!
//! Decoding real viewer URLs, round trips and combine/merge laws through
//! the public API.

mod common;

use ngscenes::{decode, Layer, LayerKind, Scene};
use pretty_assertions::assert_eq;
use serde_json::json;

/// A public FAFB scene as shared by the viewer, with unescaped `#` inside
/// shader strings.
const FAFB_URL: &str = include_str!("fixtures/fafb_url.txt");

fn fafb() -> Scene {
    common::init_tracing();
    decode(FAFB_URL.trim()).expect("fixture URL decodes")
}

// === Decoding ===

#[test]
fn test_decode_fafb_url() {
    let scene = fafb();
    assert_eq!(scene.len(), 8);
    assert_eq!(
        scene.base_url(),
        Some("https://fafb-dot-neuroglancer-demo.appspot.com/")
    );

    let summary = scene.summary();
    assert_eq!(summary.image, 3);
    assert_eq!(summary.segmentation, 3);
    assert_eq!(summary.annotation, 1);
    assert_eq!(summary.mesh, 1);

    assert_eq!(scene.setting("layout"), Some(&json!("xy-3d")));
    assert_eq!(
        scene.setting("selectedLayer"),
        Some(&json!({"layer": "fafb-ffn1-20200412", "visible": true}))
    );
}

#[test]
fn test_decode_object_source() {
    let scene = fafb();
    let segmentation = scene.layer("fafb-ffn1-20200412").unwrap();
    assert_eq!(segmentation.kind(), LayerKind::Segmentation);
    assert_eq!(
        segmentation.source_url(),
        "precomputed://gs://fafb-ffn1-20200412/segmentation"
    );
    assert_eq!(segmentation.source()["subsources"]["mesh"], json!(true));
    assert_eq!(segmentation.segments().unwrap(), vec!["710435991"]);
}

#[test]
fn test_decode_keeps_hashes_inside_fragment() {
    let scene = fafb();
    let synapses = scene.layer("synapses_buhmann2019").unwrap();
    assert_eq!(synapses.get("annotationColor"), Some(&json!("#cecd11")));
    let shader: String = synapses.get_as("shader").unwrap();
    assert!(shader.starts_with("#uicontrol vec3 preColor"));

    let regions = scene.layer("neuropil-regions-surface").unwrap();
    assert!(regions.source_url().ends_with("mesh#type=mesh"));
    assert_eq!(regions.segments().unwrap().len(), 75);
}

#[test]
fn test_decode_rejects_bad_input() {
    for input in [
        "https://fafb-dot-neuroglancer-demo.appspot.com/",
        "https://fafb-dot-neuroglancer-demo.appspot.com/#!%7Bbroken",
        "{\"layers\": [{\"type\": \"image\"}]}",
        "",
    ] {
        let err = decode(input).unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR", "input: {:?}", input);
    }
}

// === Round trips ===

#[test]
fn test_fafb_json_round_trip() {
    let scene = fafb();
    let decoded = decode(scene.to_json(false).unwrap()).unwrap();
    assert_eq!(decoded.layers(), scene.layers());
    assert_eq!(decoded.settings(), scene.settings());
    assert_eq!(decoded.base_url(), None);
}

#[test]
fn test_json_round_trip_keeps_removed_defaults_removed() {
    let mut image = Layer::image("precomputed://gs://bucket/em");
    image.remove("blend").unwrap();
    let mut segmentation = Layer::segmentation("precomputed://gs://bucket/seg");
    segmentation.remove("segments").unwrap();
    let scene = Scene::from_layers([image, segmentation]);

    let decoded = decode(scene.to_json(false).unwrap()).unwrap();
    assert_eq!(decoded.layer(0).unwrap().get("blend"), None);
    assert_eq!(decoded, scene);
}

#[test]
fn test_fafb_url_round_trip() {
    let scene = fafb();
    assert_eq!(decode(scene.to_url().unwrap()).unwrap(), scene);
}

#[test]
fn test_end_to_end_round_trip_and_merge() -> anyhow::Result<()> {
    let mut scene = Scene::new();
    scene.add_layers([
        Layer::image("precomputed://gs://bucket/a"),
        Layer::segmentation("precomputed://gs://bucket/b").with_segments([1]),
    ]);

    let decoded = decode(scene.to_json(false)?)?;
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.layer(1)?.segments()?, vec!["1"]);

    let other = Scene::from_layers([
        Layer::segmentation("precomputed://gs://bucket/b").with_segments([2])
    ]);
    let merged = decoded.merge_with(&other);
    assert_eq!(merged.len(), 2);

    let mut segments = merged.layer(1)?.segments()?;
    segments.sort();
    assert_eq!(segments, vec!["1", "2"]);
    Ok(())
}

// === Combination laws ===

#[test]
fn test_combine_length() {
    let a = fafb();
    let b = Scene::from_layers([Layer::mesh("vtk://x/surface.vtk.gz")]);
    assert_eq!((&a + &a).len(), 2 * a.len());
    assert_eq!((&a + &b).len(), a.len() + b.len());
    assert_eq!((&b + &a).layer(0).unwrap().kind(), LayerKind::Mesh);
}

#[test]
fn test_merge_with_itself_collapses_everything() {
    let a = fafb();
    let merged = &a | &a;
    assert_eq!(merged.len(), a.len());
    assert_eq!(merged.layers(), a.layers());
}

#[test]
fn test_merge_without_equivalents_is_combine() {
    let a = fafb();
    let b = Scene::from_layers([
        Layer::image("precomputed://gs://elsewhere/em"),
        Layer::annotation("precomputed://gs://elsewhere/points"),
    ]);
    let merged = a.merge_with(&b);
    assert_eq!(merged.len(), a.len() + b.len());
    assert_eq!(merged, a.combine(&b));
}

#[test]
fn test_merge_right_properties_win() {
    let a = Scene::from_layers([Layer::segmentation("precomputed://gs://b/seg")
        .with_name("left")
        .with("selectedAlpha", 0.5)
        .with("meshSilhouetteRendering", 3)
        .with_segments(["1", "2"])]);
    let b = Scene::from_layers([Layer::segmentation("precomputed://gs://b/seg")
        .with_name("right")
        .with("selectedAlpha", 0.9)
        .with_segments(["2", "3"])]);

    let merged = a.merge_with(&b);
    let layer = merged.layer(0).unwrap();
    assert_eq!(layer.name(), "right");
    assert_eq!(layer.get("selectedAlpha"), Some(&json!(0.9)));
    assert_eq!(layer.get("meshSilhouetteRendering"), Some(&json!(3)));
    assert_eq!(layer.segments().unwrap(), vec!["1", "2", "3"]);
}

// === Editing ===

#[test]
fn test_drop_last_and_missing() {
    let mut scene = fafb();
    let last = scene.layer(-1).unwrap().clone();
    assert_eq!(scene.drop_layer(-1).unwrap(), last);
    assert_eq!(scene.len(), 7);

    let err = scene.drop_layer("public_skeletons").unwrap_err();
    assert_eq!(err.error_code(), "LAYER_NOT_FOUND");
    assert_eq!(scene.len(), 7);
}

#[test]
fn test_property_and_accessor_agree() {
    let mut scene = fafb();
    let layer = scene.layer_mut("fafb-ffn1-20200412").unwrap();
    layer.add_segments(["720575940"]).unwrap();
    assert_eq!(
        layer.get("segments"),
        Some(&json!(["710435991", "720575940"]))
    );

    layer.set("segments", json!([5, "6"])).unwrap();
    assert_eq!(layer.segments().unwrap(), vec!["5", "6"]);
}
