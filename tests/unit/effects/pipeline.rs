use super::*;
use crate::render::dispatch::DispatchOutcome;
use crate::session::render_session::RenderSession;

const TWO_SHADERS: &str = r##"{
    "width": 4,
    "height": 3,
    "background": "#102030",
    "dispatch": { "bands": 2 },
    "shaders": [
        { "kind": "invert" },
        { "kind": "fill", "params": { "color": "#ffffff" }, "enabled": false }
    ]
}"##;

#[test]
fn parses_and_builds_engine() {
    let def = PipelineDef::from_json_str(TWO_SHADERS).unwrap();
    assert_eq!(def.dispatch.bands, Some(2));
    assert_eq!(def.background_color().unwrap(), Rgba8::opaque(0x10, 0x20, 0x30));

    let session = RenderSession::new();
    let mut engine = def.build_engine(session.token(), None).unwrap();
    assert_eq!(engine.pass_count(), 2);
    let report = engine.dispatch().unwrap();
    assert_eq!(report.outcome, DispatchOutcome::Completed);
    assert!(report.passes[1].skipped);
    assert!(
        engine
            .raster()
            .as_slice()
            .iter()
            .all(|&p| p == Rgba8::new(0xef, 0xdf, 0xcf, 0xff))
    );
}

#[test]
fn input_raster_overrides_background_and_size() {
    let def = PipelineDef::from_json_str(TWO_SHADERS).unwrap();
    let session = RenderSession::new();
    let input = RasterBuffer::filled(2, 2, Rgba8::WHITE).unwrap();
    let mut engine = def.build_engine(session.token(), Some(input)).unwrap();
    engine.dispatch().unwrap();
    let out = engine.into_raster();
    assert_eq!((out.width(), out.height()), (2, 2));
    assert!(out.as_slice().iter().all(|&p| p == Rgba8::BLACK));
}

#[test]
fn defaults_fill_in_missing_sections() {
    let def = PipelineDef::from_json_str(r#"{"width": 1, "height": 1}"#).unwrap();
    assert!(def.shaders.is_empty());
    assert_eq!(def.dispatch, DispatchOpts::default());
    assert_eq!(def.background_color().unwrap(), Rgba8::TRANSPARENT);
}

#[test]
fn malformed_json_is_serde_error() {
    let res = PipelineDef::from_json_str("{ not json");
    assert!(matches!(res, Err(RasterError::Serde(_))));
    let res = PipelineDef::from_json_str(r##"{"width": 1, "height": 1, "colour": "#fff"}"##);
    assert!(matches!(res, Err(RasterError::Serde(_))));
}

#[test]
fn invalid_content_is_validation_error() {
    for s in [
        r#"{"width": 0, "height": 1}"#,
        r#"{"width": 1, "height": 1, "dispatch": {"bands": 0}}"#,
        r#"{"width": 1, "height": 1, "background": "red"}"#,
        r#"{"width": 1, "height": 1, "shaders": [{"kind": "nope"}]}"#,
    ] {
        let res = PipelineDef::from_json_str(s);
        assert!(matches!(res, Err(RasterError::Validation(_))), "{s}: {res:?}");
    }
}

#[test]
fn shader_errors_name_their_slot() {
    let err = PipelineDef::from_json_str(
        r#"{"width": 1, "height": 1, "shaders": [{"kind": "invert"}, {"kind": "blur"}]}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("shaders[1]"), "{err}");
}

#[test]
fn json_survives_a_write_and_reload() {
    let def = PipelineDef::from_json_str(TWO_SHADERS).unwrap();
    let back = PipelineDef::from_json_str(&def.to_json_string().unwrap()).unwrap();
    assert_eq!(back, def);
}

#[test]
fn missing_file_is_other_error() {
    let res = PipelineDef::from_path(Path::new("target/does-not-exist/pipeline.json"));
    assert!(matches!(res, Err(RasterError::Other(_))));
}
