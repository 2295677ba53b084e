use super::*;
use crate::foundation::core::Size;
use crate::render::pass::Texture;
use serde_json::json;

fn inst(kind: &str, params: serde_json::Value) -> ShaderInstance {
    ShaderInstance {
        kind: kind.to_string(),
        params,
        enabled: true,
    }
}

fn shade_at(shader: &Shader, data: &[Rgba8], size: Size, index: usize) -> Rgba8 {
    let ctx = PixelCtx::at(Texture::new(data, size), index, 0.0);
    ShaderPass::new(shader.clone()).execute(&ctx).unwrap()
}

#[test]
fn parse_accepts_known_kinds() {
    assert_eq!(
        parse_shader(&inst("Fill", json!({"color": "#ff0000"}))).unwrap(),
        Shader::Fill {
            color: Rgba8::opaque(255, 0, 0)
        }
    );
    assert_eq!(
        parse_shader(&inst("invert", serde_json::Value::Null)).unwrap(),
        Shader::Invert
    );
    assert_eq!(
        parse_shader(&inst("box-blur", json!({"radius": 2}))).unwrap(),
        Shader::BoxBlur { radius: 2 }
    );
    assert_eq!(
        parse_shader(&inst("gradient", json!({"from": "#000000", "to": "#ffffff", "vertical": true})))
            .unwrap(),
        Shader::Gradient {
            from: Rgba8::BLACK,
            to: Rgba8::WHITE,
            vertical: true
        }
    );
}

#[test]
fn parse_rejects_bad_input() {
    for (kind, params) in [
        ("", json!({})),
        ("sparkle", json!({})),
        ("fill", json!({})),
        ("fill", json!({"color": 7})),
        ("threshold", json!({"level": 300})),
        ("threshold", json!({"level": -1})),
        ("box_blur", json!({"radius": MAX_BLUR_RADIUS + 1})),
        ("gradient", json!({"from": "#000", "to": "#ffffff"})),
        ("gradient", json!({"from": "#000000", "to": "#ffffff", "vertical": "yes"})),
    ] {
        let res = parse_shader(&inst(kind, params));
        assert!(
            matches!(res, Err(RasterError::Validation(_))),
            "{kind} should fail: {res:?}"
        );
    }
}

#[test]
fn enabled_defaults_to_true_and_controls_applicability() {
    let on: ShaderInstance = serde_json::from_str(r#"{"kind": "invert"}"#).unwrap();
    assert!(on.enabled);
    assert!(ShaderPass::from_instance(&on).unwrap().is_applicable());

    let off: ShaderInstance =
        serde_json::from_str(r#"{"kind": "invert", "enabled": false}"#).unwrap();
    let pass = ShaderPass::from_instance(&off).unwrap();
    assert!(!pass.is_applicable());
    assert_eq!(pass.name(), "invert");
}

#[test]
fn color_shaders_keep_alpha() {
    let size = Size::new(1, 1).unwrap();
    let data = [Rgba8::new(10, 200, 30, 77)];
    assert_eq!(
        shade_at(&Shader::Invert, &data, size, 0),
        Rgba8::new(245, 55, 225, 77)
    );
    let l = data[0].luma();
    assert_eq!(
        shade_at(&Shader::Grayscale, &data, size, 0),
        Rgba8::new(l, l, l, 77)
    );
    assert_eq!(
        shade_at(&Shader::Threshold { level: l }, &data, size, 0),
        Rgba8::new(255, 255, 255, 77)
    );
    assert_eq!(
        shade_at(&Shader::Threshold { level: l + 1 }, &data, size, 0),
        Rgba8::new(0, 0, 0, 77)
    );
}

#[test]
fn gradient_spans_first_to_last_column() {
    let size = Size::new(5, 1).unwrap();
    let data = vec![Rgba8::TRANSPARENT; 5];
    let g = Shader::Gradient {
        from: Rgba8::BLACK,
        to: Rgba8::WHITE,
        vertical: false,
    };
    assert_eq!(shade_at(&g, &data, size, 0), Rgba8::BLACK);
    assert_eq!(shade_at(&g, &data, size, 4), Rgba8::WHITE);
    assert_eq!(shade_at(&g, &data, size, 2).r, 128);

    let single = Size::new(1, 1).unwrap();
    assert_eq!(shade_at(&g, &data[..1], single, 0), Rgba8::BLACK);
}

#[test]
fn box_blur_averages_clamped_neighborhood() {
    let size = Size::new(3, 1).unwrap();
    let data = [
        Rgba8::opaque(0, 0, 0),
        Rgba8::opaque(90, 90, 90),
        Rgba8::opaque(180, 180, 180),
    ];
    let blur = Shader::BoxBlur { radius: 1 };
    // Center: rows clamp to the single row, so each column is read three times.
    assert_eq!(shade_at(&blur, &data, size, 1), Rgba8::opaque(90, 90, 90));
    // Left edge reads column 0 twice (clamped) and column 1 once.
    assert_eq!(shade_at(&blur, &data, size, 0), Rgba8::opaque(30, 30, 30));
    assert_eq!(
        shade_at(&Shader::BoxBlur { radius: 0 }, &data, size, 2),
        data[2]
    );
}
