use crate::foundation::core::Rgba8;
use crate::foundation::error::{RasterError, RasterResult};
use crate::render::pass::{PixelCtx, RenderPass};

/// Upper bound for [`Shader::BoxBlur`] radius; a radius `r` reads `(2r + 1)^2` texels per pixel.
pub const MAX_BLUR_RADIUS: u32 = 64;

/// A shader entry as it appears in a pipeline definition.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShaderInstance {
    /// Shader kind, case-insensitive (`fill`, `gradient`, `invert`, ...).
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
    /// Disabled shaders stay registered but are skipped at dispatch.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

/// Built-in per-pixel shaders over [`Rgba8`] rasters.
#[derive(Clone, Debug, PartialEq)]
pub enum Shader {
    /// Constant color.
    Fill {
        /// Output color.
        color: Rgba8,
    },
    /// Linear blend from the first to the last column (or row).
    Gradient {
        /// Color at column/row 0.
        from: Rgba8,
        /// Color at the last column/row.
        to: Rgba8,
        /// Blend along rows instead of columns.
        vertical: bool,
    },
    /// `255 - c` on the color channels; alpha kept.
    Invert,
    /// Replace color channels with Rec. 601 luma.
    Grayscale,
    /// White where luma >= `level`, black elsewhere; alpha kept.
    Threshold {
        /// Luma cut-off.
        level: u8,
    },
    /// Mean over a `(2 * radius + 1)` square read from the pre-pass snapshot.
    BoxBlur {
        /// Half-width of the kernel.
        radius: u32,
    },
}

impl Shader {
    /// Log label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fill { .. } => "fill",
            Self::Gradient { .. } => "gradient",
            Self::Invert => "invert",
            Self::Grayscale => "grayscale",
            Self::Threshold { .. } => "threshold",
            Self::BoxBlur { .. } => "box_blur",
        }
    }

    fn shade(&self, ctx: &PixelCtx<'_, Rgba8>) -> Rgba8 {
        let px = ctx.previous;
        match *self {
            Self::Fill { color } => color,
            Self::Gradient { from, to, vertical } => {
                let (pos, extent) = if vertical {
                    (ctx.y, ctx.height)
                } else {
                    (ctx.x, ctx.width)
                };
                let t = if extent > 1 {
                    f64::from(pos) / f64::from(extent - 1)
                } else {
                    0.0
                };
                from.lerp(to, t)
            }
            Self::Invert => Rgba8::new(255 - px.r, 255 - px.g, 255 - px.b, px.a),
            Self::Grayscale => {
                let l = px.luma();
                Rgba8::new(l, l, l, px.a)
            }
            Self::Threshold { level } => {
                let v = if px.luma() >= level { 255 } else { 0 };
                Rgba8::new(v, v, v, px.a)
            }
            Self::BoxBlur { radius } => box_mean(ctx, i64::from(radius)),
        }
    }
}

fn box_mean(ctx: &PixelCtx<'_, Rgba8>, r: i64) -> Rgba8 {
    if r == 0 {
        return ctx.previous;
    }
    let (cx, cy) = (i64::from(ctx.x), i64::from(ctx.y));
    let mut acc = [0u64; 4];
    for dy in -r..=r {
        for dx in -r..=r {
            let s = ctx.sample_at(cx + dx, cy + dy);
            acc[0] += u64::from(s.r);
            acc[1] += u64::from(s.g);
            acc[2] += u64::from(s.b);
            acc[3] += u64::from(s.a);
        }
    }
    let n = ((2 * r + 1) * (2 * r + 1)) as u64;
    let avg = |sum: u64| ((sum + n / 2) / n) as u8;
    Rgba8::new(avg(acc[0]), avg(acc[1]), avg(acc[2]), avg(acc[3]))
}

/// A parsed shader plus its enabled flag, ready to register on an engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPass {
    shader: Shader,
    enabled: bool,
}

impl ShaderPass {
    /// Wrap an enabled shader.
    pub fn new(shader: Shader) -> Self {
        Self {
            shader,
            enabled: true,
        }
    }

    /// Parse a pipeline entry.
    pub fn from_instance(inst: &ShaderInstance) -> RasterResult<Self> {
        Ok(Self {
            shader: parse_shader(inst)?,
            enabled: inst.enabled,
        })
    }

    /// The wrapped shader.
    pub fn shader(&self) -> &Shader {
        &self.shader
    }
}

impl RenderPass<Rgba8> for ShaderPass {
    fn execute(&self, ctx: &PixelCtx<'_, Rgba8>) -> RasterResult<Rgba8> {
        Ok(self.shader.shade(ctx))
    }

    fn is_applicable(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        self.shader.label()
    }
}

/// Validate and parse one pipeline entry.
pub fn parse_shader(inst: &ShaderInstance) -> RasterResult<Shader> {
    let kind = inst.kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(RasterError::validation("shader kind must be non-empty"));
    }

    match kind.as_str() {
        "fill" => Ok(Shader::Fill {
            color: get_color(&inst.params, "color")?,
        }),
        "gradient" => {
            let vertical = match inst.params.get("vertical") {
                None => false,
                Some(v) => v.as_bool().ok_or_else(|| {
                    RasterError::validation("gradient.vertical must be a boolean")
                })?,
            };
            Ok(Shader::Gradient {
                from: get_color(&inst.params, "from")?,
                to: get_color(&inst.params, "to")?,
                vertical,
            })
        }
        "invert" => Ok(Shader::Invert),
        "grayscale" | "greyscale" => Ok(Shader::Grayscale),
        "threshold" => {
            let level = get_u32(&inst.params, "level")?;
            let level = u8::try_from(level)
                .map_err(|_| RasterError::validation("threshold.level must be <= 255"))?;
            Ok(Shader::Threshold { level })
        }
        "box_blur" | "boxblur" | "box-blur" | "blur" => {
            let radius = get_u32(&inst.params, "radius")?;
            if radius > MAX_BLUR_RADIUS {
                return Err(RasterError::validation(format!(
                    "box_blur.radius must be <= {MAX_BLUR_RADIUS}"
                )));
            }
            Ok(Shader::BoxBlur { radius })
        }
        _ => Err(RasterError::validation(format!(
            "unknown shader kind '{kind}'"
        ))),
    }
}

fn get_u32(obj: &serde_json::Value, key: &str) -> RasterResult<u32> {
    let Some(v) = obj.get(key) else {
        return Err(RasterError::validation(format!(
            "missing shader param '{key}'"
        )));
    };
    let Some(n) = v.as_u64() else {
        return Err(RasterError::validation(format!(
            "shader param '{key}' must be an integer"
        )));
    };
    u32::try_from(n)
        .map_err(|_| RasterError::validation(format!("shader param '{key}' is out of range")))
}

fn get_color(obj: &serde_json::Value, key: &str) -> RasterResult<Rgba8> {
    let Some(v) = obj.get(key) else {
        return Err(RasterError::validation(format!(
            "missing shader param '{key}'"
        )));
    };
    let Some(s) = v.as_str() else {
        return Err(RasterError::validation(format!(
            "shader param '{key}' must be a hex color string"
        )));
    };
    Rgba8::from_hex(s)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/shaders.rs"]
mod tests;
