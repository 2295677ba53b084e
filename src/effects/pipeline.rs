use std::path::Path;

use anyhow::Context as _;

use crate::effects::shaders::{ShaderInstance, ShaderPass};
use crate::foundation::core::{Rgba8, Size};
use crate::foundation::error::{RasterError, RasterResult};
use crate::raster::buffer::RasterBuffer;
use crate::render::dispatch::{DispatchEngine, DispatchOpts};
use crate::session::render_session::EpochToken;

/// JSON description of a raster and the shaders to run over it, in order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDef {
    /// Raster width; ignored when an input image is supplied.
    pub width: u32,
    /// Raster height; ignored when an input image is supplied.
    pub height: u32,
    /// Hex color the raster starts out with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Band partitioning.
    #[serde(default)]
    pub dispatch: DispatchOpts,
    /// Shaders in dispatch order.
    #[serde(default)]
    pub shaders: Vec<ShaderInstance>,
}

impl PipelineDef {
    /// Parse from a JSON string and validate.
    pub fn from_json_str(s: &str) -> RasterResult<Self> {
        let def: Self = serde_json::from_str(s).map_err(|e| RasterError::serde(e.to_string()))?;
        def.validate()?;
        Ok(def)
    }

    /// Read, parse and validate a pipeline file.
    pub fn from_path(path: &Path) -> RasterResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read pipeline '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_string(&self) -> RasterResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RasterError::serde(e.to_string()))
    }

    /// Check sizes, dispatch options, the background color and every shader entry.
    pub fn validate(&self) -> RasterResult<()> {
        Size::new(self.width, self.height)?;
        self.dispatch.validate()?;
        self.background_color()?;
        for (i, inst) in self.shaders.iter().enumerate() {
            ShaderPass::from_instance(inst)
                .map_err(|e| RasterError::validation(format!("shaders[{i}]: {e}")))?;
        }
        Ok(())
    }

    /// Parsed background, transparent when unset.
    pub fn background_color(&self) -> RasterResult<Rgba8> {
        match &self.background {
            Some(hex) => Rgba8::from_hex(hex),
            None => Ok(Rgba8::TRANSPARENT),
        }
    }

    /// Build an idle engine bound to `token` with every shader registered.
    ///
    /// `input` replaces the background raster when given.
    pub fn build_engine(
        &self,
        token: EpochToken,
        input: Option<RasterBuffer<Rgba8>>,
    ) -> RasterResult<DispatchEngine<Rgba8>> {
        let raster = match input {
            Some(raster) => raster,
            None => RasterBuffer::filled(self.width, self.height, self.background_color()?)?,
        };
        let mut engine = DispatchEngine::with_opts(token, raster, self.dispatch.clone())?;
        for inst in &self.shaders {
            engine.register_pass(ShaderPass::from_instance(inst)?)?;
        }
        tracing::debug!(
            shaders = self.shaders.len(),
            width = engine.raster().width(),
            height = engine.raster().height(),
            "pipeline built"
        );
        Ok(engine)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/pipeline.rs"]
mod tests;
