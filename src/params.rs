//! Wrap the final config into the parameter document and render it
//!
//! The parameter document is written to the scratch cache before rendering, so what was sent to
//! the renderer can always be inspected afterwards.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{ApplicationDescriptor, Config};
use crate::cache::{WorkingDirectory, PARAM_DICT_FILE};
use crate::error::{EngineError, Result};
use crate::params::render::Renderer;

/// Render templates locally with TinyTemplate
pub mod render;

/// Output filename mapped to rendered text
pub type RenderedFiles = BTreeMap<String, String>;
/// Template filename mapped to template text
pub type TemplateSet = BTreeMap<String, String>;

/// The document handed to the rendering collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDict {
    pub jobbergate_config: Config,
    pub application_config: Value,
}

/// What [`finalize`] produced: the parameter document and the files rendered from it
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub params: ParamDict,
    pub files: RenderedFiles,
}

impl ParamDict {
    pub fn assemble(config: Config, descriptor: &ApplicationDescriptor) -> ParamDict {
        ParamDict { jobbergate_config: config, application_config: descriptor.application_config.clone() }
    }

    /// Persist to the scratch cache as pretty JSON
    pub fn write(&self, cache: &WorkingDirectory) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|err| EngineError::Render {
            template: PARAM_DICT_FILE.to_string(),
            reason: err.to_string(),
        })?;
        cache.write(PARAM_DICT_FILE, &json)?;
        Ok(())
    }
}

/// Assemble, persist, and render the final config
///
/// Only called with the config of a chain that ran to completion.
pub fn finalize(
    config: Config,
    descriptor: &ApplicationDescriptor,
    templates: &TemplateSet,
    cache: &WorkingDirectory,
    renderer: &dyn Renderer,
) -> Result<Finalized> {
    let params = ParamDict::assemble(config, descriptor);
    params.write(cache)?;

    let files = renderer.render(&params, templates)?;
    info!("Rendered {} file(s): {}", files.len(), files.keys().cloned().collect::<Vec<_>>().join(", "));
    Ok(Finalized { params, files })
}
