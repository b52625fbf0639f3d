use std::fs;
use std::path::Path;

use log::{info, warn};
use serde_json::Value;
use tinytemplate::TinyTemplate;

use crate::error::{EngineError, Result};
use crate::params::{ParamDict, RenderedFiles, TemplateSet};

/// Name of the rendered job script in every [`RenderedFiles`]
pub static PRIMARY_SCRIPT: &str = "job_script.sh";
/// Template used for the job script unless the config names one under `template`
pub static DEFAULT_TEMPLATE: &str = "job_template.sh";
/// Config key listing extra templates rendered next to the job script
pub static SUPPORTING_FILES: &str = "supporting_files";

/// The rendering collaborator: parameter document plus templates in, file contents out
pub trait Renderer {
    fn render(&self, params: &ParamDict, templates: &TemplateSet) -> Result<RenderedFiles>;
}

/// Render with TinyTemplate, using the whole parameter document as context
///
/// Templates address answers as `{jobbergate_config.cluster}`. Output is not HTML-escaped.
pub struct TinyTemplateRenderer;

impl Renderer for TinyTemplateRenderer {
    fn render(&self, params: &ParamDict, templates: &TemplateSet) -> Result<RenderedFiles> {
        let outputs = planned_outputs(params)?;

        let mut tt = TinyTemplate::new();
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        for (_, template) in &outputs {
            let text = templates.get(template).ok_or_else(|| EngineError::Render {
                template: template.clone(),
                reason: "not found in the application's templates".to_string(),
            })?;
            tt.add_template(template, text).map_err(|err| render_error(template, err))?;
        }

        let mut files = RenderedFiles::new();
        for (output, template) in &outputs {
            info!("Rendering {output} from template {template}");
            let content = tt.render(template, params).map_err(|err| render_error(template, err))?;
            files.insert(output.clone(), content);
        }
        Ok(files)
    }
}

/// (output name, template name) pairs; the job script always comes first
fn planned_outputs(params: &ParamDict) -> Result<Vec<(String, String)>> {
    let config = &params.jobbergate_config;
    let primary = match config.get("template") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            warn!("Ignoring non-string template setting {other}");
            DEFAULT_TEMPLATE.to_string()
        }
        None => DEFAULT_TEMPLATE.to_string(),
    };
    let mut outputs = vec![(PRIMARY_SCRIPT.to_string(), primary)];

    match config.get(SUPPORTING_FILES) {
        None | Some(Value::Null) => {}
        Some(Value::Array(names)) => {
            for name in names {
                let Some(name) = name.as_str() else {
                    return Err(EngineError::Render {
                        template: name.to_string(),
                        reason: format!("'{SUPPORTING_FILES}' entries must be template names"),
                    });
                };
                outputs.push((name.to_string(), name.to_string()));
            }
        }
        Some(other) => {
            return Err(EngineError::Render {
                template: other.to_string(),
                reason: format!("'{SUPPORTING_FILES}' must be a list of template names"),
            })
        }
    }
    Ok(outputs)
}

fn render_error(template: &str, err: tinytemplate::error::Error) -> EngineError {
    EngineError::Render { template: template.to_string(), reason: err.to_string() }
}

/// Read every file in an application's templates directory, keyed by filename
pub fn read_templates(dir: &Path) -> Result<TemplateSet> {
    let mut templates = TemplateSet::new();
    if !dir.is_dir() {
        warn!("No templates directory at {}", dir.display());
        return Ok(templates);
    }
    for entry in fs::read_dir(dir).map_err(|err| EngineError::io(dir, err))? {
        let path = entry.map_err(|err| EngineError::io(dir, err))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            warn!("Skipping template with a non UTF-8 name: {}", path.display());
            continue;
        };
        let text = fs::read_to_string(&path).map_err(|err| EngineError::io(&path, err))?;
        templates.insert(name.to_string(), text);
    }
    info!("Read {} template(s) from {}", templates.len(), dir.display());
    Ok(templates)
}
