use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use serde_json::Value;

use jobbergate::answers::{read_supplied_answers, SuppliedAnswers};
use jobbergate::application::load::load_application;
use jobbergate::application::Patch;
use jobbergate::cache::{APPLICATION_FILE, CONFIG_FILE, PARAM_DICT_FILE};
use jobbergate::params::finalize;
use jobbergate::params::render::{read_templates, TinyTemplateRenderer};
use jobbergate::workflow::prompt::TerminalPrompter;
use jobbergate::workflow::{run, MAINFLOW};
use jobbergate::{EngineError, WorkingDirectory};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build HPC job scripts from jobbergate applications")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer an application's questions and render its job script
    CreateJobScript(CreateJobScript),
}

#[derive(clap::Args, Debug)]
struct CreateJobScript {
    /// Directory holding application.yaml, jobbergate.yaml and templates/
    #[arg(short, long)]
    application_dir: PathBuf,
    /// JSON file with answers to use instead of asking
    #[arg(short, long)]
    param_file: Option<PathBuf>,
    /// Take each question's default, when it has one, instead of asking
    #[arg(long)]
    fast: bool,
    /// Override a base config value, KEY=VALUE (VALUE is read as JSON when it parses)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, Value)>,
    /// Scratch directory for plugin copies and the parameter document
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Where rendered files are written
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(long, default_value = MAINFLOW, hide = true)]
    start_step: String,
}

fn parse_override(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let result = match args.command {
        Command::CreateJobScript(cmd) => create_job_script(cmd),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<EngineError>().map_or(1, EngineError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

fn create_job_script(cmd: CreateJobScript) -> Result<()> {
    // answers file first: nothing runs if it is unusable
    let supplied: SuppliedAnswers = match &cmd.param_file {
        Some(path) => read_supplied_answers(path)?,
        None => SuppliedAnswers::new(),
    };

    let source = read_application_file(&cmd.application_dir, APPLICATION_FILE)?;
    let base_config = read_application_file(&cmd.application_dir, CONFIG_FILE)?;
    let cache = cmd.cache_dir.map(WorkingDirectory::new).unwrap_or_else(WorkingDirectory::default_location);
    let descriptor = load_application(&source, &base_config, &cache)?;
    let templates = read_templates(&cmd.application_dir.join("templates"))?;

    let overrides: Patch = cmd.overrides.into_iter().collect();
    let mut prompter = TerminalPrompter::stdio();
    let config = run(&descriptor, overrides, &supplied, cmd.fast, &cmd.start_step, &mut prompter)?;

    let finalized = finalize(config, &descriptor, &templates, &cache, &TinyTemplateRenderer)?;

    fs::create_dir_all(&cmd.out_dir).with_context(|| format!("Can't create {}", cmd.out_dir.display()))?;
    for (name, content) in &finalized.files {
        let out_path = cmd.out_dir.join(name);
        fs::write(&out_path, content).with_context(|| format!("Can't write {}", out_path.display()))?;
        println!("{}", out_path.display());
    }
    info!("Parameter document kept at {}", cache.file(PARAM_DICT_FILE).display());
    Ok(())
}

fn read_application_file(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).with_context(|| format!("Can't read {name} in application directory {}", dir.display()))
}
