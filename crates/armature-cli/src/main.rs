//! Armature - URDF joint editor
//!
//! Inspects robot descriptions and adds or modifies joints, either directly
//! from the command line or by replaying a scripted editor session.

mod commands;
mod files;
mod replay;

use std::path::PathBuf;

use anyhow::{Context, Result};
use armature_editor::{load_config, save_default_config, JointEditor, MemoryDocument, CONFIG_FILE};
use armature_scene::UrdfLoader;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::commands::{AddJointArgs, ModifyJointArgs};

#[derive(Parser, Debug)]
#[command(name = "armature")]
#[command(about = "Add and modify joints in URDF robot descriptions")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the links and joints of a description
    Inspect {
        file: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Add a joint between two links
    AddJoint(AddJointArgs),
    /// Change attributes of an existing joint
    ModifyJoint(ModifyJointArgs),
    /// Play a scripted editor session against a description
    Replay {
        file: PathBuf,
        script: PathBuf,
        /// Write the result here instead of editing in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a default configuration file
    InitConfig { path: Option<PathBuf> },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Armature v{}", env!("CARGO_PKG_VERSION"));

    if let Command::InitConfig { path } = &args.command {
        let path = path.as_ref().unwrap_or(&args.config);
        save_default_config(path).with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }

    let config = load_config(&args.config)?;

    match &args.command {
        Command::Inspect { file, json } => commands::inspect(file, *json)?,
        Command::AddJoint(add) => commands::add_joint(add, &config)?,
        Command::ModifyJoint(modify) => commands::modify_joint(modify, &config)?,
        Command::Replay {
            file,
            script,
            output,
        } => {
            let text = files::read_document(file)?;
            let script = replay::load_script(script)?;
            let mut editor = JointEditor::new(MemoryDocument::new(text.clone()), UrdfLoader::new(), &config)?;
            let report = replay::run_script(&mut editor, &script)?;

            println!(
                "Added {}, modified {}, ignored {}, failed {}",
                report.added.len(),
                report.modified.len(),
                report.ignored,
                report.failed.len()
            );
            for name in report.added.iter().chain(&report.modified) {
                println!("  - {}", name);
            }

            let edited = editor.document().as_str();
            if edited != text || output.is_some() {
                files::write_result(file, output.as_deref(), edited)?;
            }
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}
