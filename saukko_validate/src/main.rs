use anyhow::{Result, anyhow};
use clap::Parser;
use saukko_core::policy::PolicyLint;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument};

/// Saukko Tool Policy Validator
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Validates tool policy files against the ToolPolicy schema and lints them for semantic problems."
)]
struct Cli {
    /// Path to the directory containing tool policy JSON files, a comma-separated list of files, or blank to validate '.saukko/tools'.
    #[arg(default_value = ".saukko/tools")]
    validation_target: String,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,
}

#[instrument]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    saukko_core::utils::logging::init_logging(log_level, false)?;

    if run_validation_mode(&cli)? {
        info!("All policies are valid.");
        Ok(())
    } else {
        Err(anyhow!(
            "Some policies are invalid. Please check the error messages above."
        ))
    }
}

fn run_validation_mode(cli: &Cli) -> Result<bool> {
    let mut all_valid = true;
    let lint = PolicyLint::new();

    // Process each target in the validation target list
    let targets = if cli.validation_target.contains(',') {
        cli.validation_target
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()
    } else {
        vec![cli.validation_target.clone()]
    };

    let mut files_to_validate = Vec::new();
    for target in targets {
        let path = PathBuf::from(target);
        if path.is_dir() {
            files_to_validate.extend(get_json_files(&path)?);
        } else if path.is_file() {
            files_to_validate.push(path);
        } else {
            error!("Validation target not found: {}", path.display());
            all_valid = false;
        }
    }

    for file_path in files_to_validate {
        let content = match fs::read_to_string(&file_path) {
            Ok(c) => c,
            Err(e) => {
                error!(
                    "Failed to read file {}: {}",
                    file_path.display(),
                    e.to_string()
                );
                all_valid = false;
                continue;
            }
        };

        match lint.check_file(&file_path, &content) {
            Ok(policy) => {
                info!("{} is valid (tool '{}').", file_path.display(), policy.name);
            }
            Err(errors) => {
                for e in &errors {
                    match &e.suggestion {
                        Some(suggestion) => error!(
                            "Validation failed for {}: {} (hint: {})",
                            file_path.display(),
                            e,
                            suggestion
                        ),
                        None => error!("Validation failed for {}: {}", file_path.display(), e),
                    }
                }
                all_valid = false;
            }
        }
    }

    Ok(all_valid)
}

fn get_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path);
        }
    }
    Ok(files)
}
