//! Building, rebuilding and cleaning the selected targets.

use std::time::Duration;

use artifex_build::{BuildOptions, BuildPipeline, PkgConfig, ProcessRunner, Verbosity};
use artifex_config::ConfigError;

use crate::project::locate_project;
use crate::{Cli, GlobalArgs};

/// What to do with each selected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Build,
    Rebuild,
    Clean,
}

impl Mode {
    fn from_cli(cli: &Cli) -> Self {
        if cli.clean {
            Mode::Clean
        } else if cli.rebuild {
            Mode::Rebuild
        } else {
            Mode::Build
        }
    }
}

fn verbosity(global: &GlobalArgs) -> Verbosity {
    if global.quiet {
        Verbosity::Quiet
    } else if global.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Selects the targets to process, in name order.
fn select_targets(
    config: &artifex_config::ProjectConfig,
    requested: Option<&str>,
) -> Result<Vec<String>, ConfigError> {
    match requested {
        Some(name) if config.targets.contains_key(name) => Ok(vec![name.to_string()]),
        Some(name) => Err(ConfigError::UnknownTarget(name.to_string())),
        None => Ok(config.targets.keys().cloned().collect()),
    }
}

/// Runs the build. Returns exit code 0 if every target succeeded, 1 otherwise.
pub fn run(cli: &Cli, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let location = locate_project(global)?;
    let config = artifex_config::load_config_file(&location.definition)?;
    let targets = select_targets(&config, cli.target.as_deref())?;
    let mode = Mode::from_cli(cli);

    let options = BuildOptions {
        verbosity: verbosity(global),
        jobs: cli.jobs,
        fail_fast: cli.fail_fast,
        definition: Some(location.definition.clone()),
    };
    let runner = ProcessRunner::new(cli.timeout.map(Duration::from_secs));
    let packages = PkgConfig::from_env();
    let pipeline = BuildPipeline::new(&options, &runner, &packages);

    if !global.quiet && mode != Mode::Clean {
        eprintln!(
            "{:>12} {} v{}",
            "Building", config.project.name, config.project.version
        );
    }

    let mut failed = Vec::new();
    for name in &targets {
        let target = artifex_config::resolve_target(&config, name, &location.root)?;
        tracing::debug!("{name}: {} using {}", target.target_path().display(), target.driver);
        let report = match mode {
            Mode::Clean => {
                pipeline.clean(&target)?;
                continue;
            }
            Mode::Rebuild => pipeline.rebuild(&target)?,
            Mode::Build => pipeline.run(&target)?,
        };
        if !report.is_success() {
            failed.push(name.as_str());
        }
    }

    if failed.is_empty() {
        Ok(0)
    } else {
        eprintln!("error: build failed for {}", failed.join(", "));
        Ok(1)
    }
}
