//! The compile/link pipeline for one target.
//!
//! A build moves through `Idle -> Deciding -> Compiling -> Linking -> Done`,
//! dropping to `Failed` if any compile or the link fails. Caches are only
//! written in `Done`; a failed build leaves the previous caches untouched so
//! the next run sees the same staleness.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use artifex_cache::{BuildCache, ConfigCache, ResolvedSettings};
use artifex_common::ModTime;
use artifex_config::TargetConfiguration;
use artifex_deps::{PathResolver, StalenessOracle};
use rayon::prelude::*;

use crate::error::BuildError;
use crate::fs::{ensure_dir, remove_dir, remove_dir_if_empty, remove_file};
use crate::header;
use crate::pkgconfig::{resolve_packages, PackageQuery};
use crate::runner::{CommandOutcome, CommandRunner, Invocation};

/// How much the pipeline prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Status lines.
    #[default]
    Normal,
    /// Status lines plus command lines.
    Verbose,
}

/// Options shared by every target of a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Output level.
    pub verbosity: Verbosity,
    /// Maximum concurrent compiles; defaults to the available parallelism.
    pub jobs: Option<usize>,
    /// Skip compiles that have not started once one has failed.
    pub fail_fast: bool,
    /// The build definition file. A definition newer than the linked
    /// artifact forces a clean build.
    pub definition: Option<PathBuf>,
}

impl BuildOptions {
    fn worker_count(&self) -> usize {
        self.jobs.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}

/// Where a build ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Not started.
    Idle,
    /// Asking which objects are stale.
    Deciding,
    /// Compilers running.
    Compiling,
    /// Linker running or link check in progress.
    Linking,
    /// A compile or the link failed; nothing was persisted.
    Failed,
    /// Everything succeeded and the caches were written.
    Done,
}

/// Summary of one target's build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The target name.
    pub target: String,
    /// Final phase: [`BuildPhase::Done`] or [`BuildPhase::Failed`].
    pub phase: BuildPhase,
    /// Whether a clean was forced before building.
    pub forced_clean: bool,
    /// Sources compiled successfully.
    pub compiled: usize,
    /// Sources whose objects were up to date.
    pub up_to_date: usize,
    /// Sources whose compile failed.
    pub failed: Vec<PathBuf>,
    /// Compiles skipped after an earlier failure.
    pub skipped: usize,
    /// Whether the linker ran.
    pub linked: bool,
}

impl BuildReport {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            phase: BuildPhase::Idle,
            forced_clean: false,
            compiled: 0,
            up_to_date: 0,
            failed: Vec::new(),
            skipped: 0,
            linked: false,
        }
    }

    /// Returns `true` if the build finished successfully.
    pub fn is_success(&self) -> bool {
        self.phase == BuildPhase::Done
    }
}

/// One pending compile.
struct CompileJob {
    source: PathBuf,
    object: PathBuf,
    invocation: Invocation,
}

/// Command-line pieces shared by every compile and the link.
struct CommandLine {
    program: String,
    compile_flags: Vec<String>,
    link_flags: Vec<String>,
}

impl CommandLine {
    fn new(target: &TargetConfiguration, package_cflags: &[String], package_libs: &[String]) -> Self {
        let mut compile_flags = target.include_flags();
        compile_flags.extend(target.cflags.iter().cloned());
        compile_flags.extend(package_cflags.iter().cloned());

        let mut link_flags = compile_flags.clone();
        link_flags.extend(target.lib_flags.iter().cloned());
        link_flags.extend(package_libs.iter().cloned());

        Self {
            program: target.driver.program().to_string(),
            compile_flags,
            link_flags,
        }
    }

    /// `cc -c -o <object> <flags> <source>`
    fn compile(&self, source: &Path, object: &Path) -> Invocation {
        Invocation::new(&self.program)
            .args(["-c", "-o"])
            .arg(object.display().to_string())
            .args(self.compile_flags.iter().cloned())
            .arg(source.display().to_string())
    }

    /// `cc -o <target> <flags> <libs> <objects>`
    fn link(&self, target: &Path, objects: &[PathBuf]) -> Invocation {
        Invocation::new(&self.program)
            .arg("-o")
            .arg(target.display().to_string())
            .args(self.link_flags.iter().cloned())
            .args(objects.iter().map(|o| o.display().to_string()))
    }
}

/// Status output on stderr.
#[derive(Debug, Clone, Copy)]
struct Console {
    verbosity: Verbosity,
}

impl Console {
    fn status(self, verb: &str, message: &str) {
        if self.verbosity != Verbosity::Quiet {
            eprintln!("{verb:>12} {message}");
        }
    }

    fn command(self, invocation: &Invocation) {
        if self.verbosity == Verbosity::Verbose {
            eprintln!("{:>12} {invocation}", "Running");
        }
    }

    fn error(self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Builds targets using a command runner and a package query.
pub struct BuildPipeline<'a> {
    options: &'a BuildOptions,
    console: Console,
    runner: &'a dyn CommandRunner,
    packages: &'a dyn PackageQuery,
}

impl<'a> BuildPipeline<'a> {
    /// Creates a pipeline.
    pub fn new(
        options: &'a BuildOptions,
        runner: &'a dyn CommandRunner,
        packages: &'a dyn PackageQuery,
    ) -> Self {
        Self {
            options,
            console: Console {
                verbosity: options.verbosity,
            },
            runner,
            packages,
        }
    }

    /// Removes the target's build directory and linked artifact.
    ///
    /// Other targets sharing `objdir` or `outdir` keep their outputs. The
    /// shared directories go only once they are empty.
    pub fn clean(&self, target: &TargetConfiguration) -> Result<(), BuildError> {
        let build_dir = target.build_dir();
        if remove_dir(&build_dir, &target.root)? {
            self.console.status("Removing", &relative_display(&build_dir));
        }
        let artifact = target.target_path();
        if remove_file(&artifact)? {
            self.console.status("Removing", &relative_display(&artifact));
        }
        for dir in [&target.objdir, &target.outdir] {
            if dir != &target.root {
                remove_dir_if_empty(dir)?;
            }
        }
        Ok(())
    }

    /// Cleans, then builds from scratch.
    pub fn rebuild(&self, target: &TargetConfiguration) -> Result<BuildReport, BuildError> {
        self.clean(target)?;
        self.run(target)
    }

    /// Builds `target` incrementally.
    ///
    /// Compile and link failures are reported through the returned
    /// [`BuildReport`]; errors are reserved for problems that stop the build
    /// from being attempted at all.
    pub fn run(&self, target: &TargetConfiguration) -> Result<BuildReport, BuildError> {
        let mut report = BuildReport::new(&target.name);
        let target_path = target.target_path();

        let mut config_cache = ConfigCache::load_or_default(&target.config_cache_path());
        let settings = ResolvedSettings {
            compiler: target.driver.program().to_string(),
            cflags: target.cflags.clone(),
            include_dirs: target.include_dirs.clone(),
            lib_flags: target.lib_flags.clone(),
            packages: target.packages.clone(),
        };
        if let Some(reason) = self.clean_reason(&target_path, &config_cache, &settings) {
            tracing::debug!("{}: {reason}, cleaning", target.name);
            self.clean(target)?;
            report.forced_clean = true;
        }

        ensure_dir(&target.outdir)?;
        ensure_dir(&target.build_dir())?;
        if let Some(config_header) = &target.config_header {
            header::write_if_changed(config_header)?;
        }
        let package_flags = resolve_packages(&target.packages, &mut config_cache, self.packages)?;
        let commands = CommandLine::new(target, &package_flags.cflags, &package_flags.libs);

        let mut cache = BuildCache::load(&target.depends_path());
        let mut oracle = StalenessOracle::new(PathResolver::new(target.include_dirs.clone()));

        report.phase = BuildPhase::Deciding;
        let mut jobs = Vec::new();
        for source in &target.sources {
            let object = target.object_path(source);
            if oracle.is_dirty(source, &object, &mut cache) {
                if let Some(parent) = object.parent() {
                    ensure_dir(parent)?;
                }
                jobs.push(CompileJob {
                    invocation: commands.compile(source, &object),
                    source: source.clone(),
                    object,
                });
            } else {
                tracing::debug!("{} up to date", relative_display(source));
                report.up_to_date += 1;
            }
        }

        report.phase = BuildPhase::Compiling;
        let outcomes = self.compile_all(&jobs)?;
        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                CommandOutcome::Success => {
                    oracle.record_compiled(&job.source, &job.object, &mut cache);
                    report.compiled += 1;
                }
                CommandOutcome::Skipped => {
                    oracle.invalidate(&job.source, &job.object, &mut cache);
                    report.skipped += 1;
                }
                failure => {
                    oracle.invalidate(&job.source, &job.object, &mut cache);
                    self.console.error(&format!(
                        "failed to compile {} ({failure})",
                        relative_display(&job.source)
                    ));
                    report.failed.push(job.source.clone());
                }
            }
        }
        if !report.failed.is_empty() || report.skipped > 0 {
            report.phase = BuildPhase::Failed;
            return Ok(report);
        }

        report.phase = BuildPhase::Linking;
        let objects = target.object_paths();
        if needs_link(&target_path, &objects) {
            let invocation = commands.link(&target_path, &objects);
            self.console.status("Linking", &target.name);
            self.console.command(&invocation);
            let outcome = self.runner.run(&invocation);
            if !outcome.is_success() {
                self.console.error(&format!("failed to link {} ({outcome})", target.name));
                report.phase = BuildPhase::Failed;
                return Ok(report);
            }
            report.linked = true;
        } else {
            tracing::debug!("{} up to date, skipping link", target.name);
        }

        let pruned = cache.prune(&objects);
        if pruned > 0 {
            tracing::debug!("pruned {pruned} stale cache entries");
        }
        cache.save()?;
        config_cache.set_settings(settings);
        if config_cache.save(&target.config_cache_path())? {
            tracing::debug!("{}: configuration cache written", target.name);
        }

        report.phase = BuildPhase::Done;
        self.console.status(
            "Finished",
            &format!(
                "{} ({} compiled, {} up to date)",
                target.name, report.compiled, report.up_to_date
            ),
        );
        Ok(report)
    }

    /// Why the previous build's outputs cannot be reused, if they can't.
    fn clean_reason(
        &self,
        target_path: &Path,
        config_cache: &ConfigCache,
        settings: &ResolvedSettings,
    ) -> Option<&'static str> {
        if config_cache.settings_changed(settings) {
            return Some("compiler settings changed");
        }
        let built = ModTime::try_of(target_path)?;
        self.options
            .definition
            .as_deref()
            .and_then(ModTime::try_of)
            .is_some_and(|defined| defined > built)
            .then_some("build definition changed")
    }

    /// Runs every job on a bounded worker pool. Outcomes come back in job
    /// order.
    fn compile_all(&self, jobs: &[CompileJob]) -> Result<Vec<CommandOutcome>, BuildError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.worker_count().min(jobs.len()))
            .build()
            .map_err(|e| BuildError::WorkerPool(e.to_string()))?;

        let (console, runner) = (self.console, self.runner);
        let fail_fast = self.options.fail_fast;
        let failed = AtomicBool::new(false);
        let outcomes: Vec<CommandOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    if fail_fast && failed.load(Ordering::Relaxed) {
                        return CommandOutcome::Skipped;
                    }
                    console.status("Compiling", &relative_display(&job.source));
                    console.command(&job.invocation);
                    let outcome = runner.run(&job.invocation);
                    if !outcome.is_success() {
                        failed.store(true, Ordering::Relaxed);
                    }
                    outcome
                })
                .collect()
        });
        Ok(outcomes)
    }
}

/// `path` relative to the working directory when it is below it.
fn relative_display(path: &Path) -> String {
    let cwd = std::env::current_dir().unwrap_or_default();
    path.strip_prefix(&cwd).unwrap_or(path).display().to_string()
}

/// Relink unless the artifact exists and no object is newer than it.
fn needs_link(target: &Path, objects: &[PathBuf]) -> bool {
    let Some(built) = ModTime::try_of(target) else {
        return true;
    };
    objects
        .iter()
        .any(|object| ModTime::try_of(object).is_none_or(|m| m > built))
}
