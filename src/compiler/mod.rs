//! Theme compilation.
//!
//! Turns every `[[themes]]` entry into a JSON theme file inside the output
//! directory, then writes the extension manifest and install script next to
//! them:
//!
//! ```text
//! themes/
//! ├── midnight-0.json
//! ├── midnight-1.json
//! ├── package.json
//! ├── install.sh
//! └── README.md        (copied when present)
//! ```

mod cache;
mod manifest;
mod script;

pub use cache::ModuleCache;
pub use manifest::{ContributedTheme, DEFAULT_UI_THEME, Manifest};
pub use script::INSTALL_SCRIPT;

use std::{
    fs,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow, bail};
use owo_colors::OwoColorize;
use serde_json::Value;

use crate::config::{ProjectConfig, ThemeDescriptor, normalize_path};
use crate::orchestrator::{BuildContext, Compiler};
use crate::package::{self, PackageMetadata, to_directory_name};
use crate::utils::plural::plural_count;

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Files copied from the project root when present.
const OPTIONAL_FILES: &[&str] = &["README.md", "CHANGELOG.md", "LICENSE"];

/// Progress line: info for one-shot runs, verbose inside a watch session.
macro_rules! note {
    ($quiet:expr; $($arg:tt)*) => {
        if $quiet {
            crate::debug!("compile"; $($arg)*)
        } else {
            crate::log!("compile"; $($arg)*)
        }
    };
}

/// Summary of a finished compile.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub out_dir: PathBuf,
    pub themes: usize,
    pub elapsed: Duration,
}

/// Compile every configured theme into `config.out_dir()`.
///
/// The output directory is recreated from scratch. When any theme fails the
/// directory is removed again and the whole compile fails.
pub fn compile_extension(
    config: &ProjectConfig,
    package: &PackageMetadata,
    cache: &ModuleCache,
    quiet: bool,
) -> Result<CompileReport> {
    let started = Instant::now();

    let name = package::extension_name(config, package)?;
    let display_name = package::display_name(config, package)?;
    let publisher = package::author(package)?;
    let link_name = to_directory_name(&format!("{publisher}.{name}"));

    note!(quiet; "compiling extension {}", display_name.bold());

    let out_dir = config.out_dir();
    reset_dir(config.get_root(), &out_dir, &config.theme_sources())?;
    note!(quiet; "output: {}", out_dir.display().green());

    let mut manifest = Manifest::new(name.clone(), display_name.clone(), publisher, package);
    let mut failures = 0usize;

    for (index, descriptor) in config.themes.iter().enumerate() {
        match compile_theme(config, cache, &name, index, descriptor, &out_dir) {
            Ok(entry) => {
                note!(quiet; "{} → {}", entry.label.blue(), entry.path);
                manifest.push_theme(entry);
            }
            Err(err) => {
                crate::error!("compile"; "{:#}", err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        fs::remove_dir_all(&out_dir)
            .with_context(|| format!("Failed to clean up {}", out_dir.display()))?;
        bail!("Compilation finished with errors.");
    }

    copy_optional_files(config.get_root(), &out_dir)?;
    manifest.write(&out_dir.join(MANIFEST_FILE))?;
    script::write(&out_dir, &link_name, &display_name)?;

    let elapsed = started.elapsed();
    let themes = manifest.theme_count();
    note!(
        quiet;
        "compiled {} in {}ms",
        plural_count(themes, "theme"),
        elapsed.as_millis()
    );

    Ok(CompileReport {
        out_dir,
        themes,
        elapsed,
    })
}

/// Compile one descriptor into `<name>-<index>.json`.
fn compile_theme(
    config: &ProjectConfig,
    cache: &ModuleCache,
    name: &str,
    index: usize,
    descriptor: &ThemeDescriptor,
    out_dir: &Path,
) -> Result<ContributedTheme> {
    let source = config.root_join(&descriptor.path);
    let theme = cache
        .load(&source)
        .with_context(|| format!("theme #{index} could not be loaded"))?;

    let label = theme
        .label
        .clone()
        .filter(|l| !l.is_empty())
        .or_else(|| Some(descriptor.label.clone()).filter(|l| !l.is_empty()))
        .ok_or_else(|| {
            anyhow!(
                "theme at {} has no label; set `label` in the module or in vsct.toml",
                source.display()
            )
        })?;

    let ui_theme = descriptor
        .ui_theme
        .clone()
        .or_else(|| theme.ui_theme.clone())
        .unwrap_or_else(|| DEFAULT_UI_THEME.to_string());

    let file_name = format!("{}.json", to_directory_name(&format!("{name}-{index}")));
    let dest = out_dir.join(&file_name);

    let mut compiled = (*theme).clone();
    compiled.label = Some(label.clone());
    compiled.ui_theme = Some(ui_theme.clone());
    compiled
        .extra
        .entry("name")
        .or_insert_with(|| Value::String(label.clone()));

    let mut content = serde_json::to_string_pretty(&compiled)?;
    content.push('\n');
    fs::write(&dest, content).with_context(|| format!("Failed to write {}", dest.display()))?;

    Ok(ContributedTheme {
        label,
        path: format!("./{file_name}"),
        ui_theme,
    })
}

/// Remove and recreate the output directory.
///
/// Refuses when the directory would hold the project root or a theme source.
fn reset_dir(root: &Path, out_dir: &Path, sources: &[PathBuf]) -> Result<()> {
    let root = normalize_path(root);
    let out = normalize_path(out_dir);

    if root.starts_with(&out) {
        bail!(
            "output directory {} contains the project root; choose a subdirectory",
            out.display()
        );
    }
    if let Some(source) = sources.iter().find(|source| normalize_path(source).starts_with(&out)) {
        bail!(
            "output directory {} contains theme source {}; choose another directory",
            out.display(),
            source.display()
        );
    }

    if out.exists() {
        fs::remove_dir_all(&out).with_context(|| format!("Failed to remove {}", out.display()))?;
    }
    fs::create_dir_all(&out).with_context(|| format!("Failed to create {}", out.display()))
}

fn copy_optional_files(root: &Path, out_dir: &Path) -> Result<()> {
    for file in OPTIONAL_FILES {
        let src = root.join(file);
        if src.is_file() {
            fs::copy(&src, out_dir.join(file))
                .with_context(|| format!("Failed to copy {}", src.display()))?;
            crate::debug!("compile"; "added {}", file);
        }
    }
    Ok(())
}

// ============================================================================
// watch-session compiler
// ============================================================================

/// [`Compiler`] backed by [`compile_extension`], run on the blocking pool.
#[derive(Debug, Clone)]
pub struct ThemeCompiler {
    cache: Arc<ModuleCache>,
}

impl ThemeCompiler {
    pub fn new(cache: Arc<ModuleCache>) -> Self {
        Self { cache }
    }
}

impl Compiler for ThemeCompiler {
    fn compile(&self, ctx: &BuildContext) -> impl Future<Output = Result<()>> {
        let ctx = ctx.clone();
        let cache = Arc::clone(&self.cache);
        async move {
            tokio::task::spawn_blocking(move || {
                compile_extension(&ctx.config, &ctx.package, &cache, ctx.quiet).map(|_| ())
            })
            .await
            .context("compile task aborted")?
        }
    }
}
