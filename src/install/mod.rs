//! Link the compiled package into the editor's extensions directory.
//!
//! ```text
//! ~/.vscode/extensions/acme.midnight  →  <root>/themes
//! ```

use std::{
    fs, io,
    future::Future,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use thiserror::Error;

use crate::config::ProjectConfig;
use crate::orchestrator::{BuildContext, Installer};
use crate::package::{self, PackageError, PackageMetadata};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("output directory `{0}` does not exist; compile the themes first")]
    NotCompiled(PathBuf),

    #[error("extensions directory `{0}` does not exist; is the editor installed?")]
    EditorMissing(PathBuf),

    #[error("`{0}` already exists and is not a symlink")]
    LinkExists(PathBuf),

    #[error("failed to link `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Package(#[from] PackageError),
}

impl InstallError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What [`install`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Linked,
    Relinked,
    AlreadyInstalled,
}

/// Create or refresh the extension link.
///
/// `silent` suppresses the "already installed" notice.
pub fn install(
    config: &ProjectConfig,
    package: &PackageMetadata,
    silent: bool,
) -> Result<InstallOutcome, InstallError> {
    let out_dir = config.out_dir();
    if !out_dir.is_dir() {
        return Err(InstallError::NotCompiled(out_dir));
    }

    let extensions_dir = &config.extensions_dir;
    if !extensions_dir.is_dir() {
        return Err(InstallError::EditorMissing(extensions_dir.clone()));
    }

    let target = out_dir
        .canonicalize()
        .map_err(|err| InstallError::io(&out_dir, err))?;
    let link = extensions_dir.join(package::link_name(config, package)?);
    crate::trace!("install"; "link path: {}", link.display());

    let display_name = package::display_name(config, package)?;

    let outcome = match fs::symlink_metadata(&link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::canonicalize(&link).ok().as_deref() == Some(target.as_path()) {
                if !silent {
                    crate::log!("install"; "{} already installed; skipping", display_name.blue());
                }
                return Ok(InstallOutcome::AlreadyInstalled);
            }
            remove_link(&link).map_err(|err| InstallError::io(&link, err))?;
            InstallOutcome::Relinked
        }
        Ok(_) => return Err(InstallError::LinkExists(link)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => InstallOutcome::Linked,
        Err(err) => return Err(InstallError::io(&link, err)),
    };

    symlink_dir(&target, &link).map_err(|err| InstallError::io(&link, err))?;
    crate::debug!("install"; "linked {} → {}", link.display(), target.display());
    crate::log!("install"; "{} installed", display_name.blue());

    Ok(outcome)
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_link(link: &Path) -> io::Result<()> {
    fs::remove_file(link)
}

#[cfg(windows)]
fn remove_link(link: &Path) -> io::Result<()> {
    fs::remove_dir(link)
}

// ============================================================================
// watch-session installer
// ============================================================================

/// [`Installer`] backed by [`install`], run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkInstaller;

impl Installer for LinkInstaller {
    fn install(&self, ctx: &BuildContext, silent: bool) -> impl Future<Output = Result<()>> {
        let ctx = ctx.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                install(&ctx.config, &ctx.package, silent)
                    .map(|_| ())
                    .map_err(anyhow::Error::from)
            })
            .await
            .context("install task aborted")?
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::package::{Author, PackageJson};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: ProjectConfig,
        package: PackageMetadata,
        link: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("themes")).unwrap();
        fs::create_dir_all(root.join("editor")).unwrap();

        let mut config = ProjectConfig::default();
        config.extensions_dir = root.join("editor");
        config.finalize(&root);

        let package = PackageMetadata::from_json(PackageJson {
            name: Some("midnight".into()),
            display_name: Some("Midnight".into()),
            author: Some(Author::Text("Acme".into())),
            ..Default::default()
        });

        let link = root.join("editor/acme.midnight");
        Fixture {
            _temp: temp,
            config,
            package,
            link,
        }
    }

    #[test]
    fn test_links_then_reports_installed() {
        let fx = fixture();
        assert_eq!(
            install(&fx.config, &fx.package, false).unwrap(),
            InstallOutcome::Linked
        );
        assert!(fs::symlink_metadata(&fx.link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::canonicalize(&fx.link).unwrap(),
            fx.config.out_dir().canonicalize().unwrap()
        );

        assert_eq!(
            install(&fx.config, &fx.package, true).unwrap(),
            InstallOutcome::AlreadyInstalled
        );
    }

    #[test]
    fn test_relinks_foreign_symlink() {
        let fx = fixture();
        let elsewhere = fx.config.get_root().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();
        symlink_dir(&elsewhere, &fx.link).unwrap();

        assert_eq!(
            install(&fx.config, &fx.package, true).unwrap(),
            InstallOutcome::Relinked
        );
        assert_eq!(
            fs::canonicalize(&fx.link).unwrap(),
            fx.config.out_dir().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_real_directory_is_link_exists() {
        let fx = fixture();
        fs::create_dir_all(&fx.link).unwrap();

        assert!(matches!(
            install(&fx.config, &fx.package, true),
            Err(InstallError::LinkExists(_))
        ));
    }

    #[test]
    fn test_missing_directories() {
        let fx = fixture();
        fs::remove_dir_all(fx.config.out_dir()).unwrap();
        assert!(matches!(
            install(&fx.config, &fx.package, true),
            Err(InstallError::NotCompiled(_))
        ));

        let mut fx = fixture();
        fx.config.extensions_dir = fx.config.get_root().join("nope");
        assert!(matches!(
            install(&fx.config, &fx.package, true),
            Err(InstallError::EditorMissing(_))
        ));
    }

    #[test]
    fn test_missing_author_is_package_error() {
        let mut fx = fixture();
        fx.package.json.author = None;
        assert!(matches!(
            install(&fx.config, &fx.package, true),
            Err(InstallError::Package(PackageError::MissingAuthor))
        ));
    }
}
