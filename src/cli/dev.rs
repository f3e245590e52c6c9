//! `vsct dev`: run the generated install script.

use std::ffi::OsStr;

use anyhow::{Result, bail};

use crate::compiler::INSTALL_SCRIPT;
use crate::config::{EXTENSIONS_DIR_ENV, ProjectConfig};
use crate::utils::exec::Cmd;

/// Run `install.sh` from the output directory with `VSCT_DEV=true`.
pub fn run_install_script(config: &ProjectConfig) -> Result<()> {
    let out_dir = config.out_dir();
    if !out_dir.is_dir() {
        bail!(
            "output directory `{}` does not exist; run `vsct compile` first",
            out_dir.display()
        );
    }

    let script = out_dir.join(INSTALL_SCRIPT);
    if !script.is_file() {
        bail!("`{}` is missing; run `vsct compile` again", script.display());
    }

    crate::debug!("dev"; "running {}", script.display());
    Cmd::new("sh")
        .arg(INSTALL_SCRIPT)
        .cwd(&out_dir)
        .envs([
            ("VSCT_DEV", OsStr::new("true")),
            (EXTENSIONS_DIR_ENV, config.extensions_dir.as_os_str()),
        ])
        .stream("dev")?;

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectConfig) {
        let temp = TempDir::new().unwrap();
        let mut config = ProjectConfig::default();
        config.extensions_dir = temp.path().join("extensions");
        config.finalize(temp.path());
        (temp, config)
    }

    #[test]
    fn test_missing_output_dir() {
        let (_temp, config) = project();
        let err = run_install_script(&config).unwrap_err();
        assert!(err.to_string().contains("vsct compile"));
    }

    #[test]
    fn test_missing_script() {
        let (_temp, config) = project();
        fs::create_dir_all(config.out_dir()).unwrap();
        let err = run_install_script(&config).unwrap_err();
        assert!(err.to_string().contains(INSTALL_SCRIPT));
    }

    #[test]
    fn test_script_sees_dev_environment() {
        let (temp, config) = project();
        fs::create_dir_all(config.out_dir()).unwrap();
        let marker = temp.path().join("marker");
        fs::write(
            config.out_dir().join(INSTALL_SCRIPT),
            format!(
                "[ \"$VSCT_DEV\" = true ] || exit 7\nprintf '%s' \"$VSCT_EXTENSIONS_DIR\" > '{}'\n",
                marker.display()
            ),
        )
        .unwrap();

        run_install_script(&config).unwrap();
        assert_eq!(
            fs::read_to_string(&marker).unwrap(),
            config.extensions_dir.display().to_string()
        );
    }

    #[test]
    fn test_failing_script_is_an_error() {
        let (_temp, config) = project();
        fs::create_dir_all(config.out_dir()).unwrap();
        fs::write(config.out_dir().join(INSTALL_SCRIPT), "echo boom >&2\nexit 3\n").unwrap();
        assert!(run_install_script(&config).is_err());
    }
}
