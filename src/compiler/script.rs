//! `install.sh` shipped inside the compiled package.
//!
//! The script links the package directory into the editor's extensions
//! directory without needing this tool installed. `vsct dev` runs it.

use anyhow::{Context, Result};
use std::{fs, path::Path};

/// File name of the install script inside the output directory.
pub const INSTALL_SCRIPT: &str = "install.sh";

/// Quote `value` for a POSIX shell single-quoted literal.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render the install script for a package linked as `link_name`.
pub fn render(link_name: &str, display_name: &str) -> String {
    let link = shell_quote(link_name);
    let display = shell_quote(display_name);

    format!(
        r#"#!/bin/sh
# Links this extension into the editor's extensions directory.
set -eu

here="$(cd "$(dirname "$0")" && pwd -P)"
dir="${{VSCT_EXTENSIONS_DIR:-$HOME/.vscode/extensions}}"
link="$dir/"{link}
name={display}

if [ ! -d "$dir" ]; then
  echo "extensions directory $dir does not exist" >&2
  exit 1
fi

if [ -L "$link" ]; then
  if [ "$(cd "$link" 2>/dev/null && pwd -P)" = "$here" ]; then
    echo "$name already installed"
    exit 0
  fi
  rm "$link"
elif [ -e "$link" ]; then
  echo "$link exists and is not a symlink" >&2
  exit 1
fi

ln -s "$here" "$link"
echo "$name installed"

if [ "${{VSCT_DEV:-}}" = "true" ]; then
  echo "reload the editor window to apply changes"
fi
"#
    )
}

/// Write the script to `out_dir` and mark it executable.
pub fn write(out_dir: &Path, link_name: &str, display_name: &str) -> Result<()> {
    let path = out_dir.join(INSTALL_SCRIPT);
    fs::write(&path, render(link_name, display_name))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to mark {} executable", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_render_embeds_names() {
        let script = render("acme.midnight", "Acme's Midnight");
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains(r#"link="$dir/"'acme.midnight'"#));
        assert!(script.contains(r"name='Acme'\''s Midnight'"));
        assert!(script.contains("${VSCT_EXTENSIONS_DIR:-$HOME/.vscode/extensions}"));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        write(temp.path(), "a.b", "B").unwrap();
        let mode = fs::metadata(temp.path().join(INSTALL_SCRIPT))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
