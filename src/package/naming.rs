//! Extension naming rules.
//!
//! Names fall back from `vsct.toml` to `package.json`:
//!
//! | Value        | Sources, in order                                   |
//! |--------------|-----------------------------------------------------|
//! | name         | config `name`, unscoped package name                |
//! | display name | config `display_name`, `displayName`, name          |
//! | author       | `author.name`, package scope                        |
//! | link         | `to_directory_name("{author}.{name}")`              |

use super::{PackageError, PackageMetadata};
use crate::config::ProjectConfig;
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:@(?<scope>.*)/)?(?<name>.*)$").unwrap());

/// An npm package name split into scope and bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageName {
    pub scope: Option<String>,
    pub name: String,
}

/// Split `@scope/name` into its parts; unscoped names have no scope.
pub fn parse_package_name(full_name: &str) -> Result<PackageName, PackageError> {
    let caps = PACKAGE_NAME
        .captures(full_name)
        .ok_or_else(|| PackageError::InvalidName(full_name.to_string()))?;

    let scope = caps
        .name("scope")
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let name = caps
        .name("name")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    Ok(PackageName { scope, name })
}

/// Reduce `input` to a directory-safe name.
///
/// Keeps whitespace, ASCII word characters, `.` and `-`; whitespace becomes
/// `-`; the result is lowercased.
pub fn to_directory_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_whitespace() || c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .map(|c| if c.is_whitespace() { '-' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Extension name: config override, else the unscoped package name.
pub fn extension_name(config: &ProjectConfig, package: &PackageMetadata) -> Result<String, PackageError> {
    if let Some(name) = config.name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    match package.json.name.as_deref() {
        Some(full) if !full.is_empty() => {
            let parsed = parse_package_name(full)?;
            if parsed.name.is_empty() {
                Err(PackageError::MissingName)
            } else {
                Ok(parsed.name)
            }
        }
        _ => Err(PackageError::MissingName),
    }
}

/// Display name: config override, else `displayName`, else the extension name.
pub fn display_name(config: &ProjectConfig, package: &PackageMetadata) -> Result<String, PackageError> {
    if let Some(name) = config.display_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    if let Some(name) = package.json.display_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    let name = extension_name(config, package)?;
    crate::warn!(
        "package";
        "no `displayName` in vsct.toml or package.json, falling back to `{}`",
        name
    );
    Ok(name)
}

/// Publisher: `author.name`, else the package scope.
pub fn author(package: &PackageMetadata) -> Result<String, PackageError> {
    if let Some(name) = package.json.author.as_ref().and_then(|a| a.name()) {
        return Ok(name.to_string());
    }

    package
        .json
        .name
        .as_deref()
        .map(parse_package_name)
        .transpose()?
        .and_then(|parsed| parsed.scope)
        .ok_or(PackageError::MissingAuthor)
}

/// Directory name of the link inside the editor's extensions directory.
pub fn link_name(config: &ProjectConfig, package: &PackageMetadata) -> Result<String, PackageError> {
    let author = author(package)?;
    let name = extension_name(config, package)?;
    Ok(to_directory_name(&format!("{author}.{name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Author, PackageJson};

    fn package(name: Option<&str>, author: Option<Author>) -> PackageMetadata {
        PackageMetadata::from_json(PackageJson {
            name: name.map(str::to_string),
            author,
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_package_name() {
        assert_eq!(
            parse_package_name("@acme/midnight").unwrap(),
            PackageName {
                scope: Some("acme".into()),
                name: "midnight".into()
            }
        );
        assert_eq!(parse_package_name("midnight").unwrap().scope, None);
        assert_eq!(parse_package_name("@/bare").unwrap().scope, None);
        assert!(parse_package_name("bad\nname").is_err());
    }

    #[test]
    fn test_to_directory_name() {
        assert_eq!(to_directory_name("Acme Corp.Midnight Blue"), "acme-corp.midnight-blue");
        assert_eq!(to_directory_name("we!rd@name_v2"), "werdname_v2");
        assert_eq!(to_directory_name("tab\tsep"), "tab-sep");
    }

    #[test]
    fn test_extension_name_precedence() {
        let mut config = ProjectConfig::default();
        let pkg = package(Some("@acme/midnight"), None);
        assert_eq!(extension_name(&config, &pkg).unwrap(), "midnight");

        config.name = Some("override".into());
        assert_eq!(extension_name(&config, &pkg).unwrap(), "override");

        let empty = package(None, None);
        assert!(matches!(
            extension_name(&ProjectConfig::default(), &empty),
            Err(PackageError::MissingName)
        ));
    }

    #[test]
    fn test_display_name_falls_back() {
        let config = ProjectConfig::default();
        let mut pkg = package(Some("midnight"), None);
        assert_eq!(display_name(&config, &pkg).unwrap(), "midnight");

        pkg.json.display_name = Some("Midnight".into());
        assert_eq!(display_name(&config, &pkg).unwrap(), "Midnight");
    }

    #[test]
    fn test_author_precedence() {
        let scoped = package(Some("@acme/midnight"), None);
        assert_eq!(author(&scoped).unwrap(), "acme");

        let named = package(Some("@acme/midnight"), Some(Author::Text("Jane <j@x.io>".into())));
        assert_eq!(author(&named).unwrap(), "Jane");

        let anonymous = package(Some("midnight"), None);
        assert!(matches!(author(&anonymous), Err(PackageError::MissingAuthor)));
    }

    #[test]
    fn test_link_name() {
        let pkg = package(Some("@acme/midnight"), Some(Author::Text("Acme Corp".into())));
        assert_eq!(link_name(&ProjectConfig::default(), &pkg).unwrap(), "acme-corp.midnight");
    }
}
