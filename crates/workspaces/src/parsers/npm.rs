//! npm `package-lock.json` parser (lockfileVersion 2 and 3).
//!
//! Both supported versions carry the flat `packages` map keyed by path
//! from the project root. Entries under a `node_modules/` path are
//! external dependencies; other paths are the project root (`""`) and
//! workspace members, which nothing needs to download.

use airlock_core::{Checksum, Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::parsers::LockfileParser;
use crate::types::{DependencySource, LockfileEntry};

/// Parser for npm `package-lock.json` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmLockfileParser;

impl LockfileParser for NpmLockfileParser {
    fn parse(&self, lockfile_path: &Path) -> Result<Vec<LockfileEntry>> {
        let contents = fs::read_to_string(lockfile_path).map_err(|source| {
            Error::io_with_path(source, lockfile_path, "reading package-lock.json")
        })?;

        let lockfile: PackageLock = serde_json::from_str(&contents)
            .map_err(|source| Error::lockfile_parse_failed(lockfile_path, source.to_string()))?;

        if !matches!(lockfile.lockfile_version, 2 | 3) {
            return Err(Error::lockfile_parse_failed(
                lockfile_path,
                format!(
                    "unsupported lockfileVersion {}, expected 2 or 3",
                    lockfile.lockfile_version
                ),
            ));
        }

        let project_name = lockfile.name.as_deref().unwrap_or("project");

        let mut entries = Vec::new();
        for (pkg_path, pkg_entry) in &lockfile.packages {
            let entry = entry_from_package(lockfile_path, pkg_path, pkg_entry, project_name)?;
            if let Some(entry) = entry {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn lockfile_name(&self) -> &'static str {
        "package-lock.json"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageLock {
    #[serde(default)]
    lockfile_version: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    packages: BTreeMap<String, PackageEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    resolved: Option<String>,
    #[serde(default)]
    integrity: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    link: bool,
    #[serde(default)]
    in_bundle: bool,
}

fn entry_from_package(
    lockfile_path: &Path,
    pkg_path: &str,
    pkg_entry: &PackageEntry,
    project_name: &str,
) -> Result<Option<LockfileEntry>> {
    // Symlink entries point at a workspace member that has its own
    // entry under its real path.
    if pkg_entry.link {
        return Ok(None);
    }

    let name = infer_package_name(pkg_path, pkg_entry, project_name);

    // The root ("") and paths outside node_modules are the project and
    // its workspace members.
    if pkg_path.is_empty()
        || (!pkg_path.starts_with("node_modules/") && !pkg_path.contains("/node_modules/"))
    {
        return Ok(Some(LockfileEntry {
            name,
            version: pkg_entry.version.clone(),
            source: DependencySource::Workspace,
            checksums: Vec::new(),
            dev: pkg_entry.dev,
        }));
    }

    let version = pkg_entry.version.clone().ok_or_else(|| {
        Error::lockfile_parse_failed(
            lockfile_path,
            format!("missing version for package entry \"{pkg_path}\""),
        )
    })?;

    let source = match pkg_entry.resolved.as_deref() {
        None if pkg_entry.in_bundle => DependencySource::Bundled,
        None => {
            return Err(Error::lockfile_parse_failed(
                lockfile_path,
                format!("missing resolved URL for package entry \"{pkg_path}\""),
            ));
        }
        Some(resolved) if resolved.starts_with("git+") || resolved.starts_with("git://") => {
            return Err(Error::lockfile_parse_failed(
                lockfile_path,
                format!("git dependencies are not supported: \"{name}\" resolves to {resolved}"),
            ));
        }
        // A full file:// URL is fetchable like any other URL; the bare
        // file: prefix marks a path inside the repository.
        Some(resolved)
            if resolved.starts_with("http://")
                || resolved.starts_with("https://")
                || resolved.starts_with("file://") =>
        {
            DependencySource::Registry {
                url: resolved.to_string(),
            }
        }
        Some(resolved) if resolved.starts_with("file:") => DependencySource::File {
            path: PathBuf::from(resolved.trim_start_matches("file:")),
        },
        Some(resolved) => {
            return Err(Error::lockfile_parse_failed(
                lockfile_path,
                format!("unsupported resolved URL for \"{name}\": {resolved}"),
            ));
        }
    };

    let checksums = match (&pkg_entry.integrity, &source) {
        (Some(integrity), _) => vec![Checksum::parse_sri(integrity)?],
        (None, DependencySource::Registry { .. }) => {
            return Err(Error::lockfile_parse_failed(
                lockfile_path,
                format!("missing integrity checksum for \"{name}\""),
            ));
        }
        (None, _) => Vec::new(),
    };

    Ok(Some(LockfileEntry {
        name,
        version: Some(version),
        source,
        checksums,
        dev: pkg_entry.dev,
    }))
}

/// Package name for a lockfile entry, from the explicit field when
/// present or from the path after the last `node_modules/` otherwise.
fn infer_package_name(pkg_path: &str, pkg_entry: &PackageEntry, project_name: &str) -> String {
    if let Some(name) = &pkg_entry.name {
        return name.clone();
    }
    if pkg_path.is_empty() {
        return project_name.to_string();
    }
    match pkg_path.rsplit_once("node_modules/") {
        // Keeps scoped names like "@scope/pkg" intact.
        Some((_, after)) => after.to_string(),
        None => pkg_path.rsplit('/').next().unwrap_or(pkg_path).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sha512_integrity() -> String {
        // base64 of 64 zero bytes
        format!("sha512-{}==", "A".repeat(86))
    }

    fn parse(json: &str) -> Result<Vec<LockfileEntry>> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        NpmLockfileParser.parse(file.path())
    }

    #[test]
    fn parses_basic_v3_lockfile() {
        let json = format!(
            r#"{{
  "name": "acme-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {{
    "": {{
      "name": "acme-app",
      "version": "1.0.0",
      "dependencies": {{ "left-pad": "^1.3.0" }}
    }},
    "node_modules/left-pad": {{
      "version": "1.3.0",
      "resolved": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
      "integrity": "{integrity}"
    }}
  }}
}}"#,
            integrity = sha512_integrity()
        );

        let entries = parse(&json).unwrap();
        assert_eq!(entries.len(), 2);

        let root = entries
            .iter()
            .find(|e| e.source == DependencySource::Workspace)
            .unwrap();
        assert_eq!(root.name, "acme-app");
        assert_eq!(root.version.as_deref(), Some("1.0.0"));

        let dep = entries.iter().find(|e| e.name == "left-pad").unwrap();
        assert_eq!(dep.version.as_deref(), Some("1.3.0"));
        assert!(matches!(dep.source, DependencySource::Registry { .. }));
        assert_eq!(dep.checksums.len(), 1);
        assert!(!dep.dev);
    }

    #[test]
    fn accepts_lockfile_version_2() {
        let json = format!(
            r#"{{
  "lockfileVersion": 2,
  "packages": {{
    "": {{ "name": "app" }},
    "node_modules/left-pad": {{
      "version": "1.3.0",
      "resolved": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
      "integrity": "{integrity}"
    }}
  }}
}}"#,
            integrity = sha512_integrity()
        );
        assert_eq!(parse(&json).unwrap().len(), 2);
    }

    #[test]
    fn rejects_lockfile_version_1() {
        let err = parse(r#"{"lockfileVersion": 1, "packages": {}}"#).unwrap_err();
        match err {
            Error::LockfileParseFailed { message, .. } => {
                assert!(message.contains("lockfileVersion"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn workspace_member_paths_become_workspace_entries() {
        let json = format!(
            r#"{{
  "name": "monorepo",
  "lockfileVersion": 3,
  "packages": {{
    "": {{ "name": "monorepo", "version": "1.0.0" }},
    "packages/app": {{ "name": "app", "version": "0.1.0" }},
    "node_modules/app": {{ "resolved": "packages/app", "link": true }},
    "packages/app/node_modules/react": {{
      "version": "18.2.0",
      "resolved": "https://registry.npmjs.org/react/-/react-18.2.0.tgz",
      "integrity": "{integrity}"
    }}
  }}
}}"#,
            integrity = sha512_integrity()
        );

        let entries = parse(&json).unwrap();
        // The link entry is skipped; root, member, and react remain.
        assert_eq!(entries.len(), 3);

        let member = entries.iter().find(|e| e.name == "app").unwrap();
        assert_eq!(member.source, DependencySource::Workspace);

        let react = entries.iter().find(|e| e.name == "react").unwrap();
        assert!(matches!(react.source, DependencySource::Registry { .. }));
    }

    #[test]
    fn dev_flag_is_carried_through() {
        let json = format!(
            r#"{{
  "lockfileVersion": 3,
  "packages": {{
    "": {{ "name": "app" }},
    "node_modules/jest": {{
      "version": "29.0.0",
      "resolved": "https://registry.npmjs.org/jest/-/jest-29.0.0.tgz",
      "integrity": "{integrity}",
      "dev": true
    }}
  }}
}}"#,
            integrity = sha512_integrity()
        );

        let entries = parse(&json).unwrap();
        let jest = entries.iter().find(|e| e.name == "jest").unwrap();
        assert!(jest.dev);
    }

    #[test]
    fn missing_integrity_on_registry_entry_is_rejected() {
        let json = r#"{
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "app" },
    "node_modules/left-pad": {
      "version": "1.3.0",
      "resolved": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz"
    }
  }
}"#;
        let err = parse(json).unwrap_err();
        match err {
            Error::LockfileParseFailed { message, .. } => {
                assert!(message.contains("left-pad"));
                assert!(message.contains("integrity"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn git_dependencies_are_rejected() {
        let json = r#"{
  "lockfileVersion": 3,
  "packages": {
    "node_modules/some-fork": {
      "version": "1.0.0",
      "resolved": "git+ssh://git@github.com/acme/some-fork.git#abc123"
    }
  }
}"#;
        let err = parse(json).unwrap_err();
        assert!(err.to_string().contains("git dependencies"));
    }

    #[test]
    fn bundled_entries_need_no_download() {
        let json = r#"{
  "lockfileVersion": 3,
  "packages": {
    "node_modules/fsevents/node_modules/inner": {
      "version": "2.0.0",
      "inBundle": true
    }
  }
}"#;
        let entries = parse(json).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, DependencySource::Bundled);
        assert!(entries[0].checksums.is_empty());
    }

    #[test]
    fn sha1_only_integrity_is_rejected() {
        // base64 of 20 zero bytes
        let sha1 = format!("sha1-{}=", "A".repeat(27));
        let json = format!(
            r#"{{
  "lockfileVersion": 3,
  "packages": {{
    "node_modules/old-pkg": {{
      "version": "0.1.0",
      "resolved": "https://registry.npmjs.org/old-pkg/-/old-pkg-0.1.0.tgz",
      "integrity": "{sha1}"
    }}
  }}
}}"#
        );
        let err = parse(&json).unwrap_err();
        assert!(matches!(err, Error::InvalidChecksum { .. }));
    }

    #[test]
    fn scoped_names_are_derived_from_paths() {
        let json = format!(
            r#"{{
  "lockfileVersion": 3,
  "packages": {{
    "node_modules/@babel/core": {{
      "version": "7.22.5",
      "resolved": "https://registry.npmjs.org/@babel/core/-/core-7.22.5.tgz",
      "integrity": "{integrity}"
    }}
  }}
}}"#,
            integrity = sha512_integrity()
        );
        let entries = parse(&json).unwrap();
        assert_eq!(entries[0].name, "@babel/core");
    }

    #[test]
    fn local_file_dependencies_are_kept_without_download() {
        let json = r#"{
  "lockfileVersion": 3,
  "packages": {
    "node_modules/local-lib": {
      "version": "1.0.0",
      "resolved": "file:vendor/local-lib"
    }
  }
}"#;
        let entries = parse(json).unwrap();
        assert_eq!(
            entries[0].source,
            DependencySource::File {
                path: PathBuf::from("vendor/local-lib")
            }
        );
    }
}
