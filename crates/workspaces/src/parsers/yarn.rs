//! Yarn Classic (v1) `yarn.lock` parser.
//!
//! Entries are read with `yarn_lock_parser` where possible; a
//! line-oriented scan of the same file supplies the fields the crate
//! does not expose (resolved URL, integrity, the full descriptor list)
//! and doubles as a fallback when the crate fails or panics, which
//! happens on some valid v1 lockfiles.

use airlock_core::{Checksum, Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use crate::parsers::LockfileParser;
use crate::types::{DependencySource, LockfileEntry};

/// Parser for Yarn Classic `yarn.lock` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct YarnClassicLockfileParser;

/// A parsed `yarn.lock`: the pinned entries plus every descriptor the
/// lockfile satisfies, used to detect stale lockfiles.
#[derive(Debug, Clone)]
pub struct YarnLockfile {
    /// Pinned dependency entries.
    pub entries: Vec<LockfileEntry>,
    /// `(name, range)` pairs across all entry headers.
    descriptors: BTreeSet<(String, String)>,
}

impl YarnLockfile {
    /// Whether the lockfile pins a package for the given requested range.
    #[must_use]
    pub fn satisfies(&self, name: &str, range: &str) -> bool {
        self.descriptors
            .contains(&(name.to_string(), range.to_string()))
    }
}

impl YarnClassicLockfileParser {
    /// Parses a `yarn.lock`, keeping the descriptor list alongside the
    /// entries.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or an entry is missing the
    /// fields a hermetic fetch needs (version, resolved URL, integrity).
    pub fn parse_lockfile(&self, lockfile_path: &Path) -> Result<YarnLockfile> {
        let contents = fs::read_to_string(lockfile_path)
            .map_err(|source| Error::io_with_path(source, lockfile_path, "reading yarn.lock"))?;

        let blocks = scan_entry_blocks(&contents, lockfile_path)?;

        // yarn_lock_parser can panic on some valid lockfiles, so failures
        // of either kind fall back to the scanned blocks alone.
        let parsed = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            yarn_lock_parser::parse_str(&contents)
        }))
        .ok()
        .and_then(std::result::Result::ok)
        .map(|lockfile| {
            lockfile
                .entries
                .iter()
                .map(|entry| (entry.name.to_string(), entry.version.to_string()))
                .collect::<Vec<_>>()
        })
        .filter(|parsed| parsed.len() == blocks.len());

        let mut entries = Vec::new();
        let mut descriptors = BTreeSet::new();
        for (index, block) in blocks.iter().enumerate() {
            let (name, version) = match parsed.as_ref().and_then(|p| p.get(index)) {
                Some((name, version)) => (name.clone(), version.clone()),
                None => {
                    let name = block.primary_name(lockfile_path)?;
                    let version = block.version.clone().ok_or_else(|| {
                        Error::lockfile_parse_failed(
                            lockfile_path,
                            format!("missing version for \"{name}\""),
                        )
                    })?;
                    (name, version)
                }
            };

            entries.push(block.to_entry(&name, version, lockfile_path)?);
            for descriptor in &block.descriptors {
                descriptors.insert(descriptor.clone());
            }
        }

        Ok(YarnLockfile {
            entries,
            descriptors,
        })
    }
}

impl LockfileParser for YarnClassicLockfileParser {
    fn parse(&self, lockfile_path: &Path) -> Result<Vec<LockfileEntry>> {
        self.parse_lockfile(lockfile_path).map(|l| l.entries)
    }

    fn lockfile_name(&self) -> &'static str {
        "yarn.lock"
    }
}

/// One `yarn.lock` entry block as scanned from the file.
#[derive(Debug, Default)]
struct EntryBlock {
    descriptors: Vec<(String, String)>,
    version: Option<String>,
    resolved: Option<String>,
    integrity: Option<String>,
}

impl EntryBlock {
    fn primary_name(&self, path: &Path) -> Result<String> {
        self.descriptors
            .first()
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::lockfile_parse_failed(path, "entry without descriptors"))
    }

    fn to_entry(&self, name: &str, version: String, path: &Path) -> Result<LockfileEntry> {
        let source = self.source(name, path)?;
        let checksums = match (&self.integrity, &source) {
            (Some(integrity), _) => vec![Checksum::parse_sri(integrity)?],
            (None, DependencySource::Registry { .. }) => {
                return Err(Error::lockfile_parse_failed(
                    path,
                    format!("missing integrity checksum for \"{name}\""),
                ));
            }
            (None, _) => Vec::new(),
        };

        Ok(LockfileEntry {
            name: name.to_string(),
            version: Some(version),
            source,
            checksums,
            dev: false,
        })
    }

    fn source(&self, name: &str, path: &Path) -> Result<DependencySource> {
        if let Some(resolved) = &self.resolved {
            if resolved.starts_with("git+") || resolved.starts_with("git://") {
                return Err(Error::lockfile_parse_failed(
                    path,
                    format!("git dependencies are not supported: \"{name}\" resolves to {resolved}"),
                ));
            }
            if resolved.starts_with("http://")
                || resolved.starts_with("https://")
                || resolved.starts_with("file://")
            {
                return Ok(DependencySource::Registry {
                    url: resolved.clone(),
                });
            }
            if let Some(local) = resolved.strip_prefix("file:") {
                return Ok(DependencySource::File {
                    path: PathBuf::from(local),
                });
            }
            return Err(Error::lockfile_parse_failed(
                path,
                format!("unsupported resolved URL for \"{name}\": {resolved}"),
            ));
        }

        // Entries without a resolved URL are local: `file:` ranges point
        // at paths in the repository, `link:` ranges at workspace members.
        for (_, range) in &self.descriptors {
            if let Some(local) = range.strip_prefix("file:") {
                return Ok(DependencySource::File {
                    path: PathBuf::from(local),
                });
            }
            if range.starts_with("link:") {
                return Ok(DependencySource::Workspace);
            }
        }

        Err(Error::lockfile_parse_failed(
            path,
            format!("missing resolved URL for \"{name}\""),
        ))
    }
}

/// Scans the line-oriented v1 format into entry blocks.
fn scan_entry_blocks(contents: &str, path: &Path) -> Result<Vec<EntryBlock>> {
    let mut blocks = Vec::new();
    let mut current: Option<EntryBlock> = None;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(block) = current.as_mut() {
                if let Some(version) = trimmed.strip_prefix("version ") {
                    block.version = Some(version.trim_matches('"').to_string());
                } else if let Some(resolved) = trimmed.strip_prefix("resolved ") {
                    block.resolved = Some(resolved.trim_matches('"').to_string());
                } else if let Some(integrity) = trimmed.strip_prefix("integrity ") {
                    block.integrity = Some(integrity.trim_matches('"').to_string());
                }
            }
            continue;
        }

        // A non-indented line opens a new entry: comma-separated
        // descriptors, optionally quoted, ending with ':'.
        if let Some(block) = current.take() {
            blocks.push(block);
        }
        let header = trimmed.trim_end_matches(':');
        let mut descriptors = Vec::new();
        for raw in header.split(',') {
            let descriptor = raw.trim().trim_matches('"');
            if !descriptor.is_empty() {
                descriptors.push(split_descriptor(descriptor, path)?);
            }
        }
        if descriptors.is_empty() {
            return Err(Error::lockfile_parse_failed(
                path,
                format!("invalid entry header: {trimmed}"),
            ));
        }
        current = Some(EntryBlock {
            descriptors,
            ..EntryBlock::default()
        });
    }

    if let Some(block) = current.take() {
        blocks.push(block);
    }
    Ok(blocks)
}

/// Splits `name@range` at the separator, keeping `@scope/` prefixes with
/// the name.
fn split_descriptor(descriptor: &str, path: &Path) -> Result<(String, String)> {
    let at = if let Some(rest) = descriptor.strip_prefix('@') {
        rest.find('@').map(|i| i + 1)
    } else {
        descriptor.find('@')
    };
    match at {
        Some(index) if index > 0 && index < descriptor.len() - 1 => Ok((
            descriptor[..index].to_string(),
            descriptor[index + 1..].to_string(),
        )),
        _ => Err(Error::lockfile_parse_failed(
            path,
            format!("invalid dependency descriptor: {descriptor}"),
        )),
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

    fn parse(contents: &str) -> Result<YarnLockfile> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        YarnClassicLockfileParser.parse_lockfile(file.path())
    }

    #[test]
    fn parses_basic_yarn_lock() {
        let lock = format!(
            r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1

left-pad@^1.3.0:
  version "1.3.0"
  resolved "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz"
  integrity {integrity}

react@^18.0.0:
  version "18.2.0"
  resolved "https://registry.yarnpkg.com/react/-/react-18.2.0.tgz"
  integrity {integrity}
  dependencies:
    loose-envify "^1.1.0"
"#,
            integrity = sha512_integrity()
        );

        let lockfile = parse(&lock).unwrap();
        assert_eq!(lockfile.entries.len(), 2);

        let left_pad = lockfile
            .entries
            .iter()
            .find(|e| e.name == "left-pad")
            .unwrap();
        assert_eq!(left_pad.version.as_deref(), Some("1.3.0"));
        assert!(matches!(left_pad.source, DependencySource::Registry { .. }));
        assert_eq!(left_pad.checksums.len(), 1);
        assert!(!left_pad.dev);

        assert!(lockfile.satisfies("left-pad", "^1.3.0"));
        assert!(lockfile.satisfies("react", "^18.0.0"));
        assert!(!lockfile.satisfies("left-pad", "^2.0.0"));
    }

    #[test]
    fn parses_scoped_packages() {
        let lock = format!(
            r#"# yarn lockfile v1

"@babel/core@^7.22.0":
  version "7.22.5"
  resolved "https://registry.yarnpkg.com/@babel/core/-/core-7.22.5.tgz"
  integrity {integrity}
"#,
            integrity = sha512_integrity()
        );

        let lockfile = parse(&lock).unwrap();
        assert_eq!(lockfile.entries.len(), 1);
        assert_eq!(lockfile.entries[0].name, "@babel/core");
        assert!(lockfile.satisfies("@babel/core", "^7.22.0"));
    }

    #[test]
    fn records_every_descriptor_of_an_entry() {
        let lock = format!(
            r#"# yarn lockfile v1

left-pad@^1.3.0, left-pad@~1.3.0:
  version "1.3.0"
  resolved "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz"
  integrity {integrity}
"#,
            integrity = sha512_integrity()
        );

        let lockfile = parse(&lock).unwrap();
        assert_eq!(lockfile.entries.len(), 1);
        assert!(lockfile.satisfies("left-pad", "^1.3.0"));
        assert!(lockfile.satisfies("left-pad", "~1.3.0"));
    }

    #[test]
    fn file_dependencies_need_no_download() {
        let lock = r#"# yarn lockfile v1

"local-lib@file:./vendor/local-lib":
  version "1.0.0"
"#;
        let lockfile = parse(lock).unwrap();
        assert_eq!(
            lockfile.entries[0].source,
            DependencySource::File {
                path: PathBuf::from("./vendor/local-lib")
            }
        );
        assert!(lockfile.entries[0].checksums.is_empty());
    }

    #[test]
    fn link_dependencies_are_workspace_members() {
        let lock = r#"# yarn lockfile v1

"shared@link:packages/shared":
  version "0.0.0"
"#;
        let lockfile = parse(lock).unwrap();
        assert_eq!(lockfile.entries[0].source, DependencySource::Workspace);
    }

    #[test]
    fn registry_entry_without_integrity_is_rejected() {
        let lock = r#"# yarn lockfile v1

left-pad@^1.3.0:
  version "1.3.0"
  resolved "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz"
"#;
        let err = parse(lock).unwrap_err();
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
        let lock = r#"# yarn lockfile v1

some-fork@acme/some-fork:
  version "1.0.0"
  resolved "git+https://github.com/acme/some-fork.git#abc123"
"#;
        let err = parse(lock).unwrap_err();
        assert!(err.to_string().contains("git dependencies"));
    }

    #[test]
    fn registry_url_keeps_legacy_hash_fragment() {
        let lock = format!(
            r#"# yarn lockfile v1

left-pad@^1.3.0:
  version "1.3.0"
  resolved "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz#5b8a3a7765dfe001026baandb91"
  integrity {integrity}
"#,
            integrity = sha512_integrity()
        );
        let lockfile = parse(&lock).unwrap();
        match &lockfile.entries[0].source {
            DependencySource::Registry { url } => assert!(url.contains('#')),
            other => panic!("unexpected source: {other:?}"),
        }
    }
}
