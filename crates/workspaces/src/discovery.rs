//! Workspace discovery.
//!
//! Expands the glob patterns declared in a project's `package.json`
//! against the source directory and returns the matching workspace
//! members. Matches are constrained to the project root: a pattern or a
//! symlinked directory that reaches outside it fails the whole request.

use airlock_core::{Error, Result, RootedPath};
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::manifest::PackageJson;
use crate::types::Workspace;

/// Directories never considered during discovery.
const PRUNED_DIRS: &[&str] = &["node_modules", ".git"];

/// Resolves workspace members declared by the manifest at the root of
/// `source_dir`.
///
/// Returns an empty list when the manifest declares no workspaces or
/// declares them in a shape airlock does not understand (the latter is
/// logged as a warning). Matched directories without a `package.json`
/// are skipped.
///
/// # Errors
///
/// Fails when the root manifest is missing or malformed, when a member
/// manifest is malformed, or when a match resolves outside the project
/// root.
pub fn extract_workspace_metadata(source_dir: &RootedPath) -> Result<Vec<Workspace>> {
    let manifest_path = source_dir.path().join("package.json");
    let manifest = PackageJson::load(&manifest_path)?;

    let Some(declaration) = manifest.workspaces.as_ref() else {
        return Ok(Vec::new());
    };
    let Some(patterns) = declaration.normalize() else {
        warn!(
            manifest = %manifest_path.display(),
            "unsupported workspaces declaration shape, resolving no workspaces"
        );
        return Ok(Vec::new());
    };

    let mut workspaces = Vec::new();
    for dir in resolve_glob_patterns(source_dir, patterns)? {
        let member_manifest_path = dir.join("package.json");
        if !member_manifest_path.is_file() {
            debug!(path = %dir.display(), "workspace match has no package.json, skipping");
            continue;
        }
        let relative = dir.strip_prefix(source_dir.path()).unwrap_or(&dir);
        let path = source_dir.join_within_root(relative)?;
        let manifest = PackageJson::load(&member_manifest_path)?;
        workspaces.push(Workspace { path, manifest });
    }
    Ok(workspaces)
}

/// Expands workspace glob patterns to directories under `root`.
///
/// Patterns prefixed with `!` exclude matches. Every pattern is first
/// anchored inside the root, so a pattern that points outside it (for
/// example `../sibling/*`) fails with [`Error::PathOutsideRoot`] rather
/// than silently matching nothing. Results are absolute, deduplicated,
/// and sorted.
pub fn resolve_glob_patterns(root: &RootedPath, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let (includes, excludes) = compile_patterns(root, patterns)?;
    if includes.is_empty() {
        return Ok(Vec::new());
    }

    let mut matched = BTreeSet::new();
    let walker = WalkDir::new(root.path())
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_pruned_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%error, "skipping unreadable directory entry");
                continue;
            }
        };
        if entry.path() == root.path() {
            continue;
        }
        // is_dir() follows symlinks so that symlinked members surface
        // here and get containment-checked by the caller.
        if !entry.path().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root.path()) else {
            continue;
        };
        if excludes.iter().any(|pattern| pattern.matches_path(relative)) {
            continue;
        }
        if includes.iter().any(|pattern| pattern.matches_path(relative)) {
            matched.insert(entry.path().to_path_buf());
        }
    }

    Ok(matched.into_iter().collect())
}

/// Splits raw patterns into compiled include and exclude lists, anchoring
/// each one inside the root first.
fn compile_patterns(root: &RootedPath, patterns: &[String]) -> Result<(Vec<Pattern>, Vec<Pattern>)> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();

    for raw in patterns {
        let (negated, text) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };
        if text.is_empty() {
            continue;
        }

        let anchored = root.join_within_root(text)?;
        let relative = anchored.subpath_from_root().to_string_lossy().into_owned();
        let compiled = Pattern::new(&relative).map_err(|source| {
            Error::invalid_manifest(
                root.path().join("package.json"),
                format!("invalid workspaces pattern \"{raw}\": {source}"),
            )
        })?;

        if negated {
            excludes.push(compiled);
        } else {
            includes.push(compiled);
        }
    }

    Ok((includes, excludes))
}

fn is_pruned_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PRUNED_DIRS.contains(&name))
}
