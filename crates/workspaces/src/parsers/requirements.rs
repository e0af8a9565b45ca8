//! Pinned `requirements.txt` parser.
//!
//! The pip backend only accepts requirements it can fetch and verify
//! without talking to an index: the direct-URL form
//! `name @ https://... --hash=sha256:...`. Checksums come from `--hash`
//! options or, failing that, from a `#sha256=...` URL fragment. Editable
//! installs, nested requirements files, and `name==version` pins that
//! would need index resolution are rejected.

use airlock_core::{Algorithm, Checksum, Error, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::parsers::LockfileParser;
use crate::types::{DependencySource, LockfileEntry};

/// Parser for pinned `requirements.txt` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequirementsParser;

impl LockfileParser for RequirementsParser {
    fn parse(&self, lockfile_path: &Path) -> Result<Vec<LockfileEntry>> {
        let contents = fs::read_to_string(lockfile_path).map_err(|source| {
            Error::io_with_path(source, lockfile_path, "reading requirements.txt")
        })?;

        let mut entries = Vec::new();
        for line in logical_lines(&contents) {
            if let Some(entry) = parse_requirement(&line, lockfile_path)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn lockfile_name(&self) -> &'static str {
        "requirements.txt"
    }
}

/// Joins backslash continuations and strips comments, yielding one
/// logical requirement per item.
fn logical_lines(contents: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();

    for raw in contents.lines() {
        let without_comment = strip_comment(raw);
        let trimmed = without_comment.trim_end();
        if let Some(continued) = trimmed.strip_suffix('\\') {
            pending.push_str(continued);
            pending.push(' ');
            continue;
        }
        pending.push_str(trimmed);
        let logical = pending.trim().to_string();
        pending.clear();
        if !logical.is_empty() {
            lines.push(logical);
        }
    }
    if !pending.trim().is_empty() {
        lines.push(pending.trim().to_string());
    }
    lines
}

/// Cuts a `#` comment when it starts the line or follows whitespace, so
/// URL fragments survive.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (index, ch) in line.char_indices() {
        if ch == '#' && previous.is_none_or(char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(ch);
    }
    line
}

fn parse_requirement(line: &str, path: &Path) -> Result<Option<LockfileEntry>> {
    if line.starts_with('-') {
        return handle_option_line(line, path);
    }

    // Environment markers follow the requirement after " ;".
    let line = line.split(" ;").next().unwrap_or(line);

    let mut checksums = Vec::new();
    let mut requirement = String::new();
    for token in line.split_whitespace() {
        if let Some(value) = token.strip_prefix("--hash=") {
            checksums.push(Checksum::parse(value)?);
        } else {
            if !requirement.is_empty() {
                requirement.push(' ');
            }
            requirement.push_str(token);
        }
    }

    let Some((name_part, url)) = requirement.split_once('@') else {
        let message = if requirement.contains("==") {
            format!(
                "\"{requirement}\" needs index resolution; only direct URL requirements \
                 (name @ url --hash=...) are supported"
            )
        } else {
            format!("unsupported requirement \"{requirement}\"")
        };
        return Err(Error::lockfile_parse_failed(path, message));
    };

    let name = canonicalize_name(name_part.trim().split('[').next().unwrap_or("").trim());
    if name.is_empty() {
        return Err(Error::lockfile_parse_failed(
            path,
            format!("requirement \"{requirement}\" has no package name"),
        ));
    }

    let url = url.trim().to_string();
    if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with("file://")) {
        return Err(Error::lockfile_parse_failed(
            path,
            format!("unsupported URL scheme in requirement \"{name}\": {url}"),
        ));
    }

    if checksums.is_empty() {
        checksums.extend(fragment_checksum(&url)?);
    }
    if checksums.is_empty() {
        return Err(Error::lockfile_parse_failed(
            path,
            format!("missing --hash pin for \"{name}\""),
        ));
    }

    Ok(Some(LockfileEntry {
        name,
        version: None,
        source: DependencySource::Registry { url },
        checksums,
        dev: false,
    }))
}

fn handle_option_line(line: &str, path: &Path) -> Result<Option<LockfileEntry>> {
    let option = line.split_whitespace().next().unwrap_or(line);
    match option {
        "-e" | "--editable" => Err(Error::lockfile_parse_failed(
            path,
            "editable requirements are not supported",
        )),
        "-r" | "--requirement" | "-c" | "--constraint" => Err(Error::lockfile_parse_failed(
            path,
            "nested requirements files are not supported",
        )),
        _ => {
            warn!(option = %line, "ignoring requirements option");
            Ok(None)
        }
    }
}

/// Reads a checksum out of a `#sha256=...` style URL fragment.
fn fragment_checksum(url: &str) -> Result<Option<Checksum>> {
    let Some((_, fragment)) = url.split_once('#') else {
        return Ok(None);
    };
    for pair in fragment.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if let Ok(algorithm) = key.parse::<Algorithm>() {
            return Checksum::from_hex(algorithm, value).map(Some);
        }
    }
    Ok(None)
}

/// PEP 503 name normalization: lowercase with runs of `-`, `_`, and `.`
/// collapsed to a single `-`.
fn canonicalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator_run = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            in_separator_run = true;
        } else {
            if in_separator_run {
                out.push('-');
                in_separator_run = false;
            }
            out.push(ch.to_ascii_lowercase());
        }
    }
    if in_separator_run {
        out.push('-');
    }
    out
}
