//! Package URL construction.
//!
//! Builds the `pkg:` identifiers recorded on SBOM components. Only the
//! ecosystems airlock fetches for are covered, with the normalizations
//! their registries require: npm scopes become a percent-encoded
//! namespace segment, and pip packages without a pinned version carry
//! their checksum as a qualifier so the identifier still names one
//! exact artifact.

/// Package URL for an npm package, scoped or plain.
#[must_use]
pub fn npm(name: &str, version: Option<&str>) -> String {
    let path = match name.split_once('/') {
        Some((scope, rest)) => format!("{}/{rest}", scope.replace('@', "%40")),
        None => name.to_string(),
    };
    match version {
        Some(version) => format!("pkg:npm/{path}@{version}"),
        None => format!("pkg:npm/{path}"),
    }
}

/// Package URL for a pip package.
///
/// `checksum` is recorded as a qualifier when no version is pinned,
/// which is the case for direct URL requirements.
#[must_use]
pub fn pypi(name: &str, version: Option<&str>, checksum: Option<&str>) -> String {
    match (version, checksum) {
        (Some(version), _) => format!("pkg:pypi/{name}@{version}"),
        (None, Some(checksum)) => format!("pkg:pypi/{name}?checksum={checksum}"),
        (None, None) => format!("pkg:pypi/{name}"),
    }
}
