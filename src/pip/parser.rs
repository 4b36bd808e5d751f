//! Output parsing for the structured pip formats we rely on.

use super::types::{InstalledPackage, PipError, VersionListing};

/// Parse `pip list --format=json` output into package records.
pub fn parse_package_list(output: &str) -> Result<Vec<InstalledPackage>, PipError> {
    serde_json::from_str::<Vec<InstalledPackage>>(output.trim())
        .map_err(|e| PipError::Unparseable(format!("package listing: {e}")))
}

/// Extract versions from `pip index versions <name>` output.
///
/// The line we trust looks like:
///   `Available versions: 1.1 (latest), 1.0`
/// Trailing parenthesized annotations are stripped from each entry. When no
/// such line exists the raw output is returned tagged as `Unrecognized`
/// instead of being passed off as version data.
pub fn parse_version_listing(output: &str) -> VersionListing {
    const PREFIX: &str = "Available versions:";

    for line in output.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(PREFIX) {
            let versions: Vec<String> = rest
                .split(',')
                .filter_map(|entry| {
                    // "1.1 (latest)" -> "1.1"
                    entry.split_whitespace().next().map(|v| v.to_string())
                })
                .filter(|v| !v.is_empty())
                .collect();
            return VersionListing::Versions(versions);
        }
    }

    VersionListing::Unrecognized(output.trim().to_string())
}
