//! Output path to URL resolution.
//!
//! Completed result rows carry a storage-relative `file_path`; joining
//! it with the configured storage base URL yields the fetchable image
//! URL.

/// Join the storage base URL and a storage-relative path.
///
/// Normalizes slashes so the result has exactly one separator between
/// the two parts.
pub fn resolve_output_url(storage_base: &str, file_path: &str) -> String {
    format!(
        "{}/{}",
        storage_base.trim_end_matches('/'),
        file_path.trim_start_matches('/')
    )
}
