//! Path and extension normalization shared by filesystem implementations
//! and callers registering folders.

/// Normalizes a folder to forward slashes with exactly one trailing `/`.
/// The VFS root normalizes to the empty string.
pub fn normalize_folder(folder: &str) -> String {
	let folder = folder.trim().replace('\\', "/");
	let trimmed = folder.trim_matches('/');
	if trimmed.is_empty() { String::new() } else { format!("{trimmed}/") }
}

/// Strips at most one leading `.` and lower-cases the extension.
pub fn normalize_extension(extension: &str) -> String {
	let extension = extension.trim();
	extension.strip_prefix('.').unwrap_or(extension).to_ascii_lowercase()
}

/// Normalizes a file path to a VFS-relative, forward-slash form.
pub fn normalize_file(path: &str) -> String {
	path.trim().replace('\\', "/").trim_start_matches('/').to_string()
}

/// Returns `true` if the file name of `path` ends in `.extension`,
/// ignoring ASCII case.
pub fn has_extension(path: &str, extension: &str) -> bool {
	let file_name = path.rsplit('/').next().unwrap_or(path);
	file_name.rsplit_once('.').is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension))
}

/// Depth of `path` below `folder` (1 for direct children), or `None` if the
/// path is not inside the folder. Both arguments must be normalized.
pub fn depth_below(folder: &str, path: &str) -> Option<usize> {
	let relative = path.strip_prefix(folder)?;
	if relative.is_empty() {
		return None;
	}
	Some(relative.split('/').filter(|part| !part.is_empty()).count())
}
