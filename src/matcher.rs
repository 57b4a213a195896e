use crate::model::{unquote, Catalog};
use std::path::{Component, Path, PathBuf};

/// Canonical, case-folded form of a stored or discovered path.
///
/// Paths that do not exist are made absolute lexically instead. Empty input
/// has no normal form.
pub fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = unquote(raw);
    if trimmed.is_empty() {
        return None;
    }
    let path = Path::new(trimmed);
    let resolved = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => std::path::absolute(path).ok()?,
    };
    let cleaned: PathBuf = resolved
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    Some(cleaned.to_string_lossy().to_lowercase())
}

/// Decides whether a candidate is already in the catalog.
pub struct CatalogMatcher<'a> {
    catalog: &'a Catalog,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// True when an entry shares the start directory, or the executable
    /// together with the same launch options.
    ///
    /// A shared start directory is enough on its own: one game per folder.
    pub fn exists(&self, exe: &Path, arguments: &str, start_dir: Option<&Path>) -> bool {
        let exe = normalize_path(&exe.to_string_lossy());
        let start_dir = start_dir.and_then(|d| normalize_path(&d.to_string_lossy()));
        let arguments = arguments.trim().to_lowercase();

        self.catalog.entries.iter().any(|entry| {
            if let (Some(wanted), Some(existing)) = (&start_dir, normalize_path(&entry.start_directory)) {
                if *wanted == existing {
                    return true;
                }
            }
            match (&exe, normalize_path(&entry.executable_path)) {
                (Some(wanted), Some(existing)) => {
                    *wanted == existing && entry.launch_options.trim().to_lowercase() == arguments
                }
                _ => false,
            }
        })
    }
}
