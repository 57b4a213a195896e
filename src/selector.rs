use crate::config::HeuristicsConfig;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const NAME_BONUS: i64 = 10;
const BUILD_DIR_BONUS: i64 = 5;

/// Picks the executable most likely to be the game inside an install folder.
pub struct ExecutableSelector {
    extension: String,
    ignore_dirs: HashSet<String>,
    ignore_names: HashSet<String>,
    ignore_patterns: Vec<Regex>,
    preferred_dirs: HashSet<String>,
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    size: u64,
    score: i64,
}

fn lowered(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

impl ExecutableSelector {
    pub fn new(rules: &HeuristicsConfig) -> Self {
        let ignore_patterns = rules
            .ignore_patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!("Ignoring invalid exclusion pattern {:?}: {}", pattern, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            extension: rules.executable_extension.trim_start_matches('.').to_lowercase(),
            ignore_dirs: lowered(&rules.ignore_dirs),
            ignore_names: lowered(&rules.ignore_names),
            ignore_patterns,
            preferred_dirs: lowered(&rules.preferred_dirs),
        }
    }

    pub fn select_main_executable(&self, root: &Path) -> Option<PathBuf> {
        let game_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if self.ignore_dirs.contains(&game_name) {
            debug!("Ignoring {:?}: the install folder itself is excluded", root);
            return None;
        }

        let mut candidates: Vec<Candidate> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.has_executable_extension(e.path()))
            .filter_map(|e| {
                let score = self.score(root, e.path(), &game_name)?;
                let size = e.metadata().map(|m| m.len()).unwrap_or(0);
                Some(Candidate { path: e.into_path(), size, score })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.path.cmp(&b.path))
        });

        match candidates.into_iter().next() {
            Some(best) => {
                debug!(
                    "Selected {:?} for {:?} (score={}, size={})",
                    best.path, game_name, best.score, best.size
                );
                Some(best.path)
            }
            None => {
                debug!("No usable executable under {:?}", root);
                None
            }
        }
    }

    fn has_executable_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    /// `None` means the file is excluded; otherwise its heuristic score.
    fn score(&self, root: &Path, path: &Path, game_name: &str) -> Option<i64> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        // Folders inside the install, not the file name itself.
        let folders: Vec<String> = relative
            .parent()
            .map(|p| p.iter().map(|s| s.to_string_lossy().to_lowercase()).collect())
            .unwrap_or_default();

        if let Some(bad) = folders.iter().find(|f| self.ignore_dirs.contains(f.as_str())) {
            debug!("Ignoring {:?}: inside excluded folder {:?}", path, bad);
            return None;
        }

        let file_name = path.file_name()?.to_string_lossy().to_lowercase();
        let stem = path.file_stem()?.to_string_lossy().to_lowercase();

        if self.ignore_names.contains(&stem) || self.ignore_names.contains(&file_name) {
            debug!("Ignoring {:?}: generic name", path);
            return None;
        }

        if self.ignore_patterns.iter().any(|re| re.is_match(&file_name)) {
            debug!("Ignoring {:?}: matches exclusion pattern", path);
            return None;
        }

        let mut score = 0;
        if !game_name.is_empty() && (game_name.contains(&stem) || stem.contains(game_name)) {
            score += NAME_BONUS;
        }
        if folders.iter().any(|f| self.preferred_dirs.contains(f.as_str())) {
            score += BUILD_DIR_BONUS;
        }
        Some(score)
    }
}
