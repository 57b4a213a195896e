use crate::artwork::{fill_missing, ArtifactCache, ArtworkProvider};
use crate::config::SyncPaths;
use crate::identity;
use crate::matcher::CatalogMatcher;
use crate::model::{Catalog, CatalogEntry, DiscoveredInstallation, DiscoveredShortcut};
use crate::selector::ExecutableSelector;
use crate::sources::installs::InstallationSource;
use crate::sources::shortcuts::{LinkResolver, ShortcutSource};
use crate::sources::Source;
use crate::store::{write_preview, CatalogStore};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::collections::HashSet;

/// What one reconciliation pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<String>,
    pub orphans_removed: usize,
    pub images_downloaded: usize,
    pub image_failures: usize,
}

impl ReconcileReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "added {}, removed {}, skipped {}, orphan images deleted {}, images downloaded {} ({} failed)",
            self.added.len(),
            self.removed.len(),
            self.skipped.len(),
            self.orphans_removed,
            self.images_downloaded,
            self.image_failures,
        )];
        for name in &self.added {
            lines.push(format!("  + {name}"));
        }
        for name in &self.removed {
            lines.push(format!("  - {name}"));
        }
        lines.join("\n")
    }
}

/// The result of a pass, ready for review before anything is committed.
#[derive(Debug)]
pub struct Reconciled {
    pub catalog: Catalog,
    pub report: ReconcileReport,
}

pub struct ReconciliationEngine<'a> {
    paths: SyncPaths,
    selector: ExecutableSelector,
    shortcut_extension: String,
    store: &'a dyn CatalogStore,
    artwork: &'a dyn ArtworkProvider,
    links: &'a dyn LinkResolver,
    cache: ArtifactCache,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        paths: SyncPaths,
        selector: ExecutableSelector,
        shortcut_extension: impl Into<String>,
        store: &'a dyn CatalogStore,
        artwork: &'a dyn ArtworkProvider,
        links: &'a dyn LinkResolver,
    ) -> Self {
        let cache = ArtifactCache::new(&paths.grid_dir);
        Self {
            paths,
            selector,
            shortcut_extension: shortcut_extension.into(),
            store,
            artwork,
            links,
            cache,
        }
    }

    /// Runs every step up to and including the preview. The store is not touched.
    pub fn reconcile(&self) -> Result<Reconciled> {
        let mut report = ReconcileReport::default();

        let loaded = self.store.load()?;
        let mut catalog = self.prune_missing(loaded, &mut report);

        report.orphans_removed = self.cache.sweep_orphans(&valid_identities(&catalog));

        if !catalog.is_empty() {
            info!("Checking artwork for {} existing entries...", catalog.len());
            self.backfill(&mut catalog, &mut report);
        }

        let installs = InstallationSource {
            root: self.paths.games_root.clone(),
            skip: vec![self.paths.shortcuts_dir.clone()],
        }
        .scan()?;
        for install in installs {
            self.merge_installation(&mut catalog, install, &mut report);
        }

        let shortcuts = ShortcutSource {
            dir: self.paths.shortcuts_dir.clone(),
            extension: self.shortcut_extension.clone(),
            resolver: self.links,
        }
        .scan()
        .unwrap_or_else(|e| {
            error!("Reading shortcuts in {:?} failed: {:#}", self.paths.shortcuts_dir, e);
            Vec::new()
        });
        for shortcut in shortcuts {
            self.merge_shortcut(&mut catalog, shortcut, &mut report);
        }

        write_preview(&self.paths.preview_file, &catalog)
            .with_context(|| format!("writing preview {}", self.paths.preview_file.display()))?;
        info!("Preview written to {:?}", self.paths.preview_file);

        Ok(Reconciled { catalog, report })
    }

    pub fn commit(&self, catalog: &Catalog) -> Result<()> {
        self.store.save(catalog)?;
        info!("Catalog written to {:?}", self.store.location());
        Ok(())
    }

    /// Keeps entries whose executable still exists, re-packed densely.
    fn prune_missing(&self, catalog: Catalog, report: &mut ReconcileReport) -> Catalog {
        let mut kept = Catalog::default();
        for entry in catalog.entries {
            let exe = entry.executable();
            if !exe.as_os_str().is_empty() && exe.exists() {
                kept.push(entry);
            } else {
                warn!("Removing shortcut with missing executable: {} ({:?})", entry.display_name, exe);
                report.removed.push(entry.display_name);
            }
        }
        if !report.removed.is_empty() {
            info!("Removed {} invalid shortcuts: {}", report.removed.len(), report.removed.join(", "));
        }
        kept
    }

    fn backfill(&self, catalog: &mut Catalog, report: &mut ReconcileReport) {
        for entry in catalog.entries.iter_mut() {
            let Some(id) = identity::normalize(entry.identity) else {
                continue;
            };
            entry.identity = Some(id);
            if entry.display_name.is_empty() {
                continue;
            }
            self.fetch_artwork(id, &entry.display_name, report);
            if let Some(icon) = self.cache.icon(id) {
                entry.icon_path = Some(icon.to_string_lossy().to_string());
            }
        }
    }

    fn fetch_artwork(&self, id: u32, name: &str, report: &mut ReconcileReport) {
        let filled = fill_missing(self.artwork, &self.cache, id, name);
        report.images_downloaded += filled.downloaded;
        report.image_failures += filled.failed;
    }

    fn merge_installation(&self, catalog: &mut Catalog, install: DiscoveredInstallation, report: &mut ReconcileReport) {
        let Some(exe) = self.selector.select_main_executable(&install.root_path) else {
            debug!("No executable found for {}", install.name);
            report.skipped.push(install.name);
            return;
        };

        if CatalogMatcher::new(catalog).exists(&exe, "", Some(&install.root_path)) {
            debug!("{} already exists, skipping", install.name);
            report.skipped.push(install.name);
            return;
        }

        let id = identity::assign(&install.name, &exe.to_string_lossy(), "");
        self.fetch_artwork(id, &install.name, report);

        let mut entry = CatalogEntry::new(id, &install.name, &exe, &install.root_path, "");
        entry.icon_path = self.cache.icon(id).map(|p| p.to_string_lossy().to_string());
        catalog.push(entry);
        info!("Added: {}", install.name);
        report.added.push(install.name);
    }

    fn merge_shortcut(&self, catalog: &mut Catalog, shortcut: DiscoveredShortcut, report: &mut ReconcileReport) {
        let exe = &shortcut.target_executable;
        if CatalogMatcher::new(catalog).exists(exe, &shortcut.arguments, None) {
            debug!("Shortcut already exists, skipping: {} {}", shortcut.name, shortcut.arguments);
            report.skipped.push(shortcut.name);
            return;
        }

        let id = identity::assign(&shortcut.name, &exe.to_string_lossy(), &shortcut.arguments);
        self.fetch_artwork(id, &shortcut.name, report);

        let start_dir = exe.parent().unwrap_or(exe);
        let mut entry = CatalogEntry::new(id, &shortcut.name, exe, start_dir, &shortcut.arguments);
        entry.icon_path = self.cache.icon(id).map(|p| p.to_string_lossy().to_string());
        catalog.push(entry);
        info!("Added shortcut: {} {}", shortcut.name, shortcut.arguments);
        report.added.push(shortcut.name);
    }
}

fn valid_identities(catalog: &Catalog) -> HashSet<u32> {
    catalog.entries.iter().filter_map(|e| e.identity).collect()
}
