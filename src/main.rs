mod artwork;
mod config;
mod engine;
mod error;
mod identity;
mod matcher;
mod model;
mod selector;
mod sources;
mod store;

use anyhow::Result;
use crate::artwork::{ArtworkProvider, NoArtwork, SteamGridDb};
use crate::config::{load_config, resolve_paths, PathOverrides};
use crate::engine::ReconciliationEngine;
use crate::selector::ExecutableSelector;
use crate::sources::shortcuts::ShellLinkResolver;
use crate::store::{CatalogStore, VdfCatalogStore};
use clap::Parser;
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Adds local games and shortcuts to Steam as non-Steam shortcuts", long_about = None)]
struct Args {
    /// Folder whose subfolders are game installs
    #[arg(long)]
    games_root: Option<PathBuf>,

    /// Folder of .lnk shortcuts to add as well
    #[arg(long)]
    shortcuts_dir: Option<PathBuf>,

    /// Steam install folder (the one containing `userdata`)
    #[arg(long)]
    steam_root: Option<PathBuf>,

    /// Steam account folder under `userdata`
    #[arg(long)]
    steam_user: Option<String>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the catalog without asking
    #[arg(short, long, conflicts_with = "dry_run")]
    yes: bool,

    /// Only write the preview
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim")
}

fn ask(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(confirmed(&answer))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // 1. Load Config
    let config = load_config(args.config.as_deref())?;
    let paths = resolve_paths(
        &config.paths,
        PathOverrides {
            games_root: args.games_root,
            shortcuts_dir: args.shortcuts_dir,
            steam_root: args.steam_root,
            steam_user: args.steam_user,
        },
    )?;
    info!("Games root: {:?}", paths.games_root);
    info!("Steam user config: {:?}", paths.user_config_dir);
    info!("Artwork folder: {:?}", paths.grid_dir);

    // 2. Collaborators
    let store = VdfCatalogStore::new(&paths.catalog_file);
    let artwork: Box<dyn ArtworkProvider> = match config.artwork.resolved_api_key() {
        Some(key) => Box::new(SteamGridDb::new(&config.artwork, key)?),
        None => {
            warn!("No SteamGridDB API key configured, artwork will not be downloaded");
            Box::new(NoArtwork)
        }
    };
    let links = ShellLinkResolver {
        executable_extension: config.heuristics.executable_extension.clone(),
    };

    // 3. Reconcile
    let engine = ReconciliationEngine::new(
        paths.clone(),
        ExecutableSelector::new(&config.heuristics),
        config.heuristics.shortcut_extension.clone(),
        &store,
        artwork.as_ref(),
        &links,
    );
    let result = engine.reconcile()?;
    println!("{}", result.report.summary());
    println!("Preview: {}", paths.preview_file.display());

    // 4. Commit
    if args.dry_run {
        info!("Dry run, {:?} left untouched", store.location());
        return Ok(());
    }
    let question = format!("Write {} entries to {}?", result.catalog.len(), store.location().display());
    if args.yes || ask(&question)? {
        engine.commit(&result.catalog)?;
    } else {
        info!("Not committed, {:?} left untouched", store.location());
    }
    Ok(())
}
