use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

struct Layout {
    games: PathBuf,
    steam: PathBuf,
    config: PathBuf,
    user_config: PathBuf,
}

fn layout(root: &Path) -> Layout {
    let games = root.join("games");
    fs::create_dir_all(games.join("MyGame/bin")).expect("mkdir game");
    fs::write(games.join("MyGame/MyGame.exe"), vec![0u8; 3_000]).expect("write exe");
    fs::write(games.join("MyGame/bin/launcher_updater.exe"), vec![0u8; 1_000]).expect("write updater");

    let steam = root.join("steam");
    fs::create_dir_all(steam.join("userdata/123")).expect("mkdir userdata");

    let config = root.join("config.toml");
    fs::write(&config, "").expect("write config");

    Layout {
        user_config: steam.join("userdata/123/config"),
        games,
        steam,
        config,
    }
}

fn command(l: &Layout) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("nonsteam-sync");
    cmd.env_remove("STEAMGRIDDB_API_KEY")
        .arg("--config")
        .arg(&l.config)
        .arg("--games-root")
        .arg(&l.games)
        .arg("--steam-root")
        .arg(&l.steam);
    cmd
}

#[test]
fn yes_flag_writes_catalog_and_preview() {
    let tmp = tempdir().expect("tempdir");
    let l = layout(tmp.path());

    command(&l)
        .arg("--yes")
        .assert()
        .success()
        .stdout(contains("added 1"))
        .stdout(contains("+ MyGame"));

    assert!(l.user_config.join("shortcuts.vdf").is_file());
    assert!(l.user_config.join("grid").is_dir());
    let preview = fs::read_to_string(l.user_config.join("shortcuts.json")).expect("preview");
    let json: serde_json::Value = serde_json::from_str(&preview).expect("json");
    assert_eq!(json["shortcuts"]["0"]["AppName"], "MyGame");
    assert_eq!(json["shortcuts"]["0"]["LaunchOptions"], "");
    assert!(json["shortcuts"]["0"]["Exe"].as_str().expect("exe").ends_with("MyGame.exe\""));

    command(&l)
        .arg("--yes")
        .assert()
        .success()
        .stdout(contains("added 0"));
}

#[test]
fn declining_leaves_catalog_untouched() {
    let tmp = tempdir().expect("tempdir");
    let l = layout(tmp.path());

    command(&l).write_stdin("n\n").assert().success();

    assert!(!l.user_config.join("shortcuts.vdf").exists());
    assert!(l.user_config.join("shortcuts.json").is_file());
}

#[test]
fn dry_run_never_commits() {
    let tmp = tempdir().expect("tempdir");
    let l = layout(tmp.path());

    command(&l).arg("--dry-run").assert().success();
    assert!(!l.user_config.join("shortcuts.vdf").exists());
}

#[test]
fn missing_steam_userdata_is_fatal() {
    let tmp = tempdir().expect("tempdir");
    let l = layout(tmp.path());
    fs::remove_dir_all(l.steam.join("userdata")).expect("rm userdata");

    command(&l)
        .arg("--yes")
        .assert()
        .failure()
        .stderr(contains("Steam userdata not found"));
}
