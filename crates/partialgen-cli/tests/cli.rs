//! Integration tests for the partialgen binary

use partialgen_core::prelude::*;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn partialgen(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_partialgen"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("partialgen binary runs")
}

fn write_snapshot(path: &Path, with_callback: bool) {
    let mut player = DeclarationSyntax::class("Player").in_namespace("Game").partial().with_member(
        MemberSyntax::field("health", "ValueNotifier<int>")
            .with_attribute(AttributeSyntax::new("GenerateSubscribeMethods")),
    );
    if with_callback {
        player = player.with_member(
            MemberSyntax::method("OnHealthChanged", "void")
                .with_modifier("partial")
                .with_parameter("previous", "int")
                .with_parameter("current", "int"),
        );
    }
    let compilation = Compilation::new(vec![SyntaxTree::new("Assets/Player.cs")
        .with_using("Partialgen")
        .with_declaration(player)]);
    std::fs::write(path, compilation.to_json().expect("snapshot serializes")).expect("snapshot written");
}

#[test]
fn test_generate_writes_artifacts() {
    let dir = TempDir::new().expect("temp dir");
    write_snapshot(&dir.path().join("game.json"), true);

    let output = partialgen(dir.path(), &["generate", "game.json", "--output", "out"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = std::fs::read_to_string(dir.path().join("out").join("Game.Player.Subscriptions.g.cs"))
        .expect("artifact written");
    assert!(text.starts_with("// <auto-generated>"));
    assert!(text.contains("public void SubscribeToHealth()"));
}

#[test]
fn test_generate_json_report() {
    let dir = TempDir::new().expect("temp dir");
    write_snapshot(&dir.path().join("game.json"), true);

    let output = partialgen(dir.path(), &["--format", "json", "generate", "game.json", "-o", "out"]);
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON report");
    assert_eq!(reports[0]["files"][0], "Game.Player.Subscriptions.g.cs");
    assert_eq!(reports[0]["pass"]["cache"]["generated"], 1);
}

#[test]
fn test_generate_clean_removes_stale_files() {
    let dir = TempDir::new().expect("temp dir");
    write_snapshot(&dir.path().join("game.json"), true);
    let out = dir.path().join("out");
    std::fs::create_dir(&out).expect("out dir");
    std::fs::write(out.join("Game.Removed.Subscriptions.g.cs"), "// stale").expect("stale file");
    std::fs::write(out.join("README.md"), "kept").expect("other file");

    let output = partialgen(dir.path(), &["generate", "game.json", "-o", "out", "--clean"]);
    assert!(output.status.success());
    assert!(!out.join("Game.Removed.Subscriptions.g.cs").exists());
    assert!(out.join("README.md").exists());
    assert!(out.join("Game.Player.Subscriptions.g.cs").exists());
}

#[test]
fn test_check_fails_on_missing_callback() {
    let dir = TempDir::new().expect("temp dir");
    write_snapshot(&dir.path().join("game.json"), false);

    let output = partialgen(dir.path(), &["check", "game.json"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PG0002"), "{}", stdout);
    assert!(stdout.contains("OnHealthChanged"));
}

#[test]
fn test_check_passes_when_callbacks_exist() {
    let dir = TempDir::new().expect("temp dir");
    write_snapshot(&dir.path().join("game.json"), true);

    let output = partialgen(dir.path(), &["check", "game.json", "--parallel"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
}

#[test]
fn test_fix_write_then_check_passes() {
    let dir = TempDir::new().expect("temp dir");
    write_snapshot(&dir.path().join("game.json"), false);

    let dry_run = partialgen(dir.path(), &["fix", "game.json"]);
    assert!(dry_run.status.success());
    assert!(String::from_utf8_lossy(&dry_run.stdout).contains("partial void OnHealthChanged(int previous, int current)"));
    assert!(!partialgen(dir.path(), &["check", "game.json"]).status.success());

    let fixed = partialgen(dir.path(), &["fix", "game.json", "--write"]);
    assert!(fixed.status.success());
    assert!(partialgen(dir.path(), &["check", "game.json"]).status.success());
}

#[test]
fn test_init_writes_loadable_config() {
    let dir = TempDir::new().expect("temp dir");

    let output = partialgen(dir.path(), &["init"]);
    assert!(output.status.success());
    let content = std::fs::read_to_string(dir.path().join("partialgen.toml")).expect("config written");
    assert!(content.contains("[emit]"));

    // Refuses to overwrite without --force
    assert!(!partialgen(dir.path(), &["init"]).status.success());
    assert!(partialgen(dir.path(), &["init", "--force"]).status.success());

    write_snapshot(&dir.path().join("game.json"), true);
    assert!(partialgen(dir.path(), &["generate", "game.json"]).status.success());
    assert!(dir.path().join("Generated").join("Game.Player.Subscriptions.g.cs").exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("partialgen.toml"), "[emit]\nindent_width = 0\n").expect("config written");
    write_snapshot(&dir.path().join("game.json"), true);

    let output = partialgen(dir.path(), &["generate", "game.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("indent_width"));
}

#[test]
fn test_directory_input_uses_per_snapshot_folders() {
    let dir = TempDir::new().expect("temp dir");
    let snapshots = dir.path().join("snapshots");
    std::fs::create_dir(&snapshots).expect("snapshot dir");
    write_snapshot(&snapshots.join("first.json"), true);
    write_snapshot(&snapshots.join("second.json"), true);

    let output = partialgen(dir.path(), &["generate", "snapshots", "-o", "out"]);
    assert!(output.status.success());
    for stem in ["first", "second"] {
        assert!(dir
            .path()
            .join("out")
            .join(stem)
            .join("Game.Player.Subscriptions.g.cs")
            .exists());
    }
}
