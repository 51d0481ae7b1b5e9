//! Integration tests for the sketchsync binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn write_tabs(dir: &Path, tabs: &[(&str, &str)]) -> Vec<PathBuf> {
    tabs.iter()
        .map(|(name, text)| {
            let path = dir.join(name);
            fs::write(&path, text).expect("Failed to write tab");
            path
        })
        .collect()
}

fn run(args: &[&str], tabs: &[PathBuf]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sketchsync"))
        .args(args)
        .args(tabs)
        .env("RUST_LOG", "sketchsync=warn")
        .output()
        .expect("Failed to run sketchsync")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_check_reports_missing_semicolon() {
    let temp = TempDir::new().unwrap();
    let tabs = write_tabs(temp.path(), &[("A.pde", "void f(){x}"), ("B.pde", "int y;")]);

    let output = run(&["check", "--json"], &tabs);
    assert_eq!(output.status.code(), Some(1));
    let problems: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let problems = problems.as_array().unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["file_name"], "A.pde");
    assert_eq!(problems[0]["range"]["start"]["offset"], 9);

    let text = run(&["check"], &tabs);
    assert!(stdout(&text).starts_with("A.pde:1:10: error:"));
}

#[test]
fn test_check_clean_sketch() {
    let temp = TempDir::new().unwrap();
    let tabs = write_tabs(temp.path(), &[("A.pde", "void setup(){size(100,100);}")]);
    let output = run(&["check"], &tabs);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_config_file_enables_warnings() {
    let temp = TempDir::new().unwrap();
    let tabs = write_tabs(temp.path(), &[("A.pde", "void f(){int unused = 1;}")]);
    let config = temp.path().join("sketchsync.toml");
    fs::write(&config, "[checker]\nwarnings_enabled = true\n").unwrap();

    let quiet = run(&["check"], &tabs);
    assert!(stdout(&quiet).is_empty());

    let output = run(&["check", "--config", config.to_str().unwrap()], &tabs);
    assert!(output.status.success());
    assert!(stdout(&output).contains("warning"));
}

#[test]
fn test_derive_prints_class() {
    let temp = TempDir::new().unwrap();
    let tabs = write_tabs(temp.path(), &[("Bounce.pde", "size(100, 100);")]);
    let output = run(&["derive"], &tabs);
    assert!(output.status.success());
    let java = stdout(&output);
    assert!(java.contains("public class Bounce extends PApplet {"));
    assert!(java.contains("public void setup() {"));
}

#[test]
fn test_usages_and_rename() {
    let temp = TempDir::new().unwrap();
    let tabs = write_tabs(temp.path(), &[("A.pde", "void f(){y=1;}"), ("B.pde", "int y;")]);

    let usages = run(&["usages", "--file", "1", "--offset", "4"], &tabs);
    assert!(usages.status.success());
    assert_eq!(stdout(&usages), "A.pde:1:10: y\nB.pde:1:5: y\n");

    let rename = run(&["rename", "--file", "1", "--offset", "4", "--to", "speed", "--write"], &tabs);
    assert!(rename.status.success());
    assert_eq!(fs::read_to_string(&tabs[0]).unwrap(), "void f(){speed=1;}");
    assert_eq!(fs::read_to_string(&tabs[1]).unwrap(), "int speed;");
}

#[test]
fn test_rename_refused_with_syntax_errors() {
    let temp = TempDir::new().unwrap();
    let tabs = write_tabs(temp.path(), &[("A.pde", "void f(){x}"), ("B.pde", "int y;")]);
    let output = run(&["rename", "--file", "1", "--offset", "4", "--to", "z"], &tabs);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("syntax errors"));
    assert_eq!(fs::read_to_string(&tabs[1]).unwrap(), "int y;");
}
