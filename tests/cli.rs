mod common;

use std::fs;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::*;

use common::{one_hot, spawn_clip_thread};

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

#[fixture]
#[once]
fn embed_url() -> String {
    spawn_clip_thread()
}

#[rstest]
fn add_and_skip_similar(embed_url: &String) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let src = TempDir::new()?;
    let a = src.path().join("a.jpg");
    let b = src.path().join("b.png");
    fs::write(&a, "0.3,0.1,0.9")?;
    fs::write(&b, "0.3,0.1,0.9")?;

    cargo_run!("imdedup", "-c", conf_dir.path(), "add", "--embed-url", embed_url, &a)
        .success()
        .stdout(predicate::str::contains("[OK]").and(predicate::str::contains("inserted: 1")));
    cargo_run!("imdedup", "-c", conf_dir.path(), "add", "--embed-url", embed_url, &b)
        .success()
        .stdout(predicate::str::contains("[SKIP]").and(predicate::str::contains("inserted: 0")));

    assert!(conf_dir.path().join("images/a.jpg").exists());
    assert!(!conf_dir.path().join("images/b.png").exists());
    Ok(())
}

#[rstest]
fn add_directory(embed_url: &String) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let src = TempDir::new()?;
    fs::create_dir(src.path().join("sub"))?;
    fs::write(src.path().join("1.jpg"), one_hot(3, 0))?;
    fs::write(src.path().join("2.JPEG"), one_hot(3, 1))?;
    fs::write(src.path().join("sub/3.png"), one_hot(3, 2))?;
    fs::write(src.path().join("4.gif"), one_hot(3, 2))?;

    cargo_run!("imdedup", "-c", conf_dir.path(), "add", "--embed-url", embed_url, src.path())
        .success()
        .stdout(predicate::str::contains("inserted: 3"));

    cargo_run!("imdedup", "-c", conf_dir.path(), "list", "--output-format", "json")
        .success()
        .stdout(
            predicate::str::contains("1.jpg")
                .and(predicate::str::contains("3.png"))
                .and(predicate::str::contains("4.gif").not())
                .and(predicate::str::contains("embedding").not()),
        );
    Ok(())
}

#[rstest]
fn batch_manifest(embed_url: &String) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let src = TempDir::new()?;
    let mut manifest = String::from("filename,url\n");
    for i in 0..4 {
        let path = src.path().join(format!("{i}.jpg"));
        fs::write(&path, one_hot(4, i % 3))?;
        manifest.push_str(&format!("{i}.jpg,{}\n", path.display()));
    }
    manifest.push_str("missing.jpg,http://127.0.0.1:1/missing.jpg\n");
    let manifest_path = src.path().join("list.csv");
    fs::write(&manifest_path, manifest)?;
    let report = src.path().join("report.csv");

    cargo_run!(
        "imdedup",
        "-c",
        conf_dir.path(),
        "batch",
        "--embed-url",
        embed_url,
        "-w",
        "1",
        "-r",
        &report,
        &manifest_path
    )
    .success()
    .stdout(
        predicate::str::contains("inserted: 3")
            .and(predicate::str::contains("rows: 4"))
            .and(predicate::str::contains("failed: 1")),
    );

    let content = fs::read_to_string(&report)?;
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "input_name,matched_name,similarity");
    assert_eq!(lines[1], "0.jpg,,0.00");
    assert_eq!(lines[4], "3.jpg,0.jpg,100.00");
    Ok(())
}

#[rstest]
fn show_and_delete(embed_url: &String) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let src = TempDir::new()?;
    let a = src.path().join("a.jpg");
    fs::write(&a, "1,2,3")?;

    cargo_run!("imdedup", "-c", conf_dir.path(), "add", "--embed-url", embed_url, &a).success();

    cargo_run!("imdedup", "-c", conf_dir.path(), "show", "1")
        .success()
        .stdout(predicate::str::starts_with("1\ta.jpg\t"));
    cargo_run!("imdedup", "-c", conf_dir.path(), "show", "-n", "a.jpg")
        .success()
        .stdout(predicate::str::contains("a.jpg"));

    cargo_run!("imdedup", "-c", conf_dir.path(), "delete", "1")
        .success()
        .stdout(predicate::str::contains("Deleted image 1 (a.jpg)"));
    cargo_run!("imdedup", "-c", conf_dir.path(), "show", "1").failure();
    cargo_run!("imdedup", "-c", conf_dir.path(), "delete", "1").failure();
    assert!(!conf_dir.path().join("images/a.jpg").exists());
    Ok(())
}

#[rstest]
#[case(&["add", "-t", "abc", "a.jpg"])]
#[case(&["batch", "-w", "0", "a.csv"])]
#[case(&["show"])]
fn invalid_args(#[case] args: &[&str]) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let mut cmd = Command::cargo_bin("imdedup")?;
    cmd.arg("-c").arg(conf_dir.path()).args(args);
    cmd.assert().failure();
    Ok(())
}
