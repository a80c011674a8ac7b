// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tinyci::config::{ConfigFile, load_and_validate, load_from_path};
use tinyci::errors::CiError;
use tinyci::types::{CloneFailurePolicy, TaskFailurePolicy};
use tinyci_test_utils::builders::{ConfigFileBuilder, PipelineBuilder, job};

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(name: &str, contents: &str) -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok((dir, path))
}

fn assert_config_error(contents: &str, needle: &str) {
    let (_dir, path) = write_config("Tinyci.toml", contents).unwrap();
    match load_and_validate(&path) {
        Err(CiError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}")
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

const FULL_TOML: &str = r#"
[runner]
workdir = "/var/lib/tinyci"
poll_interval = "30s"
on_task_failure = "abort"
on_clone_failure = "skip"

[[pipelines]]
name = "Website"
domain = "example.com"
src = "https://example.invalid/site.git"
vc = { branch = "main" }

[[pipelines.stages]]
name = "build"

[[pipelines.stages.jobs]]
name = "compile"
tasks = [{ cmd = "make" }, { cmd = "make test", timeout = "5m" }]

[[pipelines.stages]]
name = "package"

[[pipelines.stages.jobs]]
name = "tarball"
tasks = [{ cmd = "tar czf dist/site.tgz public" }]

[[pipelines.artifacts]]
src = "dist/*.tgz"
dst = "release"

[[pipelines]]
name = "Library"
package = "libfoo"
src = "https://example.invalid/libfoo.git"
vc = { branch = "develop" }
"#;

#[test]
fn full_toml_config_loads_in_declaration_order() -> TestResult {
    let (_dir, path) = write_config("Tinyci.toml", FULL_TOML)?;

    let cfg = load_and_validate(&path)?;

    let runner = cfg.runner();
    assert_eq!(runner.workdir(), PathBuf::from("/var/lib/tinyci"));
    assert_eq!(runner.poll_interval(), Duration::from_secs(30));
    assert_eq!(runner.on_task_failure, TaskFailurePolicy::Abort);
    assert_eq!(runner.on_clone_failure, CloneFailurePolicy::Skip);

    let ids: Vec<_> = cfg.pipelines().iter().map(|p| p.identity()).collect();
    assert_eq!(ids, vec!["example.com", "libfoo"]);

    let site = cfg.pipeline("example.com").unwrap();
    let stages: Vec<_> = site.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(stages, vec!["build", "package"]);
    let tasks = &site.stages[0].jobs[0].tasks;
    assert_eq!(tasks[0].timeout(), None);
    assert_eq!(tasks[1].timeout(), Some(Duration::from_secs(300)));
    assert_eq!(site.artifacts[0].dst, "release");

    let lib = cfg.pipeline("libfoo").unwrap();
    assert_eq!(lib.branch(), "develop");
    assert!(lib.stages.is_empty());
    assert!(!lib.has_artifacts());
    Ok(())
}

#[test]
fn runner_section_is_optional() -> TestResult {
    let (_dir, path) = write_config(
        "Tinyci.toml",
        r#"
[[pipelines]]
name = "Docs"
package = "docs"
src = "https://example.invalid/docs.git"
vc = { branch = "main" }
"#,
    )?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.runner().workdir(), PathBuf::from("."));
    assert_eq!(cfg.runner().poll_interval(), Duration::from_secs(60));
    assert_eq!(cfg.runner().on_task_failure, TaskFailurePolicy::Continue);
    assert_eq!(cfg.runner().on_clone_failure, CloneFailurePolicy::Abort);
    Ok(())
}

#[test]
fn json_config_is_detected_by_extension() -> TestResult {
    let (_dir, path) = write_config(
        "pipelines.json",
        r#"{
  "pipelines": [
    {
      "name": "Website",
      "domain": "example.com",
      "src": "https://example.invalid/site.git",
      "vc": { "branch": "main" },
      "stages": [
        { "name": "build", "jobs": [ { "name": "compile", "tasks": [ { "cmd": "make" } ] } ] }
      ],
      "artifacts": [ { "src": "dist/*.bin", "dst": "bin" } ]
    }
  ]
}"#,
    )?;

    let cfg = load_and_validate(&path)?;

    let site = cfg.pipeline("example.com").unwrap();
    assert_eq!(site.stages[0].jobs[0].tasks[0].cmd, "make");
    assert_eq!(site.artifacts[0].src, "dist/*.bin");
    Ok(())
}

#[test]
fn malformed_files_surface_parser_errors() -> TestResult {
    let (_dir, toml_path) = write_config("Tinyci.toml", "[[pipelines]\nname = ")?;
    assert!(matches!(load_from_path(&toml_path), Err(CiError::TomlError(_))));

    let (_dir2, json_path) = write_config("ci.json", "{ \"pipelines\": [ ")?;
    assert!(matches!(load_from_path(&json_path), Err(CiError::JsonError(_))));

    let missing = tempfile::tempdir()?.path().join("nope.toml");
    assert!(matches!(load_from_path(&missing), Err(CiError::IoError(_))));
    Ok(())
}

#[test]
fn empty_pipeline_list_is_rejected() {
    assert_config_error("[runner]\npoll_interval = \"10s\"\n", "at least one");
}

#[test]
fn duplicate_identities_are_rejected() {
    assert_config_error(
        r#"
[[pipelines]]
name = "A"
package = "same"
src = "https://example.invalid/a.git"
vc = { branch = "main" }

[[pipelines]]
name = "B"
domain = "same"
src = "https://example.invalid/b.git"
vc = { branch = "main" }
"#,
        "duplicate pipeline identity 'same'",
    );
}

#[test]
fn identity_must_be_exactly_one_of_domain_or_package() {
    assert_config_error(
        r#"
[[pipelines]]
name = "Both"
domain = "example.com"
package = "pkg"
src = "https://example.invalid/a.git"
vc = { branch = "main" }
"#,
        "both `domain` and `package`",
    );
    assert_config_error(
        r#"
[[pipelines]]
name = "Neither"
src = "https://example.invalid/a.git"
vc = { branch = "main" }
"#,
        "needs a `domain` or `package`",
    );
}

#[test]
fn identity_cannot_escape_the_work_directory() {
    assert_config_error(
        r#"
[[pipelines]]
name = "Sneaky"
package = "../etc"
src = "https://example.invalid/a.git"
vc = { branch = "main" }
"#,
        "not a plain directory name",
    );
}

#[test]
fn bad_durations_are_rejected() {
    assert_config_error(
        r#"
[runner]
poll_interval = "soon"

[[pipelines]]
name = "A"
package = "a"
src = "https://example.invalid/a.git"
vc = { branch = "main" }
"#,
        "poll_interval",
    );
    assert_config_error(
        r#"
[[pipelines]]
name = "A"
package = "a"
src = "https://example.invalid/a.git"
vc = { branch = "main" }

[[pipelines.stages]]
name = "test"

[[pipelines.stages.jobs]]
name = "unit"
tasks = [{ cmd = "make test", timeout = "forever" }]
"#,
        "invalid timeout",
    );
}

#[test]
fn artifact_patterns_and_destinations_are_checked() {
    assert_config_error(
        r#"
[[pipelines]]
name = "A"
package = "a"
src = "https://example.invalid/a.git"
vc = { branch = "main" }

[[pipelines.artifacts]]
src = "dist/[oops"
dst = "release"
"#,
        "invalid artifact pattern",
    );
    assert_config_error(
        r#"
[[pipelines]]
name = "A"
package = "a"
src = "https://example.invalid/a.git"
vc = { branch = "main" }

[[pipelines.artifacts]]
src = "dist/*.bin"
dst = "../../outside"
"#,
        "must be a relative path",
    );
}

#[test]
fn artifact_sources_cannot_reach_outside_the_working_copy() {
    for src in ["../../history.json", "/etc/*"] {
        assert_config_error(
            &format!(
                r#"
[[pipelines]]
name = "A"
package = "a"
src = "https://example.invalid/a.git"
vc = {{ branch = "main" }}

[[pipelines.artifacts]]
src = "{src}"
dst = "release"
"#
            ),
            "artifact `src`",
        );
    }
}

#[test]
fn empty_commands_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_pipeline(
            PipelineBuilder::new("a")
                .stage("build", vec![job("compile", &["  "])])
                .build(),
        )
        .raw();

    match ConfigFile::try_from(raw) {
        Err(CiError::ConfigError(msg)) => assert!(msg.contains("empty `cmd`")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}
