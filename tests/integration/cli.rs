//! The `texen` binary.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::{FileAssert, TestProject, run_texen};

fn texen(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("texen").unwrap();
    cmd.current_dir(project.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("TEXEN_CONFIG");
    cmd
}

#[test]
fn test_generate_with_flags() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "Hello, {{ name }}").unwrap();
    project.properties("project.properties", &[("name", "World")]).unwrap();

    texen(&project)
        .args([
            "generate",
            "--control-template",
            "control.tera",
            "--template-path",
            "templates",
            "--output-directory",
            "out",
            "--output-file",
            "hello.txt",
            "--context-properties",
            "project.properties",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.txt"))
        .stdout(predicate::str::contains("Generated 1 file(s)"));

    FileAssert::content_eq(project.output_dir().join("hello.txt"), "Hello, World");
}

#[test]
fn test_generate_with_task_file_in_working_directory() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ generator(method=\"parse\", template=\"part.tera\", file=\"part.txt\") }}main",
        )
        .unwrap();
    project.template("part.tera", "part").unwrap();
    project.task_file(&project.task_config()).unwrap();

    let output = run_texen(project.path(), &["generate"]).unwrap();
    output.assert_success().assert_stdout_contains("Generated 2 file(s)");

    FileAssert::content_eq(project.output_dir().join("result.txt"), "main");
    FileAssert::content_eq(project.output_dir().join("part.txt"), "part");
}

#[test]
fn test_generate_with_explicit_config() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "configured").unwrap();
    let task = project.task_file(&project.task_config()).unwrap();
    let renamed = project.path().join("task.toml");
    std::fs::rename(&task, &renamed).unwrap();

    texen(&project)
        .args(["--config", "task.toml", "generate", "--output-file", "other.txt"])
        .assert()
        .success();

    FileAssert::content_eq(project.output_dir().join("other.txt"), "configured");
    FileAssert::not_exists(project.output_dir().join("result.txt"));
}

#[test]
fn test_render_to_stdout() {
    let project = TestProject::new().unwrap();
    project
        .template("greet.tera", "{{ strings(method=\"capitalize\", text=who) }} x{{ n + 1 }}")
        .unwrap();

    texen(&project)
        .args(["render", "greet.tera", "--template-path", "templates", "--set", "who=world", "--set", "n=2"])
        .assert()
        .success()
        .stdout("World x3");
}

#[test]
fn test_render_reads_task_file() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "page.tera",
            "{{ generator(method=\"parse\", template=\"part.tera\", file=\"part.txt\") }}page",
        )
        .unwrap();
    project.template("part.tera", "part").unwrap();
    project.task_file(&project.task_config()).unwrap();

    texen(&project).args(["render", "page.tera"]).assert().success().stdout("page");

    FileAssert::content_eq(project.output_dir().join("part.txt"), "part");
}

#[test]
fn test_missing_settings_exit_with_error() {
    let project = TestProject::new().unwrap();

    texen(&project)
        .args(["generate", "--template-path", "templates"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Control template is not set"));

    FileAssert::not_exists(project.output_dir());
}

#[test]
fn test_generation_failure_reports_hint() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "{{ strings(method=\"nope\", text=\"x\") }}").unwrap();
    project.task_file(&project.task_config()).unwrap();

    let output = run_texen(project.path(), &["generate"]).unwrap();
    assert_eq!(output.code, Some(1));
    output
        .assert_stderr_contains("strings.nope")
        .assert_stderr_contains("Generation failed");
}

#[test]
fn test_invalid_task_file() {
    let project = TestProject::new().unwrap();
    project.write_file("texen.toml".as_ref(), b"unknown_key = 1\n").unwrap();

    texen(&project)
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid task configuration"));
}
