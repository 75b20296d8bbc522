//! Configuration and generation failures.

use crate::common::{FileAssert, TestProject};
use texen::core::{FAILURE_HINT, FailureKind, TexenError};
use texen::task::GenerationTask;

fn failure_kind(err: &TexenError) -> FailureKind {
    err.failure_kind().cloned().unwrap_or_else(|| panic!("not a generation failure: {err:?}"))
}

#[test]
fn test_missing_output_file_writes_nothing() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "unused").unwrap();
    let mut config = project.task_config();
    config.output_file = None;

    let err = GenerationTask::new(config).execute().unwrap_err();

    assert!(matches!(err, TexenError::MissingOutputFile));
    assert!(err.is_configuration_error());
    FileAssert::not_exists(project.output_dir());
}

#[test]
fn test_missing_template_path() {
    let project = TestProject::new().unwrap();
    let mut config = project.task_config();
    config.template_path = Some(" ".to_string());

    let err = GenerationTask::new(config).execute().unwrap_err();
    assert!(matches!(err, TexenError::MissingTemplatePath));
}

#[test]
fn test_missing_control_template() {
    let project = TestProject::new().unwrap();

    let err = GenerationTask::new(project.task_config()).execute().unwrap_err();

    assert_eq!(failure_kind(&err), FailureKind::ResourceNotFound);
    let message = err.to_string();
    assert!(message.contains("control.tera"), "{message}");
    assert!(message.ends_with(FAILURE_HINT));
}

#[test]
fn test_template_syntax_error() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "{% if %}").unwrap();

    let err = GenerationTask::new(project.task_config()).execute().unwrap_err();
    assert_eq!(failure_kind(&err), FailureKind::Syntax);
}

#[test]
fn test_method_invocation_error() {
    let project = TestProject::new().unwrap();
    project
        .template("control.tera", "{{ strings(method=\"upper\") }}")
        .unwrap();

    let err = GenerationTask::new(project.task_config()).execute().unwrap_err();

    assert_eq!(
        failure_kind(&err),
        FailureKind::MethodInvocation {
            reference: "strings".to_string(),
            method: "upper".to_string(),
        }
    );
    assert!(err.to_string().contains("text"), "{err}");
}

#[test]
fn test_failure_inside_worker_template() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ generator(method=\"parse\", template=\"worker.tera\", file=\"w.txt\") }}",
        )
        .unwrap();
    project
        .template("worker.tera", "{{ files(method=\"delete\", dir=\"x\") }}")
        .unwrap();

    let err = GenerationTask::new(project.task_config()).execute().unwrap_err();

    assert_eq!(
        failure_kind(&err),
        FailureKind::MethodInvocation {
            reference: "files".to_string(),
            method: "delete".to_string(),
        }
    );
}

#[test]
fn test_unsupported_encoding() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "x").unwrap();
    let mut config = project.task_config();
    config.output_encoding = Some("EBCDIC".to_string());

    let err = GenerationTask::new(config).execute().unwrap_err();
    assert!(matches!(err, TexenError::Encoding(_)));
    FileAssert::not_exists(project.output_dir());
}

#[test]
fn test_bare_file_contents_key_is_rejected() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "x").unwrap();
    project.properties("bad.properties", &[("file.contents", "NOTICE")]).unwrap();
    let mut config = project.task_config();
    config.context_properties = Some("bad.properties".to_string());

    let err = GenerationTask::new(config).execute().unwrap_err();
    assert!(matches!(err, TexenError::InvalidContextProperty { ref key, .. } if key == "file.contents"));
}
