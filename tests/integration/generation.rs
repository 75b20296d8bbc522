//! Full runs through `GenerationTask`.

use crate::common::{FileAssert, TestProject};
use std::fs;
use texen::task::GenerationTask;

#[test]
fn test_hello_world() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "Hello, {{ name }}").unwrap();
    project.properties("project.properties", &[("name", "World")]).unwrap();

    let mut config = project.task_config();
    config.context_properties = Some("project.properties".to_string());

    let report = GenerationTask::new(config).execute().unwrap();

    assert_eq!(report.output, project.output_dir().join("result.txt"));
    assert!(report.files.is_empty());
    FileAssert::content_eq(&report.output, "Hello, World");
}

#[test]
fn test_builtin_context_objects() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ strings(method=\"capitalize\", text=name) }} {{ strings(method=\"upper\", text=\"sql\") }}",
        )
        .unwrap();
    project.properties("project.properties", &[("name", "orders")]).unwrap();

    let mut config = project.task_config();
    config.context_properties = Some("project.properties".to_string());

    GenerationTask::new(config).execute().unwrap();
    assert_eq!(project.read_output("result.txt").unwrap(), "Orders SQL");
}

#[test]
fn test_properties_object_reads_template_path() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{% set db = properties(method=\"load\", file=\"db.properties\") %}{{ db.host }}:{{ db.port }}",
        )
        .unwrap();
    project.template("db.properties", "host = localhost\nport = 5432\n").unwrap();

    GenerationTask::new(project.task_config()).execute().unwrap();
    assert_eq!(project.read_output("result.txt").unwrap(), "localhost:5432");
}

#[test]
fn test_generator_variables() {
    let project = TestProject::new().unwrap();
    project
        .template("control.tera", "{{ outputDirectory }}|{{ generator.outputDirectory }}")
        .unwrap();

    GenerationTask::new(project.task_config()).execute().unwrap();

    let expected = project.output_dir().display().to_string();
    assert_eq!(
        project.read_output("result.txt").unwrap(),
        format!("{expected}|{expected}")
    );
}

#[test]
fn test_typed_context_properties() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ version + 1 }}{% if release %} release{% endif %}{% if not draft %} final{% endif %}\n{{ notice }}",
        )
        .unwrap();
    project.write_file("NOTICE".as_ref(), b"Copyright Example").unwrap();
    project
        .properties(
            "project.properties",
            &[
                ("version", "1"),
                ("release", "yes"),
                ("draft", "off"),
                ("notice.file.contents", "NOTICE"),
            ],
        )
        .unwrap();

    let mut config = project.task_config();
    config.context_properties = Some("project.properties".to_string());

    GenerationTask::new(config).execute().unwrap();
    assert_eq!(
        project.read_output("result.txt").unwrap(),
        "2 release final\nCopyright Example"
    );
}

#[test]
fn test_reserved_context_properties_are_ignored() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "{{ outputDirectory }}").unwrap();
    project
        .properties("project.properties", &[("outputDirectory", "/elsewhere")])
        .unwrap();

    let mut config = project.task_config();
    config.context_properties = Some("project.properties".to_string());

    GenerationTask::new(config).execute().unwrap();
    assert_eq!(
        project.read_output("result.txt").unwrap(),
        project.output_dir().display().to_string()
    );
}

#[test]
fn test_template_path_order() {
    let project = TestProject::new().unwrap();
    project.write_file("overrides/control.tera".as_ref(), b"override").unwrap();
    project.template("control.tera", "default").unwrap();

    let mut config = project.task_config();
    config.template_path = Some("overrides, templates".to_string());

    GenerationTask::new(config).execute().unwrap();
    assert_eq!(project.read_output("result.txt").unwrap(), "override");
}

#[test]
fn test_latin1_output_encoding() {
    let project = TestProject::new().unwrap();
    project.template("control.tera", "caf\u{e9}").unwrap();

    let mut config = project.task_config();
    config.output_encoding = Some("ISO-8859-1".to_string());

    GenerationTask::new(config).execute().unwrap();
    assert_eq!(
        fs::read(project.output_dir().join("result.txt")).unwrap(),
        vec![b'c', b'a', b'f', 0xE9]
    );
}

#[test]
fn test_custom_generator_properties_add_objects() {
    let project = TestProject::new().unwrap();
    project
        .template("control.tera", "{{ text(method=\"lower\", text=\"ABC\") }}")
        .unwrap();
    project
        .properties("custom.properties", &[("context.objects.text", "StringUtils")])
        .unwrap();

    let mut config = project.task_config();
    config.generator_properties = Some("custom.properties".to_string());

    GenerationTask::new(config).execute().unwrap();
    assert_eq!(project.read_output("result.txt").unwrap(), "abc");
}

#[test]
fn test_control_template_includes_sibling() {
    let project = TestProject::new().unwrap();
    project.template("header.tera", "-- {{ title }} --").unwrap();
    project.template("control.tera", "{% include \"header.tera\" %} body").unwrap();
    project.properties("page.properties", &[("title", "Report")]).unwrap();
    let mut config = project.task_config();
    config.context_properties = Some("page.properties".to_string());

    GenerationTask::new(config).execute().unwrap();

    FileAssert::content_eq(project.output_dir().join("result.txt"), "-- Report -- body");
}

