//! Worker templates rendered from inside the control template.

use crate::common::{FileAssert, TestProject};
use texen::task::GenerationTask;

fn with_tables(project: &TestProject, tables: &str) -> texen::config::TaskConfig {
    project.properties("model.properties", &[("tables", tables)]).unwrap();
    let mut config = project.task_config();
    config.context_properties = Some("model.properties".to_string());
    config
}

#[test]
fn test_one_file_per_object() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{% for t in tables | split(pat=\",\") %}{{ generator(method=\"parse\", template=\"table.tera\", file=t ~ \".sql\", object_id=\"table\", object=t) }}{% endfor %}index",
        )
        .unwrap();
    project
        .template("table.tera", "CREATE TABLE {{ table }} ({{ outputDirectory is string }});")
        .unwrap();

    let report = GenerationTask::new(with_tables(&project, "users,orders")).execute().unwrap();

    assert_eq!(
        report.files,
        vec![project.output_dir().join("orders.sql"), project.output_dir().join("users.sql")]
    );
    FileAssert::content_eq(project.output_dir().join("users.sql"), "CREATE TABLE users (true);");
    FileAssert::content_eq(project.output_dir().join("orders.sql"), "CREATE TABLE orders (true);");
    FileAssert::content_eq(project.output_dir().join("result.txt"), "index");
}

#[test]
fn test_same_file_shares_one_writer() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{% for t in tables | split(pat=\",\") %}{{ generator(method=\"parse\", template=\"entry.tera\", file=\"report.txt\", object_id=\"entry\", object=t) }}{% endfor %}",
        )
        .unwrap();
    project.template("entry.tera", "[{{ entry }}]").unwrap();

    let report = GenerationTask::new(with_tables(&project, "one,two")).execute().unwrap();

    assert_eq!(report.files, vec![project.output_dir().join("report.txt")]);
    FileAssert::content_eq(project.output_dir().join("report.txt"), "[one][two]");
}

#[test]
fn test_nested_worker_for_same_file_writes_in_call_order() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ generator(method=\"parse\", template=\"outer.tera\", file=\"report.txt\") }}",
        )
        .unwrap();
    project
        .template(
            "outer.tera",
            "A-before|{{ generator(method=\"parse\", template=\"inner.tera\", file=\"report.txt\") }}|A-after",
        )
        .unwrap();
    project.template("inner.tera", "B").unwrap();

    let report = GenerationTask::new(project.task_config()).execute().unwrap();

    assert_eq!(report.files, vec![project.output_dir().join("report.txt")]);
    FileAssert::content_eq(project.output_dir().join("report.txt"), "A-before|B|A-after");
}

#[test]
fn test_parse_without_file_returns_text() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "<{{ generator(method=\"parse\", template=\"inline.tera\", object_id=\"who\", object=\"inline\") }}>",
        )
        .unwrap();
    project.template("inline.tera", "{{ who }}").unwrap();

    let report = GenerationTask::new(project.task_config()).execute().unwrap();

    assert!(report.files.is_empty());
    FileAssert::content_eq(&report.output, "<inline>");
}

#[test]
fn test_worker_files_in_subdirectories() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ files(method=\"mkdir\", dir=\"empty\") }}{{ generator(method=\"parse\", template=\"leaf.tera\", file=\"nested/deep/leaf.txt\") }}",
        )
        .unwrap();
    project.template("leaf.tera", "leaf").unwrap();

    GenerationTask::new(project.task_config()).execute().unwrap();

    assert!(project.output_dir().join("empty").is_dir());
    FileAssert::content_eq(project.output_dir().join("nested/deep/leaf.txt"), "leaf");
}

#[test]
fn test_worker_output_encoding() {
    let project = TestProject::new().unwrap();
    project
        .template(
            "control.tera",
            "{{ generator(method=\"parse\", template=\"w.tera\", file=\"w.txt\", output_encoding=\"ISO-8859-1\") }}",
        )
        .unwrap();
    project.template("w.tera", "\u{e9}\u{263a}").unwrap();

    GenerationTask::new(project.task_config()).execute().unwrap();

    assert_eq!(
        std::fs::read(project.output_dir().join("w.txt")).unwrap(),
        vec![0xE9, b'?']
    );
}
