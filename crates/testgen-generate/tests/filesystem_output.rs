use std::fs;
use std::path::PathBuf;

use serde_json::json;
use testgen_generate::{
    FsArtifactWriter, FsTemplateReader, GenerateOptions, GenerationEngine, GenerationError,
};

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("testgen_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn external_schema() -> serde_json::Value {
    json!({"/": {
        "matches": {"suites": "non_empty_list"},
        "/suites/*": {
            "matches": {"name": "non_empty_string", "cases": "non_empty_list"},
            "/cases/*": {
                "path": "%(_name)s/%(name)s.js",
                "template": {"main": "%(kind)s.template", "header": "header.template"},
                "matches": {"name": "non_empty_string", "kind": ["unit", "smoke"]}
            }
        }
    }})
}

#[test]
fn external_templates_render_into_output_root() {
    let templates = temp_dir("templates");
    let overrides = temp_dir("overrides");
    let out = temp_dir("out");
    fs::write(templates.join("unit.template"), "%(header)s\nunit(%(name)s);\n").expect("write");
    fs::write(templates.join("smoke.template"), "%(header)s\nsmoke(%(name)s);\n").expect("write");
    fs::write(templates.join("header.template"), "// %(_name)s").expect("write");
    fs::write(overrides.join("smoke.template"), "override %(name)s\n").expect("write");

    let spec = json!({"suites": [{
        "name": "links",
        "cases": [{"name": "open", "kind": "*"}]
    }]});
    let options = GenerateOptions {
        template_dirs: vec![overrides.clone(), templates.clone()],
        ..GenerateOptions::default()
    };
    let mut writer = FsArtifactWriter::new(&out);

    let report = GenerationEngine::new(options)
        .run(&spec, &external_schema(), &FsTemplateReader::new(), &mut writer)
        .expect("generate");

    // Both kinds target the same path; the later selection wins.
    assert_eq!(report.artifacts, 2);
    assert_eq!(
        fs::read_to_string(out.join("links/open.js")).expect("read artifact"),
        "override open\n"
    );
    assert!(report.bytes_written > 0);

    for dir in [templates, overrides, out] {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn sub_templates_are_rendered_against_the_selection() {
    let templates = temp_dir("templates");
    let out = temp_dir("out");
    fs::write(templates.join("unit.template"), "%(header)s\nunit(%(name)s);\n").expect("write");
    fs::write(templates.join("header.template"), "// %(_name)s").expect("write");

    let spec = json!({"suites": [{
        "name": "links",
        "cases": [{"name": "open", "kind": "unit"}]
    }]});
    let options = GenerateOptions {
        template_dirs: vec![templates.clone()],
        ..GenerateOptions::default()
    };
    let mut writer = FsArtifactWriter::new(&out);
    GenerationEngine::new(options)
        .run(&spec, &external_schema(), &FsTemplateReader::new(), &mut writer)
        .expect("generate");

    assert_eq!(
        fs::read_to_string(out.join("links/open.js")).expect("read artifact"),
        "// links\nunit(open);\n"
    );

    let _ = fs::remove_dir_all(templates);
    let _ = fs::remove_dir_all(out);
}

#[test]
fn missing_template_is_a_hard_failure() {
    let empty = temp_dir("empty");
    let out = temp_dir("out");
    let spec = json!({"suites": [{
        "name": "links",
        "cases": [{"name": "open", "kind": "unit"}]
    }]});
    let options = GenerateOptions {
        template_dirs: vec![empty.clone()],
        ..GenerateOptions::default()
    };
    let mut writer = FsArtifactWriter::new(&out);

    let err = GenerationEngine::new(options)
        .run(&spec, &external_schema(), &FsTemplateReader::new(), &mut writer)
        .unwrap_err();
    assert!(matches!(err, GenerationError::TemplateNotFound { ref reference, .. } if reference == "header.template"));
    assert!(!out.join("links/open.js").exists());

    let _ = fs::remove_dir_all(empty);
    let _ = fs::remove_dir_all(out);
}
