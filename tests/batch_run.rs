use anyhow::{Result, bail};
use docbatch::{
    batch::{self, Batch},
    config::Config,
    engine::{ConvertRequest, DocumentExports, Engine, EngineDiag},
    report::DocStatus,
};
use serde_json::json;
use std::fs;
use std::path::Path;

struct FakeEngine {
    fail_on: Option<&'static str>,
}

impl FakeEngine {
    fn ok() -> Self {
        Self { fail_on: None }
    }
}

impl Engine for FakeEngine {
    fn doctor(&self) -> Result<EngineDiag> {
        Ok(EngineDiag {
            python_exe: "python3".into(),
            python_version: "3.12.0".into(),
            docling_version: Some("2.0.0".into()),
            ok: true,
            error: None,
        })
    }

    fn convert(&self, req: &ConvertRequest) -> Result<DocumentExports> {
        if let Some(marker) = self.fail_on {
            if req.input_pdf.contains(marker) {
                bail!("synthetic conversion failure");
            }
        }
        Ok(DocumentExports {
            text: "hello body".into(),
            markdown: "# hello".into(),
            json: json!({
                "texts": [
                    {"text": "hello"},
                    {"label": "picture"},
                    {"text": "world"},
                ],
            }),
            html: "<p>hello</p>".into(),
            doctags: "<doctag>hello</doctag>".into(),
        })
    }
}

fn cfg_for(input_dir: &Path, out_dir: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.input_dir = input_dir.display().to_string();
    cfg.paths.out_dir = out_dir.display().to_string();
    cfg
}

fn seed_inputs(input_dir: &Path, names: &[&str]) {
    fs::create_dir_all(input_dir).unwrap();
    for name in names {
        fs::write(input_dir.join(name), b"%PDF-1.4 fake").unwrap();
    }
}

const BUNDLE_FILES: [&str; 6] = [
    ".text",
    ".markdown",
    ".json",
    ".html",
    ".doctags",
    "_texts_only.json",
];

fn assert_bundle(out_dir: &Path, stem: &str) {
    for suffix in BUNDLE_FILES {
        let path = out_dir.join(stem).join(format!("{stem}{suffix}"));
        assert!(path.is_file(), "missing {}", path.display());
    }
}

#[test]
fn converts_all_then_skips_all() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    let out_dir = tmp.path().join("outputs");
    seed_inputs(&input_dir, &["invoice1.pdf", "invoice2.pdf"]);

    let converter = Batch::new(&cfg_for(&input_dir, &out_dir), FakeEngine::ok());

    let outcome = converter.run().unwrap();
    assert_eq!(outcome.summary.processed, 2);
    assert_eq!(outcome.summary.skipped, 0);
    assert_eq!(outcome.summary.failed, 0);
    assert_bundle(&out_dir, "invoice1");
    assert_bundle(&out_dir, "invoice2");

    // Plant a sentinel; a skipped document must not be rewritten.
    let sentinel = out_dir.join("invoice1").join("invoice1.markdown");
    fs::write(&sentinel, "SENTINEL").unwrap();

    let outcome = converter.run().unwrap();
    assert_eq!(outcome.summary.processed, 0);
    assert_eq!(outcome.summary.skipped, 2);
    assert_eq!(fs::read_to_string(&sentinel).unwrap(), "SENTINEL");
    assert!(
        outcome
            .documents
            .iter()
            .all(|d| d.status == DocStatus::Skipped)
    );
}

#[test]
fn texts_only_extract_is_written() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    let out_dir = tmp.path().join("outputs");
    seed_inputs(&input_dir, &["invoice1.pdf"]);

    let converter = Batch::new(&cfg_for(&input_dir, &out_dir), FakeEngine::ok());
    converter.run().unwrap();

    let raw = fs::read_to_string(
        out_dir.join("invoice1").join("invoice1_texts_only.json"),
    )
    .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, json!({"texts": ["hello", "world"]}));
}

#[test]
fn failed_document_does_not_stop_the_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    let out_dir = tmp.path().join("outputs");
    seed_inputs(&input_dir, &["bad.pdf", "good.pdf"]);

    let engine = FakeEngine {
        fail_on: Some("bad"),
    };
    let converter = Batch::new(&cfg_for(&input_dir, &out_dir), engine);

    let outcome = converter.run().unwrap();
    assert_eq!(outcome.summary.processed, 1);
    assert_eq!(outcome.summary.failed, 1);
    assert_bundle(&out_dir, "good");
    assert!(!out_dir.join("bad").join("bad.text").exists());

    let bad = outcome
        .documents
        .iter()
        .find(|d| d.stem == "bad")
        .unwrap();
    assert_eq!(bad.status, DocStatus::Failed);
    assert!(bad.error.as_deref().unwrap().contains("synthetic"));
}

#[test]
fn fail_fast_aborts_the_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    let out_dir = tmp.path().join("outputs");
    seed_inputs(&input_dir, &["bad.pdf", "good.pdf"]);

    let mut cfg = cfg_for(&input_dir, &out_dir);
    cfg.run.fail_fast = true;
    let engine = FakeEngine {
        fail_on: Some("bad"),
    };
    let converter = Batch::new(&cfg, engine);

    assert!(converter.run().is_err());
    // bad.pdf sorts first, so good.pdf was never reached
    assert!(!out_dir.join("good").join("good.text").exists());
}

#[test]
fn force_reconverts_despite_marker() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    let out_dir = tmp.path().join("outputs");
    seed_inputs(&input_dir, &["invoice1.pdf"]);

    let mut cfg = cfg_for(&input_dir, &out_dir);
    let converter = Batch::new(&cfg, FakeEngine::ok());
    converter.run().unwrap();

    cfg.run.force = true;
    let converter = Batch::new(&cfg, FakeEngine::ok());
    let outcome = converter.run().unwrap();
    assert_eq!(outcome.summary.processed, 1);
    assert_eq!(outcome.summary.skipped, 0);
}

#[test]
fn missing_input_dir_is_an_error_and_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("does-not-exist");
    let out_dir = tmp.path().join("outputs");

    let converter = Batch::new(&cfg_for(&input_dir, &out_dir), FakeEngine::ok());
    assert!(converter.run().is_err());
    assert!(!out_dir.exists());
}

#[test]
fn empty_input_dir_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    let out_dir = tmp.path().join("outputs");
    fs::create_dir_all(&input_dir).unwrap();
    fs::write(input_dir.join("notes.txt"), "not a pdf").unwrap();

    let converter = Batch::new(&cfg_for(&input_dir, &out_dir), FakeEngine::ok());
    assert!(converter.run().is_err());
    assert!(!out_dir.exists());
}

#[test]
fn discover_filters_and_sorts() {
    let tmp = tempfile::tempdir().unwrap();
    let input_dir = tmp.path().join("orders");
    seed_inputs(&input_dir, &["b.pdf", "a.pdf", "z.txt"]);
    fs::create_dir_all(input_dir.join("nested.pdf")).unwrap();

    let found = batch::discover(&input_dir).unwrap();
    let names: Vec<_> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
}

#[test]
fn empty_marker_file_does_not_count_as_processed() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("outputs");
    let bundle = out_dir.join("invoice1");
    fs::create_dir_all(&bundle).unwrap();

    fs::write(bundle.join("invoice1.text"), "").unwrap();
    assert!(!batch::is_processed(&out_dir, "invoice1"));

    fs::write(bundle.join("invoice1.text"), "content").unwrap();
    assert!(batch::is_processed(&out_dir, "invoice1"));
}
