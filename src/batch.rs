use crate::{
    config::Config,
    engine::{ConvertRequest, DocumentExports, Engine},
    extract,
    report::DocumentRecord,
    util::{ensure_dir, sha256_file},
};
use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Sequential batch converter: discovers inputs, skips bundles whose marker
/// file is present, converts the rest one at a time through the engine.
pub struct Batch<E: Engine> {
    cfg: Config,
    engine: E,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
}

pub struct RunOutcome {
    pub summary: RunSummary,
    pub documents: Vec<DocumentRecord>,
}

/// Lists `*.pdf` files directly inside `input_dir`, sorted by name.
/// Extension matching is case-sensitive, like the glob it replaces.
pub fn discover(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        bail!("input directory not found: {}", input_dir.display());
    }
    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("reading input directory: {}", input_dir.display()))?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("pdf") {
            pdfs.push(path);
        }
    }
    if pdfs.is_empty() {
        bail!("no PDF files found in {}", input_dir.display());
    }
    pdfs.sort();
    Ok(pdfs)
}

pub fn stem_of(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("cannot derive stem from {}", path.display()))
}

/// A document counts as processed iff its `.text` output exists non-empty.
/// Advisory only: the remaining bundle files are not validated.
pub fn is_processed(out_dir: &Path, stem: &str) -> bool {
    let marker = out_dir.join(stem).join(format!("{stem}.text"));
    std::fs::metadata(&marker)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

impl<E: Engine> Batch<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
        }
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let input_dir = PathBuf::from(&self.cfg.paths.input_dir);
        let out_dir = PathBuf::from(&self.cfg.paths.out_dir);

        let inputs = discover(&input_dir)?;
        ensure_dir(&out_dir)?;

        let mut summary = RunSummary::default();
        let mut documents = Vec::with_capacity(inputs.len());

        for input in &inputs {
            let stem = stem_of(input)?;

            if !self.cfg.run.force && is_processed(&out_dir, &stem) {
                info!("skipping {stem}: output bundle already present");
                summary.skipped += 1;
                documents.push(DocumentRecord::skipped(&stem));
                continue;
            }

            let started = Instant::now();
            match self.convert_one(input) {
                Ok(_) => {
                    summary.processed += 1;
                    let input_sha256 = match sha256_file(input) {
                        Ok(hash) => Some(hash),
                        Err(err) => {
                            warn!("{stem}: hashing input failed: {err:#}");
                            None
                        }
                    };
                    documents.push(DocumentRecord::converted(
                        &stem,
                        input_sha256,
                        started.elapsed().as_millis() as u64,
                    ));
                }
                Err(err) if self.cfg.run.fail_fast => {
                    return Err(err.context(format!("conversion failed for {stem}")));
                }
                Err(err) => {
                    error!("{stem}: {err:#}");
                    summary.failed += 1;
                    documents.push(DocumentRecord::failed(
                        &stem,
                        format!("{err:#}"),
                        started.elapsed().as_millis() as u64,
                    ));
                }
            }
        }

        Ok(RunOutcome { summary, documents })
    }

    /// Converts a single PDF and writes its six-file bundle. Returns the
    /// bundle directory.
    pub fn convert_one(&self, input: &Path) -> Result<PathBuf> {
        let stem = stem_of(input)?;
        let bundle_dir = Path::new(&self.cfg.paths.out_dir).join(&stem);
        ensure_dir(&bundle_dir)?;

        info!("processing {stem}");

        let req = ConvertRequest {
            input_pdf: input.display().to_string(),
            do_table_structure: self.cfg.docling.pipeline.do_table_structure,
            table_mode: self.cfg.docling.pipeline.table_mode,
            do_ocr: self.cfg.docling.pipeline.do_ocr,
        };
        let exports = self
            .engine
            .convert(&req)
            .with_context(|| format!("converting {}", input.display()))?;

        persist_bundle(&bundle_dir, &stem, &exports)?;
        info!("saved outputs to {}", bundle_dir.display());
        Ok(bundle_dir)
    }
}

fn persist_bundle(bundle_dir: &Path, stem: &str, exports: &DocumentExports) -> Result<()> {
    write_file(bundle_dir, &format!("{stem}.text"), &exports.text)?;
    write_file(bundle_dir, &format!("{stem}.markdown"), &exports.markdown)?;
    write_file(bundle_dir, &format!("{stem}.html"), &exports.html)?;
    write_file(bundle_dir, &format!("{stem}.doctags"), &exports.doctags)?;

    // serde_json keeps non-ASCII characters unescaped, matching the
    // exporter's own UTF-8 serialization.
    let json_pretty = serde_json::to_string_pretty(&exports.json)?;
    write_file(bundle_dir, &format!("{stem}.json"), &json_pretty)?;

    let texts_doc = extract::texts_only_document(&exports.json);
    write_file(
        bundle_dir,
        &format!("{stem}_texts_only.json"),
        &serde_json::to_string_pretty(&texts_doc)?,
    )?;
    Ok(())
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))
}
