use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub run: Run,
    #[serde(default)]
    pub docling: Docling,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Directory scanned (non-recursively) for `*.pdf` inputs.
    pub input_dir: String,
    /// Root under which one bundle directory per input stem is written.
    pub out_dir: String,
    pub scripts_dir: String,
    pub docling_artifacts_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            input_dir: "orders".into(),
            out_dir: "outputs".into(),
            scripts_dir: "scripts".into(),
            docling_artifacts_dir: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    /// Reconvert documents even when their marker file is present.
    pub force: bool,
    /// Abort the whole batch on the first failed document instead of
    /// counting it and continuing.
    pub fail_fast: bool,
    pub print_summary: bool,
}
impl Default for Run {
    fn default() -> Self {
        Self {
            force: false,
            fail_fast: false,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Docling {
    pub python_exe: String,
    pub convert_timeout_seconds: u64,
    pub doctor_timeout_seconds: u64,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub pipeline: Pipeline,
}
impl Default for Docling {
    fn default() -> Self {
        Self {
            python_exe: "auto".into(),
            convert_timeout_seconds: 600,
            doctor_timeout_seconds: 60,
            env: Default::default(),
            pipeline: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub do_table_structure: bool,
    pub table_mode: TableMode,
    pub do_ocr: bool,
}
impl Default for Pipeline {
    fn default() -> Self {
        Self {
            do_table_structure: true,
            table_mode: TableMode::Accurate,
            do_ocr: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableMode {
    Fast,
    Accurate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report_json: true,
            report_filename: "run-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_python_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_python_stderr: true,
            dump_effective_config: true,
        }
    }
}
