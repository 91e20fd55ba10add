use crate::config::TableMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDiag {
    pub python_exe: String,
    pub python_version: String,
    pub docling_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub input_pdf: String,
    pub do_table_structure: bool,
    pub table_mode: TableMode,
    pub do_ocr: bool,
}

/// The five representations exported from one converted document.
/// `json` stays an opaque nested mapping; only its top-level `texts`
/// array is ever inspected, by the texts-only derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExports {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub json: serde_json::Value,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub doctags: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub ok: bool,
    #[serde(default)]
    pub exports: Option<DocumentExports>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
