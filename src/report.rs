use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started: String,
    pub finished: String,
    pub input_dir: String,
    pub out_dir: String,
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
    pub documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub stem: String,
    pub status: DocStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    Converted,
    Skipped,
    Failed,
}

impl DocumentRecord {
    pub fn converted(stem: &str, input_sha256: Option<String>, elapsed_ms: u64) -> Self {
        Self {
            stem: stem.to_string(),
            status: DocStatus::Converted,
            input_sha256,
            elapsed_ms: Some(elapsed_ms),
            error: None,
        }
    }

    pub fn skipped(stem: &str) -> Self {
        Self {
            stem: stem.to_string(),
            status: DocStatus::Skipped,
            input_sha256: None,
            elapsed_ms: None,
            error: None,
        }
    }

    pub fn failed(stem: &str, error: String, elapsed_ms: u64) -> Self {
        Self {
            stem: stem.to_string(),
            status: DocStatus::Failed,
            input_sha256: None,
            elapsed_ms: Some(elapsed_ms),
            error: Some(error),
        }
    }
}
