pub mod python;
pub mod types;

use anyhow::Result;

pub use types::{ConvertRequest, ConvertResponse, DocumentExports, EngineDiag};

/// Boundary to the external document converter. One synchronous call per
/// document; implementations own interpreter resolution, timeouts, and
/// response validation.
pub trait Engine {
    fn doctor(&self) -> Result<EngineDiag>;
    fn convert(&self, req: &ConvertRequest) -> Result<DocumentExports>;
}
