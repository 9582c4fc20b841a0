pub mod cache;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod storage;

pub use cache::{MemoryResultCache, MokaResultCache, ResultCache};
pub use config::{load_config, load_effective_config, Config};
pub use error::{ConfigError, DocidError, ProcessError, Result, StorageError};
pub use ocr::{AidocClient, Completion, OcrError, OcrJobOrchestrator, OcrService};
pub use pipeline::{DetectionStrategy, IdentificationPipeline, IdentificationResult, IdentifyError};
pub use processor::{CodeDetector, PageRasterizer, PdftoppmRasterizer, QrDetector, ZbarDetector};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
