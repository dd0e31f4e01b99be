//! 流水线错误定义
//!
//! 只有整批失败与单文件失败会以错误形式返回；
//! 单个实体/块/图层的失败记录在 [`crate::report::StageReport`] 中。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No files were normalized ({failed} failed)")]
    NoFilesNormalized { failed: usize },

    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}
