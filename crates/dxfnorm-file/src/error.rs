//! 文件操作错误定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("DXF error: {0}")]
    Dxf(String),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Rule sheet is missing columns: {}", .0.join(", "))]
    RuleSheet(Vec<String>),
}
