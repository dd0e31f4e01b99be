//! DXFNORM 文件处理
//!
//! 支持：
//! - `.dxf` 导入/导出
//! - 图层规则表（`.csv` / `.json`）读取

pub mod dxf_io;
pub mod error;
pub mod rule_sheet;

pub use dxf_io::{export, import};
pub use error::FileError;
pub use rule_sheet::read_rule_sheet;
