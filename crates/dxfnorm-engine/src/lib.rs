//! DXFNORM 规范化引擎
//!
//! 按固定顺序对图纸文档执行：
//! - 块展开（`flatten`）与块清理（`purge`）
//! - 图层规则（`rules`）与样式归一（`style`）
//! - 图章合并（`stamp`）、修订云（`revcloud`）
//! - 图层回收（`reclaim`）
//!
//! 以及批处理（`batch`）和多文档合并（`consolidate`）。
//! 单个实体、块或图层的失败不会中断处理，而是作为 [`report::Skip`] 记录在报告中。

pub mod batch;
pub mod consolidate;
pub mod error;
pub mod flatten;
pub mod options;
pub mod pipeline;
pub mod purge;
pub mod reclaim;
pub mod report;
pub mod revcloud;
pub mod rules;
pub mod stamp;
pub mod style;

pub use batch::{normalize_batch, BatchOutcome};
pub use consolidate::{consolidate, ConsolidationReport, NamedDocument};
pub use error::EngineError;
pub use options::NormalizeOptions;
pub use pipeline::normalize;
pub use report::{BatchReport, FileReport, Skip, Stage, StageReport};
pub use stamp::PreparedStamp;
