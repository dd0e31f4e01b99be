//! 图层回收：删除没有任何实体引用的图层
//!
//! 引用集合覆盖所有布局、所有块定义以及块参照的属性；`0` 与 `Defpoints` 始终保留。
//! 重复执行不会产生进一步变化。

use crate::report::{Skip, Stage, StageReport};
use dxfnorm_core::document::Document;
use tracing::debug;

/// 回收未使用的图层
pub fn reclaim_layers(doc: &mut Document, stage: Stage) -> StageReport {
    let mut report = StageReport::new(stage);
    match doc.remove_unreferenced_layers() {
        Ok(removed) => {
            debug!(stage = stage.name(), ?removed, "reclaimed layers");
            report.changed = removed.len();
        }
        Err(e) => report.skip(Skip::new("layer table", e.to_string())),
    }
    report
}
