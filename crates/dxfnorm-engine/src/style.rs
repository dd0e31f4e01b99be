//! 样式归一：所有实体回退到随层样式

use crate::report::{Stage, StageReport};
use dxfnorm_core::document::Document;

/// 清除各布局、各块定义及块参照属性中所有实体的样式覆盖
pub fn normalize_styles(doc: &mut Document) -> StageReport {
    let mut report = StageReport::new(Stage::Styles);
    doc.for_each_entity_mut(|entity| {
        if !entity.properties.is_by_layer() {
            entity.properties.reset_to_by_layer();
            report.changed += 1;
        }
    });
    tracing::debug!(changed = report.changed, "normalized entity styles");
    report
}
