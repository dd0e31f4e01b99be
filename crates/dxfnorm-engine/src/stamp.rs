//! 图章合并（Logo / 图框）
//!
//! 图章文档只准备一次（展开 + 清理），之后以只读方式在各文件间共享。
//! 合并时先删除目标主布局中已有的光栅图像（图章替换而非叠加），
//! 再复制目标缺少的线型、文字样式与图层定义，最后把图章主布局中的实体逐个复制过去。

use crate::flatten::flatten_document;
use crate::purge::purge_blocks;
use crate::report::{Skip, Stage, StageReport};
use dxfnorm_core::document::Document;
use dxfnorm_core::layer::Layer;
use tracing::{debug, info};

/// 已展开、已清理的图章文档
#[derive(Debug, Clone)]
pub struct PreparedStamp {
    document: Document,
}

impl PreparedStamp {
    /// 展开并清理图章文档
    pub fn new(mut document: Document, max_passes: usize) -> Self {
        let flatten = flatten_document(&mut document, max_passes);
        let purge = purge_blocks(&mut document);
        info!(
            stamp = %document.name,
            expanded = flatten.changed,
            purged = purge.changed,
            entities = document.model_space().entity_count(),
            "prepared stamp"
        );
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// 把图章合并进目标文档
pub fn merge_stamp(target: &mut Document, stamp: &PreparedStamp) -> StageReport {
    let mut report = StageReport::new(Stage::Stamp);
    let source = stamp.document();

    let images = target.model_space_mut().take_where(|e| e.geometry.is_image());
    debug!(removed = images.len(), "removed previous stamp images");
    report.changed += images.len();

    for line_type in source.line_types().iter() {
        if target.line_types_mut().add(line_type.clone()) {
            report.changed += 1;
        }
    }
    for style in source.text_styles().iter() {
        if target.text_styles_mut().add(style.clone()) {
            report.changed += 1;
        }
    }

    for entity in source.model_space().entities() {
        if !target.layers().contains(&entity.layer) {
            let layer = source
                .layers()
                .get_layer(&entity.layer)
                .cloned()
                .unwrap_or_else(|| Layer::new(entity.layer.as_str()));
            if target.layers_mut().insert_if_absent(layer) {
                debug!(layer = %entity.layer, "imported stamp layer");
            }
        }

        if let Some(block) = entity.block_name() {
            if !target.blocks().contains(block) {
                report.skip(Skip::new(
                    format!("{} {}", entity.geometry.type_name(), entity.id.0),
                    format!("block definition {block} missing from target"),
                ));
                continue;
            }
        }

        target.model_space_mut().add_entity(entity.duplicate());
        report.changed += 1;
    }

    report
}
