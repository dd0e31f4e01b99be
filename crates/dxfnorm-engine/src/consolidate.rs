//! 多文档合并
//!
//! 把若干已规范化的文档（按名称排序）合并为一个新文档：
//! 每个来源文档对应一个图纸空间布局 `FL 01`、`FL 02`……（重名时追加来源文件名），
//! 导入缺少的图层、线型、文字样式与块定义，并复制来源主布局的实体。

use crate::report::Skip;
use dxfnorm_core::document::Document;
use dxfnorm_core::layout::Layout;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// 带名称的文档（名称通常是来源文件名）
#[derive(Debug, Clone)]
pub struct NamedDocument {
    pub name: String,
    pub document: Document,
}

impl NamedDocument {
    pub fn new(name: impl Into<String>, document: Document) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }

    /// 不含扩展名的文件名
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// 单个来源的合并结果
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedSource {
    pub source: String,
    pub layout: String,
    pub entities: usize,
}

/// 合并报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    pub sources: Vec<ConsolidatedSource>,
    pub skipped: Vec<Skip>,
}

/// 合并文档
pub fn consolidate(sources: &[NamedDocument]) -> (Document, ConsolidationReport) {
    let mut merged = Document::with_name("consolidated");
    let mut report = ConsolidationReport::default();

    let mut ordered: Vec<&NamedDocument> = sources.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    for (i, source) in ordered.into_iter().enumerate() {
        let mut layout_name = format!("FL {:02}", i + 1);
        if merged.layout(&layout_name).is_some() {
            layout_name = format!("{layout_name}_{}", source.stem());
        }

        import_tables(&mut merged, &source.document, &mut report);

        let entities = source
            .document
            .model_space()
            .entities()
            .iter()
            .map(|e| e.duplicate());
        match merged.add_layout(Layout::paper(layout_name.as_str())) {
            Ok(layout) => {
                layout.extend(entities);
                let count = layout.entity_count();
                info!(source = %source.name, layout = %layout_name, entities = count, "consolidated");
                report.sources.push(ConsolidatedSource {
                    source: source.name.clone(),
                    layout: layout_name,
                    entities: count,
                });
            }
            Err(e) => {
                warn!(source = %source.name, "cannot create layout: {e}");
                report.skipped.push(Skip::new(source.name.clone(), e.to_string()));
            }
        }
    }

    (merged, report)
}

/// 导入目标缺少的表项；同名表项以已有的为准
fn import_tables(target: &mut Document, source: &Document, report: &mut ConsolidationReport) {
    for layer in source.layers().all_layers() {
        target.layers_mut().insert_if_absent(layer.clone());
    }
    for line_type in source.line_types().iter() {
        target.line_types_mut().add(line_type.clone());
    }
    for style in source.text_styles().iter() {
        target.text_styles_mut().add(style.clone());
    }
    for name in source.blocks().block_names() {
        if dxfnorm_core::block::is_layout_root_name(name) {
            continue;
        }
        let Some(block) = source.blocks().get_block(name) else {
            continue;
        };
        if target.add_block(block.clone()).is_err() {
            report.skipped.push(Skip::new(
                format!("block {name}"),
                format!("already defined; keeping the definition imported first ({})", source.name),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::block::BlockDefinition;
    use dxfnorm_core::entity::Entity;
    use dxfnorm_core::geometry::{Geometry, Point};
    use dxfnorm_core::math::Point2;

    fn source(name: &str, layer: &str, points: usize) -> NamedDocument {
        let mut doc = Document::with_name(name);
        doc.layers_mut().ensure_layer(layer);
        for i in 0..points {
            doc.model_space_mut()
                .add_entity(Entity::new(Geometry::Point(Point::new(i as f64, 0.0))).on_layer(layer));
        }
        NamedDocument::new(name, doc)
    }

    #[test]
    fn test_one_layout_per_source_in_name_order() {
        let sources = vec![source("b.dxf", "WALLS", 2), source("a.dxf", "DOORS", 1)];

        let (merged, report) = consolidate(&sources);

        let names: Vec<&str> = merged.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Model", "FL 01", "FL 02"]);
        assert_eq!(report.sources[0].source, "a.dxf");
        assert_eq!(merged.layout("FL 01").unwrap().entity_count(), 1);
        assert_eq!(merged.layout("FL 02").unwrap().entity_count(), 2);
        assert!(merged.layers().contains("WALLS"));
        assert!(merged.layers().contains("DOORS"));
        assert_eq!(merged.model_space().entity_count(), 0);
    }

    #[test]
    fn test_duplicate_blocks_keep_first() {
        let mut a = source("a.dxf", "X", 0);
        let mut b = source("b.dxf", "X", 0);
        a.document
            .add_block(BlockDefinition::new("TITLE", Point2::origin()))
            .unwrap();
        b.document
            .add_block(BlockDefinition::new("TITLE", Point2::new(1.0, 1.0)))
            .unwrap();

        let (merged, report) = consolidate(&[a, b]);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(merged.blocks().get_block("TITLE").unwrap().base_point, Point2::origin());
    }

    #[test]
    fn test_stem() {
        assert_eq!(NamedDocument::new("plans/FL-3.dxf", Document::new()).stem(), "FL-3");
    }
}
