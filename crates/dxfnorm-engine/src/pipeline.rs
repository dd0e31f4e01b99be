//! 单文件规范化流水线
//!
//! 展开 → 清理块 → 回收图层 → 图层规则 → 样式归一 → 图章合并（可选）
//! → 回收图层 → 修订云（可选）

use crate::error::EngineError;
use crate::flatten::flatten_document;
use crate::options::NormalizeOptions;
use crate::purge::purge_blocks;
use crate::reclaim::reclaim_layers;
use crate::report::{FileReport, Stage};
use crate::revcloud::{convert_revision_clouds, RevisionCloudSpec};
use crate::rules::apply_layer_rules;
use crate::stamp::{merge_stamp, PreparedStamp};
use crate::style::normalize_styles;
use dxfnorm_core::document::Document;
use dxfnorm_core::rule::RuleTable;
use tracing::{debug, info};

/// 规范化一个文档（原地修改）
pub fn normalize(
    doc: &mut Document,
    rules: &RuleTable,
    options: &NormalizeOptions,
    stamp: Option<&PreparedStamp>,
) -> Result<FileReport, EngineError> {
    options.validate()?;
    let mut report = FileReport::new(doc.name.as_str());

    report.push(flatten_document(doc, options.flatten_max_passes));
    report.push(purge_blocks(doc));
    report.push(reclaim_layers(doc, Stage::ReclaimPre));
    report.push(apply_layer_rules(doc, rules));
    report.push(normalize_styles(doc));

    if let Some(stamp) = stamp {
        report.push(merge_stamp(doc, stamp));
    }

    report.push(reclaim_layers(doc, Stage::ReclaimPost));

    if options.keep_revision_cloud {
        let spec = RevisionCloudSpec::resolve(
            &options.revision_cloud_source_layer,
            rules,
            options.cloud_segment_length,
        );
        report.push(convert_revision_clouds(doc, &spec));
    }

    if options.keep_hatches {
        debug!(layer = %options.hatch_source_layer, "keep_hatches is accepted but has no effect");
    }

    report.finish();
    info!(
        file = %report.name,
        entities = doc.entity_count(),
        skipped = report.skipped_count(),
        duration_ms = report.duration_ms,
        "normalized"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::entity::Entity;
    use dxfnorm_core::geometry::{Geometry, Line};
    use dxfnorm_core::math::Point2;
    use dxfnorm_core::rule::LayerRule;

    #[test]
    fn test_stage_order() {
        let mut doc = Document::with_name("a.dxf");
        doc.model_space_mut().add_entity(Entity::new(Geometry::Line(Line::new(
            Point2::origin(),
            Point2::new(1.0, 1.0),
        ))));
        let options = NormalizeOptions {
            keep_revision_cloud: true,
            ..Default::default()
        };

        let report = normalize(&mut doc, &RuleTable::new(), &options, None).unwrap();

        let stages: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Flatten,
                Stage::Purge,
                Stage::ReclaimPre,
                Stage::LayerRules,
                Stage::Styles,
                Stage::ReclaimPost,
                Stage::RevisionCloud,
            ]
        );
        assert_eq!(report.name, "a.dxf");
    }

    #[test]
    fn test_invalid_options_fail_the_file() {
        let mut doc = Document::new();
        let options = NormalizeOptions {
            cloud_segment_length: -1.0,
            ..Default::default()
        };
        let rules: RuleTable = [LayerRule::new("A", "B", 1, 25, "continuous")]
            .into_iter()
            .collect();

        assert!(normalize(&mut doc, &rules, &options, None).is_err());
    }
}
