//! 图层规则应用
//!
//! 只处理源图层当前存在的规则（按规则表顺序，选择在应用前一次性完成）。
//! 对每条规则：确保目标图层存在并设置颜色、线宽、线型，
//! 然后把各布局中源图层上的实体移到目标图层。源图层保留，交由图层回收处理。

use crate::report::{Skip, Stage, StageReport};
use dxfnorm_core::document::Document;
use dxfnorm_core::properties::{Color, LineWeight};
use dxfnorm_core::resources::CONTINUOUS;
use dxfnorm_core::rule::{LayerRule, RuleTable};
use tracing::{debug, info};

/// 表示“不设置线型”的占位值
const LINE_TYPE_SENTINELS: [&str; 3] = ["none", "", "nan"];

/// 解析规则中的线型名称
///
/// 占位值返回 `None`；未定义的线型回退为 `Continuous`。
fn resolve_line_type(doc: &Document, requested: &str) -> Option<String> {
    let requested = requested.trim();
    if LINE_TYPE_SENTINELS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(requested))
    {
        return None;
    }

    match doc.line_types().get(requested) {
        Some(def) => Some(def.name.clone()),
        None => {
            debug!(line_type = requested, "undefined line type, using Continuous");
            Some(CONTINUOUS.to_string())
        }
    }
}

/// 配置目标图层，返回被拒绝的属性设置
fn configure_destination(doc: &mut Document, rule: &LayerRule) -> Vec<Skip> {
    let mut rejected = Vec::new();
    let line_type = resolve_line_type(doc, &rule.line_type);
    let layer = doc.layers_mut().ensure_layer(&rule.destination);
    let target = format!("layer {}", rule.destination);

    if (1..=255).contains(&rule.color) {
        layer.color = Color::Index(rule.color as u8);
    } else {
        rejected.push(Skip::new(
            target.clone(),
            format!("color {} outside 1..=255", rule.color),
        ));
    }

    match LineWeight::from_hundredths(rule.line_weight) {
        Some(weight) => layer.line_weight = weight,
        None => rejected.push(Skip::new(
            target.clone(),
            format!(
                "line weight {} outside 0..={}",
                rule.line_weight,
                LineWeight::MAX_HUNDREDTHS
            ),
        )),
    }

    match line_type {
        Some(name) => layer.line_type = name,
        None => rejected.push(Skip::new(target, "line type not set (placeholder value)")),
    }

    rejected
}

/// 应用图层规则表
pub fn apply_layer_rules(doc: &mut Document, rules: &RuleTable) -> StageReport {
    let mut report = StageReport::new(Stage::LayerRules);

    let selected: Vec<&LayerRule> = rules
        .iter()
        .filter(|rule| doc.layers().contains(&rule.source))
        .collect();

    for rule in selected {
        for skip in configure_destination(doc, rule) {
            report.skip(skip);
        }

        let moved = doc.move_entities(&rule.source, &rule.destination);
        report.changed += moved;
        info!(
            source = %rule.source,
            destination = %rule.destination,
            moved,
            "applied layer rule"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::entity::Entity;
    use dxfnorm_core::geometry::{Geometry, Point};
    use dxfnorm_core::resources::LineTypeDef;

    fn point_on(layer: &str) -> Entity {
        Entity::new(Geometry::Point(Point::new(0.0, 0.0))).on_layer(layer)
    }

    fn doc_with_layer(layer: &str) -> Document {
        let mut doc = Document::new();
        doc.layers_mut().ensure_layer(layer);
        doc.model_space_mut().add_entity(point_on(layer));
        doc
    }

    #[test]
    fn test_rule_moves_entities_and_configures_layer() {
        let mut doc = doc_with_layer("A");
        let rules: RuleTable = [LayerRule::new("A", "B", 1, 25, "continuous")]
            .into_iter()
            .collect();

        let report = apply_layer_rules(&mut doc, &rules);

        assert_eq!(report.changed, 1);
        assert!(report.is_clean());
        let layer = doc.layers().get_layer("B").unwrap();
        assert_eq!(layer.color, Color::RED);
        assert_eq!(layer.line_weight, LineWeight::Hundredths(25));
        assert_eq!(layer.line_type, "Continuous");
        assert_eq!(doc.model_space().entities()[0].layer, "B");
        assert!(doc.layers().contains("A"));
    }

    #[test]
    fn test_unmatched_and_case_sensitive() {
        let mut doc = doc_with_layer("a");
        let rules: RuleTable = [LayerRule::new("A", "B", 1, 25, "continuous")]
            .into_iter()
            .collect();

        let report = apply_layer_rules(&mut doc, &rules);

        assert_eq!(report.changed, 0);
        assert!(!doc.layers().contains("B"));
        assert_eq!(doc.model_space().entities()[0].layer, "a");
    }

    #[test]
    fn test_invalid_properties_are_skipped() {
        let mut doc = doc_with_layer("A");
        let rules: RuleTable = [LayerRule::new("A", "B", 256, 500, "nan")]
            .into_iter()
            .collect();

        let report = apply_layer_rules(&mut doc, &rules);

        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.changed, 1);
        let layer = doc.layers().get_layer("B").unwrap();
        assert_eq!(layer.color, Color::WHITE);
        assert_eq!(layer.line_type, "Continuous");
    }

    #[test]
    fn test_line_type_lookup() {
        let mut doc = doc_with_layer("A");
        doc.layers_mut().ensure_layer("C");
        doc.line_types_mut()
            .add(LineTypeDef::new("DASHED", "__ __", vec![12.0, -6.0]));
        let rules: RuleTable = [
            LayerRule::new("A", "B", 3, 0, "dashed"),
            LayerRule::new("C", "D", 3, 0, "HIDDEN2"),
        ]
        .into_iter()
        .collect();

        apply_layer_rules(&mut doc, &rules);

        assert_eq!(doc.layers().get_layer("B").unwrap().line_type, "DASHED");
        assert_eq!(doc.layers().get_layer("D").unwrap().line_type, "Continuous");
    }

    #[test]
    fn test_selection_uses_initial_layers() {
        let mut doc = doc_with_layer("A");
        let rules: RuleTable = [
            LayerRule::new("A", "B", 1, 0, "continuous"),
            LayerRule::new("B", "C", 2, 0, "continuous"),
        ]
        .into_iter()
        .collect();

        apply_layer_rules(&mut doc, &rules);

        assert_eq!(doc.model_space().entities()[0].layer, "B");
        assert!(!doc.layers().contains("C"));
    }
}
