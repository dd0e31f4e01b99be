//! 修订云转换
//!
//! 把目标图层上的闭合多段线替换为扇贝形修订云：
//! 轮廓的每条边被等分为不超过弧段长度的若干段，每段是一段凸度为 0.5、向外凸出的圆弧。

use crate::report::{Skip, Stage, StageReport};
use dxfnorm_core::document::Document;
use dxfnorm_core::entity::Entity;
use dxfnorm_core::geometry::{Geometry, Polyline, PolylineVertex};
use dxfnorm_core::math::{points_within, signed_area, BoundingBox2, Point2, CLOSURE_TOLERANCE, EPSILON};
use dxfnorm_core::rule::RuleTable;
use tracing::{debug, info};

/// 默认弧段长度（图纸单位）
pub const DEFAULT_SEGMENT_LENGTH: f64 = 6.0;

/// 修订云弧段凸度（约 53° 的圆弧）
pub const CLOUD_BULGE: f64 = 0.5;

/// 修订云转换参数
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionCloudSpec {
    /// 目标图层（已经过规则表重映射）
    pub layer: String,
    /// 弧段最大长度
    pub segment_length: f64,
}

impl RevisionCloudSpec {
    /// 以规则表解析来源图层：若来源图层本身被规则重命名，则指向规则的目标图层
    pub fn resolve(source_layer: &str, rules: &RuleTable, segment_length: f64) -> Self {
        Self {
            layer: rules.resolve(source_layer).to_string(),
            segment_length,
        }
    }
}

/// 按弧段长度生成修订云多段线
pub fn build_cloud(outline: &[Point2], segment_length: f64) -> Result<Polyline, Skip> {
    // 去掉相邻重复点
    let mut points: Vec<Point2> = Vec::with_capacity(outline.len());
    for p in outline {
        if points.last().map_or(true, |last| !points_within(last, p, CLOSURE_TOLERANCE)) {
            points.push(*p);
        }
    }
    if points.len() > 1 && points_within(&points[0], &points[points.len() - 1], CLOSURE_TOLERANCE) {
        points.pop();
    }

    if points.len() < 3 {
        return Err(Skip::new(
            "outline",
            format!("{} distinct vertices, need at least 3", points.len()),
        ));
    }
    if BoundingBox2::from_points(points.iter().copied()).is_degenerate(CLOSURE_TOLERANCE) {
        return Err(Skip::new("outline", "bounding box has zero area"));
    }
    let area = signed_area(&points);
    if area.abs() <= EPSILON {
        return Err(Skip::new("outline", "vertices are collinear"));
    }

    // 正凸度的弧位于行进方向右侧：逆时针轮廓向外即为右侧
    let bulge = if area > 0.0 { CLOUD_BULGE } else { -CLOUD_BULGE };
    let mut vertices = Vec::new();

    for i in 0..points.len() {
        let start = points[i];
        let end = points[(i + 1) % points.len()];
        let edge = end - start;
        let pieces = (edge.norm() / segment_length).ceil().max(1.0) as usize;

        for k in 0..pieces {
            let t = k as f64 / pieces as f64;
            vertices.push(PolylineVertex::with_bulge(start + edge * t, bulge));
        }
    }

    Ok(Polyline::new(vertices, true))
}

/// 可转换的候选：目标图层上的闭合多段线（已是修订云的除外）
fn is_candidate(entity: &Entity, layer: &str) -> bool {
    if !entity.layer.eq_ignore_ascii_case(layer) {
        return false;
    }
    match &entity.geometry {
        Geometry::Polyline(pl) => pl.is_closed_within(CLOSURE_TOLERANCE) && !pl.is_scalloped(),
        _ => false,
    }
}

/// 转换所有布局中目标图层上的闭合轮廓
pub fn convert_revision_clouds(doc: &mut Document, spec: &RevisionCloudSpec) -> StageReport {
    let mut report = StageReport::new(Stage::RevisionCloud);

    for layout in doc.layouts_mut() {
        for entity in layout.entities() {
            if entity.layer.eq_ignore_ascii_case(&spec.layer) && !is_candidate(entity, &spec.layer) {
                let reason = match &entity.geometry {
                    Geometry::Polyline(pl) if pl.is_scalloped() => continue,
                    Geometry::Polyline(_) => "open polyline",
                    _ => "not a polyline",
                };
                debug!(entity = entity.id.0, kind = entity.geometry.type_name(), reason, "left unchanged");
                report.skip(Skip::new(
                    format!("{} {}", entity.geometry.type_name(), entity.id.0),
                    reason,
                ));
            }
        }

        let outlines = layout.take_where(|e| is_candidate(e, &spec.layer));
        for original in outlines {
            let Geometry::Polyline(pl) = &original.geometry else {
                continue;
            };

            match build_cloud(&pl.outline_points(CLOSURE_TOLERANCE), spec.segment_length) {
                Ok(cloud) => {
                    let layer = original.layer.clone();
                    layout.add_entity(Entity::new(Geometry::Polyline(cloud)).on_layer(layer));
                    report.changed += 1;
                }
                Err(skip) => {
                    report.skip(Skip::new(
                        format!("Polyline {}", original.id.0),
                        skip.reason,
                    ));
                    // 无法生成修订云时保留原轮廓
                    layout.add_entity(original);
                }
            }
        }
    }

    info!(layer = %spec.layer, converted = report.changed, "revision clouds");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::geometry::Line;

    fn rectangle(width: f64, height: f64, closed: bool) -> Polyline {
        Polyline::from_points(
            [
                Point2::new(0.0, 0.0),
                Point2::new(width, 0.0),
                Point2::new(width, height),
                Point2::new(0.0, height),
            ],
            closed,
        )
    }

    #[test]
    fn test_cloud_segments() {
        let cloud = build_cloud(&rectangle(12.0, 6.0, true).outline_points(CLOSURE_TOLERANCE), 6.0)
            .unwrap();

        // 12 -> 2 段，6 -> 1 段
        assert_eq!(cloud.vertex_count(), 6);
        assert!(cloud.closed);
        assert!(cloud.is_scalloped());
        assert!(cloud.vertices.iter().all(|v| (v.bulge - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_clockwise_outline_bulges_negative() {
        let mut points = rectangle(10.0, 10.0, true).outline_points(CLOSURE_TOLERANCE);
        points.reverse();
        let cloud = build_cloud(&points, 6.0).unwrap();

        assert!(cloud.vertices.iter().all(|v| v.bulge < 0.0));
    }

    #[test]
    fn test_degenerate_outlines() {
        let flat = [
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(10.0, 0.0),
        ];
        assert!(build_cloud(&flat, 6.0).is_err());

        let duplicated = [Point2::new(0.0, 0.0), Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)];
        assert!(build_cloud(&duplicated, 6.0).is_err());
    }

    #[test]
    fn test_resolve_through_rules() {
        let mut rules = RuleTable::new();
        rules.insert(dxfnorm_core::rule::LayerRule::new("LAYER099", "REV", 1, 0, "continuous"));

        assert_eq!(RevisionCloudSpec::resolve("LAYER099", &rules, 6.0).layer, "REV");
        assert_eq!(RevisionCloudSpec::resolve("OTHER", &rules, 6.0).layer, "OTHER");
    }

    #[test]
    fn test_convert_on_layer() {
        let mut doc = Document::new();
        let msp = doc.model_space_mut();
        msp.add_entity(Entity::new(Geometry::Polyline(rectangle(10.0, 5.0, true))).on_layer("layer099"));
        msp.add_entity(Entity::new(Geometry::Polyline(rectangle(10.0, 5.0, false))).on_layer("LAYER099"));
        msp.add_entity(
            Entity::new(Geometry::Line(Line::new(Point2::origin(), Point2::new(1.0, 0.0))))
                .on_layer("LAYER099"),
        );
        msp.add_entity(Entity::new(Geometry::Polyline(rectangle(10.0, 5.0, true))).on_layer("OTHER"));

        let spec = RevisionCloudSpec {
            layer: "LAYER099".into(),
            segment_length: DEFAULT_SEGMENT_LENGTH,
        };
        let report = convert_revision_clouds(&mut doc, &spec);

        assert_eq!(report.changed, 1);
        assert_eq!(report.skipped.len(), 2);
        let clouds: Vec<&Entity> = doc
            .model_space()
            .entities()
            .iter()
            .filter(|e| matches!(&e.geometry, Geometry::Polyline(pl) if pl.is_scalloped()))
            .collect();
        assert_eq!(clouds.len(), 1);
        assert_eq!(clouds[0].layer, "layer099");
        assert!(clouds[0].properties.is_by_layer());

        // 已是修订云的实体不会再被转换
        let again = convert_revision_clouds(&mut doc, &spec);
        assert_eq!(again.changed, 0);
    }

    #[test]
    fn test_zero_area_outline_kept_beside_cloud() {
        let flat = Polyline::from_points(
            [Point2::new(0.0, 0.0), Point2::new(5.0, 0.0), Point2::new(10.0, 0.0)],
            true,
        );
        let mut doc = Document::new();
        let msp = doc.model_space_mut();
        let flat_id = msp.add_entity(Entity::new(Geometry::Polyline(flat)).on_layer("REV"));
        msp.add_entity(Entity::new(Geometry::Polyline(rectangle(10.0, 5.0, true))).on_layer("REV"));

        let spec = RevisionCloudSpec {
            layer: "REV".into(),
            segment_length: DEFAULT_SEGMENT_LENGTH,
        };
        let report = convert_revision_clouds(&mut doc, &spec);

        assert_eq!(report.changed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, "bounding box has zero area");

        let entities = doc.model_space().entities();
        assert_eq!(entities.len(), 2);
        let clouds = entities
            .iter()
            .filter(|e| matches!(&e.geometry, Geometry::Polyline(pl) if pl.is_scalloped()))
            .count();
        assert_eq!(clouds, 1);
        let kept = entities.iter().find(|e| e.id == flat_id).unwrap();
        let Geometry::Polyline(pl) = &kept.geometry else {
            panic!("expected the original outline");
        };
        assert_eq!(pl.vertex_count(), 3);
        assert!(!pl.is_scalloped());
    }
}
