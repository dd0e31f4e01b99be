//! 块展开（Explode）
//!
//! 逐轮把布局中的块参照替换为其块定义中实体的副本，
//! 直到布局中没有块参照，或达到轮数上限，或某一轮没有任何进展。
//! 块定义本身不会被修改。
//!
//! 位于引用环上的块（含自引用）的参照不展开：原样保留并记为跳过，
//! 因此展开的工作量不会随轮数指数增长。

use crate::purge::cyclic_blocks;
use crate::report::{Skip, Stage, StageReport};
use dxfnorm_core::block::{BlockReference, BlockTable};
use dxfnorm_core::document::Document;
use dxfnorm_core::entity::{Entity, EntityId, DEFAULT_LAYER};
use dxfnorm_core::geometry::Geometry;
use dxfnorm_core::layout::Layout;
use dxfnorm_core::properties::{Color, LineType, LineWeight};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// 默认最大展开轮数
pub const DEFAULT_MAX_PASSES: usize = 20;

/// 展开文档中所有布局的块参照
pub fn flatten_document(doc: &mut Document, max_passes: usize) -> StageReport {
    let mut report = StageReport::new(Stage::Flatten);
    let (layouts, blocks) = doc.layouts_with_blocks();
    let cyclic = cyclic_blocks(blocks);
    for layout in layouts {
        flatten_layout(layout, blocks, &cyclic, max_passes, &mut report);
    }
    report
}

/// 展开单个布局，返回剩余的块参照数量
///
/// `cyclic` 中的块的参照保留不展开，见 [`cyclic_blocks`]。
pub fn flatten_layout(
    layout: &mut Layout,
    blocks: &BlockTable,
    cyclic: &BTreeSet<String>,
    max_passes: usize,
    report: &mut StageReport,
) -> usize {
    // 同一个无法展开的块参照只报告一次
    let mut reported: HashSet<EntityId> = HashSet::new();

    for pass in 1..=max_passes {
        if layout.insert_count() == 0 {
            return 0;
        }

        let mut inserted = 0;
        let mut removed = 0;
        let mut result = Vec::with_capacity(layout.entity_count());

        for entity in layout.take_where(|_| true) {
            let Some(reference) = as_reference(&entity) else {
                result.push(entity);
                continue;
            };

            let expanded = if cyclic.contains(&reference.block_name) {
                Err(Skip::new(
                    format!("insert {}", reference.block_name),
                    "block lies on a reference cycle",
                ))
            } else {
                expand(&entity, reference, blocks)
            };

            match expanded {
                Ok(children) => {
                    inserted += children.len();
                    removed += 1;
                    result.extend(children);
                }
                Err(skip) => {
                    if reported.insert(entity.id) {
                        report.skip(skip);
                    }
                    result.push(entity);
                }
            }
        }

        layout.extend(result);
        report.changed += removed;
        debug!(
            layout = %layout.name,
            pass,
            removed,
            inserted,
            "flatten pass"
        );

        if inserted == 0 && removed == 0 {
            break;
        }
    }

    let remaining = layout.insert_count();
    if remaining > 0 && remaining > reported.len() {
        warn!(layout = %layout.name, remaining, "block references left after flattening");
        report.skip(Skip::new(
            format!("layout {}", layout.name),
            format!("{remaining} block references remain after {max_passes} passes"),
        ));
    }
    remaining
}

fn as_reference(entity: &Entity) -> Option<&BlockReference> {
    match &entity.geometry {
        Geometry::Insert(reference) => Some(reference),
        _ => None,
    }
}

/// 把一个块参照展开为世界坐标下的实体副本（阵列插入每个单元各一份）
///
/// - 块内 0 层实体继承块参照所在图层
/// - 随块（ByBlock）的颜色、线型、线宽继承块参照的值
/// - 属性（ATTRIB）作为独立的文本实体保留，块内的属性定义（ATTDEF）不复制
///
/// 块内含有无法放置的实体（[`Geometry::Foreign`]）且放置变换不是单位变换时，
/// 不展开，块参照原样保留。
pub fn expand(
    instance: &Entity,
    reference: &BlockReference,
    blocks: &BlockTable,
) -> Result<Vec<Entity>, Skip> {
    let definition = blocks.get_block(&reference.block_name).ok_or_else(|| {
        Skip::new(
            format!("insert {}", reference.block_name),
            "block definition not found",
        )
    })?;

    let placements = reference.placements(definition.base_point);
    let template: Vec<&Entity> = definition
        .entities
        .iter()
        .filter(|e| !is_attribute_definition(e))
        .collect();
    if let Some(fixed) = template.iter().find(|e| !e.geometry.is_placeable()) {
        if placements.iter().any(|p| !p.is_identity()) {
            return Err(Skip::new(
                format!("insert {}", reference.block_name),
                format!("contains a {} entity that cannot be moved", fixed.geometry.type_name()),
            ));
        }
    }
    let mut children = Vec::with_capacity(placements.len() * template.len());

    for placement in &placements {
        for child in &template {
            let mut copy = child.duplicate();
            copy.geometry.transform(placement);
            inherit_from_instance(&mut copy, instance);
            children.push(copy);
        }
    }

    children.extend(reference.attributes.iter().map(Entity::duplicate));
    Ok(children)
}

fn is_attribute_definition(entity: &Entity) -> bool {
    matches!(&entity.geometry, Geometry::Foreign(foreign) if foreign.is_attribute_definition())
}

fn inherit_from_instance(copy: &mut Entity, instance: &Entity) {
    if copy.layer == DEFAULT_LAYER {
        copy.layer = instance.layer.clone();
    }
    if copy.properties.color == Color::ByBlock {
        copy.properties.color = instance.properties.color;
        copy.properties.true_color = instance.properties.true_color;
    }
    if copy.properties.line_type == LineType::ByBlock {
        copy.properties.line_type = instance.properties.line_type.clone();
    }
    if copy.properties.line_weight == LineWeight::ByBlock {
        copy.properties.line_weight = instance.properties.line_weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::block::BlockDefinition;
    use dxfnorm_core::geometry::{Foreign, Line, Text};
    use dxfnorm_core::math::Point2;
    use dxfnorm_core::properties::Properties;

    fn line(x: f64) -> Entity {
        Entity::new(Geometry::Line(Line::new(
            Point2::new(x, 0.0),
            Point2::new(x + 1.0, 0.0),
        )))
    }

    fn insert(name: &str, at: Point2) -> Entity {
        Entity::new(Geometry::Insert(BlockReference::new(name, at)))
    }

    #[test]
    fn test_expand_places_children() {
        let mut blocks = BlockTable::new();
        let mut block = BlockDefinition::new("B", Point2::new(1.0, 0.0));
        block.add_entity(line(1.0));
        blocks.add_block(block);

        let instance = insert("B", Point2::new(10.0, 10.0)).on_layer("DOORS");
        let reference = as_reference(&instance).unwrap();
        let children = expand(&instance, reference, &blocks).unwrap();

        assert_eq!(children.len(), 1);
        assert_eq!(children[0].layer, "DOORS");
        let Geometry::Line(l) = &children[0].geometry else {
            panic!("expected line");
        };
        assert!((l.start.x - 10.0).abs() < 1e-9);
        assert!((l.start.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_by_block_properties_inherit() {
        let mut blocks = BlockTable::new();
        let mut block = BlockDefinition::new("B", Point2::origin());
        block.add_entity(
            line(0.0)
                .on_layer("KEEP")
                .with_properties(Properties::with_color(Color::ByBlock)),
        );
        blocks.add_block(block);

        let instance = insert("B", Point2::origin())
            .with_properties(Properties::with_color(Color::RED));
        let reference = as_reference(&instance).unwrap();
        let children = expand(&instance, reference, &blocks).unwrap();

        assert_eq!(children[0].layer, "KEEP");
        assert_eq!(children[0].properties.color, Color::RED);
    }

    #[test]
    fn test_array_and_attributes() {
        let mut blocks = BlockTable::new();
        let mut block = BlockDefinition::new("CELL", Point2::origin());
        block.add_entity(line(0.0));
        blocks.add_block(block);

        let attribute = Entity::new(Geometry::Text(Text::new(Point2::origin(), "A-1", 2.5)));
        let reference = BlockReference::new("CELL", Point2::origin())
            .with_array(2, 3, 5.0, 5.0)
            .with_attribute(attribute);
        let instance = Entity::new(Geometry::Insert(reference));
        let reference = as_reference(&instance).unwrap();

        let children = expand(&instance, reference, &blocks).unwrap();
        assert_eq!(children.len(), 7);
        assert!(matches!(children[6].geometry, Geometry::Text(_)));
    }

    #[test]
    fn test_foreign_children_need_identity_placement() {
        let foreign = Entity::new(Geometry::Foreign(Foreign {
            kind: "RotatedDimension".to_string(),
            block: None,
            payload: serde_json::Value::Null,
        }));
        let mut blocks = BlockTable::new();
        let mut block = BlockDefinition::new("DIM", Point2::new(1.0, 1.0));
        block.add_entity(foreign);
        block.add_entity(line(0.0));
        blocks.add_block(block);

        let in_place = insert("DIM", Point2::new(1.0, 1.0));
        let children = expand(&in_place, as_reference(&in_place).unwrap(), &blocks).unwrap();
        assert_eq!(children.len(), 2);

        let moved = insert("DIM", Point2::new(10.0, 0.0));
        assert!(expand(&moved, as_reference(&moved).unwrap(), &blocks).is_err());
    }

    #[test]
    fn test_attribute_definitions_not_copied() {
        let template = Entity::new(Geometry::Foreign(Foreign {
            kind: "AttributeDefinition".to_string(),
            block: None,
            payload: serde_json::Value::Null,
        }));
        let mut blocks = BlockTable::new();
        let mut block = BlockDefinition::new("TITLE", Point2::origin());
        block.add_entity(template);
        block.add_entity(line(0.0));
        blocks.add_block(block);

        let instance = insert("TITLE", Point2::new(10.0, 5.0));
        let children = expand(&instance, as_reference(&instance).unwrap(), &blocks).unwrap();

        assert_eq!(children.len(), 1);
        assert!(children[0].geometry.is_placeable());
    }

    #[test]
    fn test_nested_blocks_flatten() {
        let mut doc = Document::new();
        let mut inner = BlockDefinition::new("INNER", Point2::origin());
        inner.add_entity(line(0.0));
        let mut outer = BlockDefinition::new("OUTER", Point2::origin());
        outer.add_entity(insert("INNER", Point2::new(5.0, 0.0)));
        outer.add_entity(line(2.0));
        doc.add_block(inner).unwrap();
        doc.add_block(outer).unwrap();
        doc.model_space_mut().add_entity(insert("OUTER", Point2::origin()));

        let report = flatten_document(&mut doc, DEFAULT_MAX_PASSES);

        assert_eq!(doc.model_space().insert_count(), 0);
        assert_eq!(doc.model_space().entity_count(), 2);
        assert_eq!(report.changed, 2);
        assert!(report.is_clean());
        assert_eq!(doc.blocks().block_count(), 2);
    }

    #[test]
    fn test_dangling_reference_left_in_place() {
        let mut doc = Document::new();
        doc.model_space_mut().add_entity(insert("MISSING", Point2::origin()));
        doc.model_space_mut().add_entity(line(0.0));

        let report = flatten_document(&mut doc, DEFAULT_MAX_PASSES);

        assert_eq!(doc.model_space().insert_count(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.changed, 0);
    }

    #[test]
    fn test_cycle_left_in_place() {
        let mut doc = Document::new();
        let mut a = BlockDefinition::new("A", Point2::origin());
        a.add_entity(insert("B", Point2::new(1.0, 0.0)));
        let mut b = BlockDefinition::new("B", Point2::origin());
        b.add_entity(insert("A", Point2::new(1.0, 0.0)));
        let mut entry = BlockDefinition::new("ENTRY", Point2::origin());
        entry.add_entity(insert("A", Point2::origin()));
        entry.add_entity(line(0.0));
        doc.add_block(a).unwrap();
        doc.add_block(b).unwrap();
        doc.add_block(entry).unwrap();
        doc.model_space_mut().add_entity(insert("ENTRY", Point2::origin()));

        let report = flatten_document(&mut doc, 5);

        // ENTRY 展开，环上的 A 保留
        assert_eq!(report.changed, 1);
        assert_eq!(doc.model_space().entity_count(), 2);
        assert_eq!(doc.model_space().insert_count(), 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_branching_self_reference_stays_bounded() {
        let mut doc = Document::new();
        let mut block = BlockDefinition::new("SELF", Point2::origin());
        for i in 0..3 {
            block.add_entity(insert("SELF", Point2::new(f64::from(i), 0.0)));
        }
        block.add_entity(line(0.0));
        doc.add_block(block).unwrap();
        doc.model_space_mut().add_entity(insert("SELF", Point2::origin()));

        let report = flatten_document(&mut doc, DEFAULT_MAX_PASSES);

        assert_eq!(doc.model_space().entity_count(), 1);
        assert_eq!(doc.model_space().insert_count(), 1);
        assert_eq!(report.changed, 0);
        assert_eq!(report.skipped.len(), 1);
    }
}
