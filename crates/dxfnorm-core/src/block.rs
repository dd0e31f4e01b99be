//! 块定义和块参照系统
//!
//! 块是一组实体的集合，可以被重复使用。
//! 块参照按名称引用块定义（不持有），带有自己的位置、旋转、缩放和属性。

use crate::entity::Entity;
use crate::math::{Point2, Vector2};
use crate::transform::Transform2D;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// 块定义
///
/// 块是一组实体的集合，定义在其自己的坐标系中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDefinition {
    /// 块名称（必须唯一）
    pub name: String,
    /// 基点（插入点的参考）
    pub base_point: Point2,
    /// 块中的实体
    pub entities: Vec<Entity>,
    /// 块说明
    pub description: String,
}

impl BlockDefinition {
    /// 创建新块
    pub fn new(name: impl Into<String>, base_point: Point2) -> Self {
        Self {
            name: name.into(),
            base_point,
            entities: Vec::new(),
            description: String::new(),
        }
    }

    /// 添加实体到块
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// 获取实体数量
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// 块内直接引用的其他块名称（去重、有序）
    pub fn referenced_blocks(&self) -> BTreeSet<&str> {
        self.entities.iter().filter_map(|e| e.block_name()).collect()
    }

    /// 是否为模型空间/图纸空间的根容器块
    pub fn is_layout_root(&self) -> bool {
        is_layout_root_name(&self.name)
    }
}

/// `*Model_Space`、`*Paper_Space`、`*Paper_Space0`… 是布局的根容器，永不清理
pub fn is_layout_root_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "*model_space" || lower.starts_with("*paper_space")
}

/// 块参照
///
/// 块参照是块定义的一个实例，可以有位置、旋转和缩放
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReference {
    /// 参照的块名称
    pub block_name: String,
    /// 插入点
    pub insertion_point: Point2,
    /// X 方向缩放
    pub scale_x: f64,
    /// Y 方向缩放
    pub scale_y: f64,
    /// 旋转角度（弧度）
    pub rotation: f64,
    /// 列数（用于阵列插入）
    pub column_count: u32,
    /// 行数（用于阵列插入）
    pub row_count: u32,
    /// 列间距
    pub column_spacing: f64,
    /// 行间距
    pub row_spacing: f64,
    /// 属性（ATTRIB）子实体，几何为文本
    pub attributes: Vec<Entity>,
}

impl BlockReference {
    /// 创建块参照
    pub fn new(block_name: impl Into<String>, insertion_point: Point2) -> Self {
        Self {
            block_name: block_name.into(),
            insertion_point,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            column_count: 1,
            row_count: 1,
            column_spacing: 0.0,
            row_spacing: 0.0,
            attributes: Vec::new(),
        }
    }

    /// 设置缩放
    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    /// 设置旋转（度）
    pub fn with_rotation_degrees(mut self, degrees: f64) -> Self {
        self.rotation = degrees.to_radians();
        self
    }

    /// 设置阵列参数
    pub fn with_array(mut self, columns: u32, rows: u32, col_spacing: f64, row_spacing: f64) -> Self {
        self.column_count = columns.max(1);
        self.row_count = rows.max(1);
        self.column_spacing = col_spacing;
        self.row_spacing = row_spacing;
        self
    }

    /// 添加属性子实体
    pub fn with_attribute(mut self, attribute: Entity) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// 获取所有插入点（考虑阵列）
    pub fn all_insertion_points(&self) -> Vec<Point2> {
        let columns = self.column_count.max(1);
        let rows = self.row_count.max(1);
        let mut points = Vec::with_capacity((columns * rows) as usize);
        let cos_r = self.rotation.cos();
        let sin_r = self.rotation.sin();

        for col in 0..columns {
            for row in 0..rows {
                let offset = Vector2::new(
                    col as f64 * self.column_spacing,
                    row as f64 * self.row_spacing,
                );

                // 应用旋转到偏移
                let rotated_offset = Vector2::new(
                    offset.x * cos_r - offset.y * sin_r,
                    offset.x * sin_r + offset.y * cos_r,
                );

                points.push(Point2::new(
                    self.insertion_point.x + rotated_offset.x,
                    self.insertion_point.y + rotated_offset.y,
                ));
            }
        }

        points
    }

    /// 每个阵列单元的放置变换（块坐标 -> 世界坐标）
    pub fn placements(&self, base_point: Point2) -> Vec<Transform2D> {
        self.all_insertion_points()
            .into_iter()
            .map(|p| Transform2D::placement(base_point, p, self.scale_x, self.scale_y, self.rotation))
            .collect()
    }

    /// 嵌套块参照随外层块一起被放置时的变换
    pub fn transform(&mut self, t: &Transform2D) {
        let (sx, sy) = t.scale_component();
        self.insertion_point = t.transform_point(&self.insertion_point);
        self.rotation = t.transform_angle(self.rotation);
        self.scale_x *= sx;
        self.scale_y *= if t.is_mirroring() { -sy } else { sy };
        self.column_spacing *= sx;
        self.row_spacing *= sy;
        for attribute in &mut self.attributes {
            attribute.geometry.transform(t);
        }
    }
}

/// 块表 - 管理所有块定义
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockTable {
    /// 块定义（按名称索引）
    blocks: HashMap<String, BlockDefinition>,
}

impl BlockTable {
    /// 创建空的块表
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加块定义，名称重复时返回 `false`
    pub fn add_block(&mut self, block: BlockDefinition) -> bool {
        if self.blocks.contains_key(&block.name) {
            false
        } else {
            self.blocks.insert(block.name.clone(), block);
            true
        }
    }

    /// 获取块定义
    pub fn get_block(&self, name: &str) -> Option<&BlockDefinition> {
        self.blocks.get(name)
    }

    /// 移除块定义
    pub(crate) fn remove_block(&mut self, name: &str) -> Option<BlockDefinition> {
        self.blocks.remove(name)
    }

    /// 检查块是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// 获取所有块名称（排序，保证遍历顺序确定）
    pub fn block_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blocks.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// 获取块数量
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// 迭代所有块
    pub fn iter(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.blocks.values()
    }

    /// 迭代所有块（可变）
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BlockDefinition> {
        self.blocks.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Line};

    #[test]
    fn test_block_creation() {
        let mut block = BlockDefinition::new("TestBlock", Point2::origin());

        let line = Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        block.add_entity(Entity::new(Geometry::Line(line)));
        block.add_entity(Entity::new(Geometry::Insert(BlockReference::new(
            "Inner",
            Point2::origin(),
        ))));

        assert_eq!(block.name, "TestBlock");
        assert_eq!(block.entity_count(), 2);
        assert_eq!(block.referenced_blocks().into_iter().collect::<Vec<_>>(), vec!["Inner"]);
    }

    #[test]
    fn test_block_reference_placement() {
        let reference = BlockReference::new("Test", Point2::new(100.0, 100.0))
            .with_scale(2.0, 2.0)
            .with_rotation_degrees(90.0);

        let placements = reference.placements(Point2::origin());
        assert_eq!(placements.len(), 1);

        // 缩放 2x：(20, 0)，旋转 90°：(0, 20)，平移到 (100, 100)：(100, 120)
        let transformed = placements[0].transform_point(&Point2::new(10.0, 0.0));
        assert!((transformed.x - 100.0).abs() < 0.001);
        assert!((transformed.y - 120.0).abs() < 0.001);
    }

    #[test]
    fn test_array_insertion_points() {
        let reference = BlockReference::new("Grid", Point2::origin()).with_array(3, 2, 10.0, 5.0);
        let points = reference.all_insertion_points();

        assert_eq!(points.len(), 6);
        assert!(points.iter().any(|p| (p.x - 20.0).abs() < 1e-9 && (p.y - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_layout_root_names() {
        assert!(is_layout_root_name("*Model_Space"));
        assert!(is_layout_root_name("*PAPER_SPACE"));
        assert!(is_layout_root_name("*Paper_Space3"));
        assert!(!is_layout_root_name("TITLE"));
    }

    #[test]
    fn test_block_table() {
        let mut table = BlockTable::new();

        assert!(table.add_block(BlockDefinition::new("Block1", Point2::origin())));
        assert!(table.add_block(BlockDefinition::new("Block2", Point2::new(10.0, 10.0))));
        assert!(!table.add_block(BlockDefinition::new("Block1", Point2::origin()))); // 重复名称

        assert_eq!(table.block_count(), 2);
        assert_eq!(table.block_names(), vec!["Block1", "Block2"]);
    }
}
