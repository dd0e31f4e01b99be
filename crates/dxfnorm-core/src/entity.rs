//! 实体标识和管理
//!
//! 实体通过图层名称引用图层；跨文档复制时总是生成新的 ID。

use crate::geometry::Geometry;
use crate::properties::Properties;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// 全局实体ID生成器
static ENTITY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 实体唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// 创建新的实体ID
    pub fn new() -> Self {
        Self(ENTITY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// 默认图层名称
pub const DEFAULT_LAYER: &str = "0";

/// CAD实体
///
/// 一个实体包含几何数据、属性覆盖和所属图层
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// 唯一标识符
    pub id: EntityId,

    /// 几何类型和数据
    pub geometry: Geometry,

    /// 视觉属性覆盖
    pub properties: Properties,

    /// 所属图层名称
    pub layer: String,
}

impl Entity {
    /// 创建新实体（位于 0 层，随层样式）
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: EntityId::new(),
            geometry,
            properties: Properties::default(),
            layer: DEFAULT_LAYER.to_string(),
        }
    }

    /// 使用指定的图层
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    /// 使用指定的属性
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// 复制为独立的新实体（新 ID，不共享任何状态）
    pub fn duplicate(&self) -> Self {
        let mut copy = Self {
            id: EntityId::new(),
            ..self.clone()
        };
        if let Some(attributes) = copy.attributes_mut() {
            for attribute in attributes.iter_mut() {
                attribute.id = EntityId::new();
            }
        }
        copy
    }

    /// 引用的块名称（块参照，或带匿名块的标注等未建模实体）
    pub fn block_name(&self) -> Option<&str> {
        match &self.geometry {
            Geometry::Insert(reference) => Some(reference.block_name.as_str()),
            Geometry::Foreign(foreign) => foreign.block.as_deref(),
            _ => None,
        }
    }

    /// 块参照的属性（ATTRIB）子实体
    pub fn attributes(&self) -> &[Entity] {
        match &self.geometry {
            Geometry::Insert(reference) => &reference.attributes,
            _ => &[],
        }
    }

    /// 块参照的属性子实体（可变）
    pub fn attributes_mut(&mut self) -> Option<&mut Vec<Entity>> {
        match &mut self.geometry {
            Geometry::Insert(reference) => Some(&mut reference.attributes),
            _ => None,
        }
    }
}
