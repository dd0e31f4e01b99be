//! 布局系统（Layout System）
//!
//! ```text
//! Document
//! ├── Model Space (Layout 0)   <- 主布局，图章合并与修订云都作用于这里
//! └── Paper Layouts[]
//!     ├── FL 01                <- 合并输出时每个来源文件一个布局
//!     └── FL 02
//! ```

use crate::entity::{Entity, EntityId};
use serde::{Deserialize, Serialize};

/// 模型空间布局名称
pub const MODEL_SPACE: &str = "Model";

/// 布局类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutKind {
    /// 模型空间
    Model,
    /// 图纸空间
    Paper,
}

/// 布局：一个有序的实体集合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    /// 布局名称
    pub name: String,
    /// 布局类型
    pub kind: LayoutKind,
    /// 布局中的实体（保持绘制顺序）
    entities: Vec<Entity>,
}

impl Layout {
    /// 创建模型空间
    pub fn model() -> Self {
        Self {
            name: MODEL_SPACE.to_string(),
            kind: LayoutKind::Model,
            entities: Vec::new(),
        }
    }

    /// 创建图纸空间布局
    pub fn paper(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayoutKind::Paper,
            entities: Vec::new(),
        }
    }

    /// 添加实体
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    /// 批量添加实体
    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) {
        self.entities.extend(entities);
    }

    /// 删除实体
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let idx = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(idx))
    }

    /// 移除满足条件的实体并返回它们（保持剩余实体顺序）
    pub fn take_where(&mut self, mut predicate: impl FnMut(&Entity) -> bool) -> Vec<Entity> {
        let (taken, kept): (Vec<Entity>, Vec<Entity>) =
            std::mem::take(&mut self.entities).into_iter().partition(|e| predicate(e));
        self.entities = kept;
        taken
    }

    /// 获取实体
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// 所有实体
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// 所有实体（可变）
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// 实体数量
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// 块参照数量
    pub fn insert_count(&self) -> usize {
        self.entities.iter().filter(|e| e.geometry.is_insert()).count()
    }
}
