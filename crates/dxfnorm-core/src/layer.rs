//! 图层管理
//!
//! 图层名称区分大小写地精确匹配；`0` 和 `Defpoints` 为保留图层，永不删除。

use crate::properties::{Color, LineWeight};
use serde::{Deserialize, Serialize};

/// 保留图层名称
pub const RESERVED_LAYERS: [&str; 2] = ["0", "Defpoints"];

/// 是否为保留图层（`Defpoints` 不区分大小写）
pub fn is_reserved(name: &str) -> bool {
    RESERVED_LAYERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// 图层定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// 图层名称
    pub name: String,

    /// 图层颜色
    pub color: Color,

    /// 图层线型名称
    pub line_type: String,

    /// 图层线宽
    pub line_weight: LineWeight,
}

impl Layer {
    /// 创建新图层（白色、实线、默认线宽）
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Color::WHITE,
            line_type: "Continuous".to_string(),
            line_weight: LineWeight::Default,
        }
    }

    /// 默认图层（0层）
    pub fn default_layer() -> Self {
        Self::new("0")
    }
}

/// 图层表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerTable {
    /// 所有图层（保持插入顺序）
    layers: Vec<Layer>,
}

impl LayerTable {
    /// 创建只含 0 层的图层表
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::default_layer()],
        }
    }

    /// 同名图层不存在时加入，返回是否加入
    pub fn insert_if_absent(&mut self, layer: Layer) -> bool {
        if self.contains(&layer.name) {
            return false;
        }
        self.layers.push(layer);
        true
    }

    /// 获取图层，不存在时以默认属性创建
    pub fn ensure_layer(&mut self, name: &str) -> &mut Layer {
        let idx = match self.layers.iter().position(|l| l.name == name) {
            Some(idx) => idx,
            None => {
                self.layers.push(Layer::new(name));
                self.layers.len() - 1
            }
        };
        &mut self.layers[idx]
    }

    /// 获取图层（按名称）
    pub fn get_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// 图层是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }

    /// 获取所有图层
    pub fn all_layers(&self) -> &[Layer] {
        &self.layers
    }

    /// 所有图层名称
    pub fn names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    /// 删除图层
    ///
    /// 注意：不能删除保留图层
    pub fn delete_layer(&mut self, name: &str) -> Result<Layer, LayerError> {
        if is_reserved(name) {
            return Err(LayerError::ReservedLayer(name.to_string()));
        }

        match self.layers.iter().position(|l| l.name == name) {
            Some(idx) => Ok(self.layers.remove(idx)),
            None => Err(LayerError::LayerNotFound(name.to_string())),
        }
    }

    /// 图层数量
    pub fn count(&self) -> usize {
        self.layers.len()
    }
}

impl Default for LayerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 图层操作错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum LayerError {
    #[error("Cannot delete reserved layer {0}")]
    ReservedLayer(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_table() {
        let mut table = LayerTable::new();

        assert_eq!(table.count(), 1);
        assert!(table.contains("0"));

        assert!(table.insert_if_absent(Layer::new("Layer1")));
        assert!(!table.insert_if_absent(Layer::new("Layer1")));
        table.ensure_layer("Layer2").color = Color::RED;
        table.ensure_layer("Layer2");

        assert_eq!(table.count(), 3);
        assert_eq!(table.get_layer("Layer2").unwrap().color, Color::RED);

        assert!(table.delete_layer("Layer2").is_ok());
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn test_reserved_layers_survive() {
        let mut table = LayerTable::new();
        table.ensure_layer("DEFPOINTS");

        assert!(matches!(table.delete_layer("0"), Err(LayerError::ReservedLayer(_))));
        assert!(matches!(table.delete_layer("DEFPOINTS"), Err(LayerError::ReservedLayer(_))));
        assert!(!table.contains("layer1"));
    }
}
