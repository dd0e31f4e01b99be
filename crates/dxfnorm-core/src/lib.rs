//! DXFNORM 文档模型
//!
//! 提供图纸的内存表示：图层、块定义与块参照、几何图元、资源表、布局，
//! 以及外部提供的图层映射规则表。
//!
//! # 架构设计
//!
//! - `Document`: 独占所有图层、块定义、资源与布局，只通过受控方法修改
//! - `Entity`: 几何数据 + 样式覆盖 + 图层名称
//! - `BlockReference`: 按名称引用块定义，不持有
//!
//! # 示例
//!
//! ```rust
//! use dxfnorm_core::prelude::*;
//!
//! let mut doc = Document::new();
//! let line = Line::new(Point2::origin(), Point2::new(100.0, 50.0));
//! doc.model_space_mut()
//!     .add_entity(Entity::new(Geometry::Line(line)).on_layer("WALLS"));
//!
//! assert_eq!(doc.ensure_referenced_layers(), 1);
//! ```

pub mod block;
pub mod document;
pub mod entity;
pub mod geometry;
pub mod layer;
pub mod layout;
pub mod math;
pub mod properties;
pub mod resources;
pub mod rule;
pub mod transform;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::block::{BlockDefinition, BlockReference};
    pub use crate::document::{Document, DocumentError};
    pub use crate::entity::{Entity, EntityId};
    pub use crate::geometry::{
        Arc, Circle, Ellipse, Geometry, Image, Line, Point, Polyline, PolylineVertex, Spline, Text,
    };
    pub use crate::layer::Layer;
    pub use crate::layout::Layout;
    pub use crate::math::{Point2, Vector2};
    pub use crate::properties::{Color, LineType, LineWeight, Properties};
    pub use crate::resources::{LineTypeDef, TextStyle};
    pub use crate::rule::{LayerRule, RuleTable};
    pub use crate::transform::Transform2D;
}
