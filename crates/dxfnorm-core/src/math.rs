//! 数学基础类型
//!
//! 基于 nalgebra 的点、向量别名，以及修订云检测所需的包围盒与闭合判断。

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// 2D点类型
pub type Point2 = na::Point2<f64>;

/// 2D向量类型
pub type Vector2 = na::Vector2<f64>;

/// 2D齐次变换矩阵
pub type Matrix3 = na::Matrix3<f64>;

/// 数值容差，用于几何比较
pub const EPSILON: f64 = 1e-10;

/// 多段线首尾重合判定容差（图纸单位）
pub const CLOSURE_TOLERANCE: f64 = 1e-4;

/// 判断两个浮点数是否近似相等
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// 判断两个2D点在给定容差内是否重合
#[inline]
pub fn points_within(a: &Point2, b: &Point2, tolerance: f64) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// 多边形有向面积（逆时针为正）
pub fn signed_area(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// 2D轴对齐包围盒
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    /// 创建空的包围盒（无效状态）
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::MAX, f64::MAX),
            max: Point2::new(f64::MIN, f64::MIN),
        }
    }

    /// 从点集创建包围盒
    pub fn from_points(points: impl IntoIterator<Item = Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    /// 扩展包围盒以包含指定点
    pub fn expand_to_include(&mut self, point: &Point2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// 是否为空（未包含任何点）
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// 面积是否退化为零（点或线段）
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        self.is_empty() || self.width() <= tolerance || self.height() <= tolerance
    }

    /// 获取宽度
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// 获取高度
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}
