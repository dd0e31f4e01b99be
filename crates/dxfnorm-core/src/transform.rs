//! 2D变换操作
//!
//! 块参照展开时，把块坐标系中的实体放置到插入位置。

use crate::math::{Matrix3, Point2, Vector2, EPSILON};
use serde::{Deserialize, Serialize};

/// 2D仿射变换
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform2D {
    matrix: Matrix3,
}

impl Transform2D {
    /// 创建单位变换
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// 创建平移变换
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            matrix: Matrix3::new(
                1.0, 0.0, dx,
                0.0, 1.0, dy,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// 创建旋转变换（绕原点）
    pub fn rotation(angle: f64) -> Self {
        let cos = angle.cos();
        let sin = angle.sin();
        Self {
            matrix: Matrix3::new(
                cos, -sin, 0.0,
                sin, cos, 0.0,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// 创建缩放变换（绕原点）
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            matrix: Matrix3::new(
                sx, 0.0, 0.0,
                0.0, sy, 0.0,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// 块参照放置变换
    ///
    /// 顺序：移到基点 -> 缩放 -> 旋转 -> 平移到插入点
    pub fn placement(
        base_point: Point2,
        insertion_point: Point2,
        scale_x: f64,
        scale_y: f64,
        rotation: f64,
    ) -> Self {
        Self::translation(insertion_point.x, insertion_point.y)
            .then(&Self::rotation(rotation))
            .then(&Self::scale(scale_x, scale_y))
            .then(&Self::translation(-base_point.x, -base_point.y))
    }

    /// 组合两个变换（self 在后，other 在前）
    pub fn then(&self, other: &Transform2D) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// 变换一个点
    pub fn transform_point(&self, point: &Point2) -> Point2 {
        let v = self.matrix * nalgebra::Vector3::new(point.x, point.y, 1.0);
        Point2::new(v.x, v.y)
    }

    /// 变换一个向量（不受平移影响）
    pub fn transform_vector(&self, vector: &Vector2) -> Vector2 {
        let v = self.matrix * nalgebra::Vector3::new(vector.x, vector.y, 0.0);
        Vector2::new(v.x, v.y)
    }

    /// 变换一个角度（弧度），返回变换后的方向角
    pub fn transform_angle(&self, angle: f64) -> f64 {
        let dir = self.transform_vector(&Vector2::new(angle.cos(), angle.sin()));
        dir.y.atan2(dir.x)
    }

    /// 提取缩放分量
    pub fn scale_component(&self) -> (f64, f64) {
        let sx = (self.matrix[(0, 0)].powi(2) + self.matrix[(1, 0)].powi(2)).sqrt();
        let sy = (self.matrix[(0, 1)].powi(2) + self.matrix[(1, 1)].powi(2)).sqrt();
        (sx, sy)
    }

    /// 线性部分的行列式
    fn determinant(&self) -> f64 {
        self.matrix[(0, 0)] * self.matrix[(1, 1)] - self.matrix[(0, 1)] * self.matrix[(1, 0)]
    }

    /// 是否为单位变换（容差 [`EPSILON`]）
    pub fn is_identity(&self) -> bool {
        (self.matrix - Matrix3::identity())
            .iter()
            .all(|v| v.abs() < EPSILON)
    }

    /// 是否包含镜像（会翻转弧线方向）
    pub fn is_mirroring(&self) -> bool {
        self.determinant() < 0.0
    }

    /// 等效的均匀缩放系数（非均匀缩放时取面积比的平方根）
    pub fn mean_scale(&self) -> f64 {
        self.determinant().abs().sqrt()
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}
