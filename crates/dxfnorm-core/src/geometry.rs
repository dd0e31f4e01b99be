//! 几何图元
//!
//! 规范化流水线只关心两件事：块展开时把几何放置到插入位置，
//! 以及修订云检测时判断多段线是否闭合。

use crate::block::BlockReference;
use crate::math::{points_within, Point2, Vector2, EPSILON};
use crate::transform::Transform2D;
use serde::{Deserialize, Serialize};

/// 几何类型枚举
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    Line(Line),
    Circle(Circle),
    Arc(Arc),
    Polyline(Polyline),
    Text(Text),
    Ellipse(Ellipse),
    Spline(Spline),
    /// 光栅图像（图框中的 Logo 等）
    Image(Image),
    /// 块参照
    Insert(BlockReference),
    /// 未建模的实体（标注、引线、填充等），原样保留
    Foreign(Foreign),
}

impl Geometry {
    /// 获取几何的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Line(_) => "Line",
            Geometry::Circle(_) => "Circle",
            Geometry::Arc(_) => "Arc",
            Geometry::Polyline(_) => "Polyline",
            Geometry::Text(_) => "Text",
            Geometry::Ellipse(_) => "Ellipse",
            Geometry::Spline(_) => "Spline",
            Geometry::Image(_) => "Image",
            Geometry::Insert(_) => "Insert",
            Geometry::Foreign(_) => "Foreign",
        }
    }

    /// 原地应用仿射变换
    ///
    /// 非均匀缩放下圆/圆弧/文字只做近似（取等效均匀缩放）。
    /// [`Geometry::Foreign`] 不受影响，调用前用 [`Geometry::is_placeable`] 检查。
    pub fn transform(&mut self, t: &Transform2D) {
        match self {
            Geometry::Point(p) => p.position = t.transform_point(&p.position),
            Geometry::Line(l) => {
                l.start = t.transform_point(&l.start);
                l.end = t.transform_point(&l.end);
            }
            Geometry::Circle(c) => {
                c.center = t.transform_point(&c.center);
                c.radius *= t.mean_scale();
            }
            Geometry::Arc(a) => {
                a.center = t.transform_point(&a.center);
                a.radius *= t.mean_scale();
                let start = t.transform_angle(a.start_angle);
                let end = t.transform_angle(a.end_angle);
                // 镜像会翻转弧的走向
                if t.is_mirroring() {
                    a.start_angle = end;
                    a.end_angle = start;
                } else {
                    a.start_angle = start;
                    a.end_angle = end;
                }
            }
            Geometry::Polyline(pl) => {
                let flip = t.is_mirroring();
                for v in &mut pl.vertices {
                    v.point = t.transform_point(&v.point);
                    if flip {
                        v.bulge = -v.bulge;
                    }
                }
            }
            Geometry::Text(text) => {
                text.position = t.transform_point(&text.position);
                text.rotation = t.transform_angle(text.rotation);
                text.height *= t.mean_scale();
            }
            Geometry::Ellipse(e) => {
                e.center = t.transform_point(&e.center);
                e.major_axis = t.transform_vector(&e.major_axis);
                if t.is_mirroring() {
                    let (start, end) = (e.start_param, e.end_param);
                    e.start_param = -end;
                    e.end_param = -start;
                }
            }
            Geometry::Spline(s) => {
                for p in s.control_points.iter_mut().chain(s.fit_points.iter_mut()) {
                    *p = t.transform_point(p);
                }
            }
            Geometry::Image(img) => {
                img.position = t.transform_point(&img.position);
                img.u_vector = t.transform_vector(&img.u_vector);
                img.v_vector = t.transform_vector(&img.v_vector);
            }
            Geometry::Insert(reference) => reference.transform(t),
            Geometry::Foreign(_) => {}
        }
    }

    /// 能否被 [`Geometry::transform`] 放置到新位置
    pub fn is_placeable(&self) -> bool {
        !matches!(self, Geometry::Foreign(_))
    }

    /// 是否为块参照
    pub fn is_insert(&self) -> bool {
        matches!(self, Geometry::Insert(_))
    }

    /// 是否为光栅图像
    pub fn is_image(&self) -> bool {
        matches!(self, Geometry::Image(_))
    }
}

/// 点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub position: Point2,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
        }
    }
}

/// 线段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }
}

/// 圆
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// 圆弧（角度为弧度，逆时针）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Arc {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }
}

/// 多段线顶点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolylineVertex {
    pub point: Point2,
    /// 凸度（bulge）- 用于弧线段，0表示直线
    pub bulge: f64,
}

impl PolylineVertex {
    pub fn new(point: Point2) -> Self {
        Self { point, bulge: 0.0 }
    }

    pub fn with_bulge(point: Point2, bulge: f64) -> Self {
        Self { point, bulge }
    }
}

/// 多段线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polyline {
    pub vertices: Vec<PolylineVertex>,
    /// 是否闭合
    pub closed: bool,
}

impl Polyline {
    pub fn new(vertices: Vec<PolylineVertex>, closed: bool) -> Self {
        Self { vertices, closed }
    }

    /// 从点列表创建（所有顶点都是直线连接）
    pub fn from_points(points: impl IntoIterator<Item = Point2>, closed: bool) -> Self {
        Self {
            vertices: points.into_iter().map(PolylineVertex::new).collect(),
            closed,
        }
    }

    /// 顶点数量
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 是否闭合：闭合标志，或首尾顶点在容差内重合
    pub fn is_closed_within(&self, tolerance: f64) -> bool {
        if self.closed {
            return true;
        }
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) if self.vertices.len() > 2 => {
                points_within(&first.point, &last.point, tolerance)
            }
            _ => false,
        }
    }

    /// 轮廓顶点序列（去掉与起点重合的收尾顶点）
    pub fn outline_points(&self, tolerance: f64) -> Vec<Point2> {
        let mut points: Vec<Point2> = self.vertices.iter().map(|v| v.point).collect();
        if points.len() > 1 {
            let first = points[0];
            if let Some(last) = points.last() {
                if points_within(&first, last, tolerance) {
                    points.pop();
                }
            }
        }
        points
    }

    /// 是否为扇贝形（每段都是弧线，即修订云）
    pub fn is_scalloped(&self) -> bool {
        self.closed
            && self.vertices.len() > 2
            && self.vertices.iter().all(|v| v.bulge.abs() > EPSILON)
    }
}

/// 文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    /// 插入点
    pub position: Point2,
    /// 文本内容
    pub content: String,
    /// 文本高度
    pub height: f64,
    /// 旋转角度（弧度）
    pub rotation: f64,
    /// 文字样式名称
    pub style: String,
    /// 是否为多行文本（MTEXT）
    pub multiline: bool,
    /// 属性标记，仅块参照上的属性（ATTRIB）使用
    #[serde(default)]
    pub tag: Option<String>,
}

impl Text {
    /// 创建新的文本对象
    pub fn new(position: Point2, content: impl Into<String>, height: f64) -> Self {
        Self {
            position,
            content: content.into(),
            height,
            rotation: 0.0,
            style: "Standard".to_string(),
            multiline: false,
            tag: None,
        }
    }

    /// 设置旋转角度
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }
}

/// 椭圆
///
/// DXF 兼容的参数化方式：中心点 + 长轴端点（相对向量）+ 短轴比例
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point2,
    /// 长轴端点（相对于中心的向量）
    pub major_axis: Vector2,
    /// 短轴与长轴的比例 (0.0 < ratio <= 1.0)
    pub ratio: f64,
    pub start_param: f64,
    pub end_param: f64,
}

impl Ellipse {
    pub fn arc(center: Point2, major_axis: Vector2, ratio: f64, start_param: f64, end_param: f64) -> Self {
        Self {
            center,
            major_axis,
            ratio,
            start_param,
            end_param,
        }
    }
}

/// 样条曲线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spline {
    /// 曲线阶数（通常为 3）
    pub degree: u8,
    pub control_points: Vec<Point2>,
    /// 节点向量（knot vector）
    pub knots: Vec<f64>,
    pub fit_points: Vec<Point2>,
    pub closed: bool,
}

impl Spline {
    /// 创建一个空的 B-样条
    pub fn new(degree: u8) -> Self {
        Self {
            degree,
            control_points: Vec::new(),
            knots: Vec::new(),
            fit_points: Vec::new(),
            closed: false,
        }
    }
}

/// 光栅图像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// 左下角插入点
    pub position: Point2,
    /// 单个像素在 U 方向的向量
    pub u_vector: Vector2,
    /// 单个像素在 V 方向的向量
    pub v_vector: Vector2,
    /// 像素尺寸（宽, 高）
    pub size: (f64, f64),
    /// 图像定义（IMAGEDEF）引用的文件路径
    #[serde(default)]
    pub file_path: Option<String>,
}

/// 文档模型没有对应类型的实体
///
/// 内容以序列化形式保存，只有图层与属性参与规范化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Foreign {
    /// 实体类型名，如 `RotatedDimension`
    pub kind: String,
    /// 引用的块（标注的匿名块），清理时视为引用
    #[serde(default)]
    pub block: Option<String>,
    /// 原始实体
    pub payload: serde_json::Value,
}

impl Foreign {
    /// 属性定义（ATTDEF）只是块参照属性的模板
    pub fn is_attribute_definition(&self) -> bool {
        self.kind == "AttributeDefinition"
    }
}
