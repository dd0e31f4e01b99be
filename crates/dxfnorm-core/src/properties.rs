//! 实体属性定义
//!
//! 包含颜色、线型、线宽等视觉属性。规范化后所有实体都应“随层”（ByLayer）。

use serde::{Deserialize, Serialize};

/// AutoCAD 颜色索引（ACI）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 随块（ACI 0）
    ByBlock,
    /// 随层（ACI 256）
    ByLayer,
    /// 指定索引色 1..=255
    Index(u8),
}

impl Color {
    pub const RED: Color = Color::Index(1);
    pub const YELLOW: Color = Color::Index(2);
    pub const GREEN: Color = Color::Index(3);
    pub const CYAN: Color = Color::Index(4);
    pub const BLUE: Color = Color::Index(5);
    pub const MAGENTA: Color = Color::Index(6);
    pub const WHITE: Color = Color::Index(7);

    /// 从 DXF 组码 62 的原始值创建
    ///
    /// 负值表示图层关闭，颜色取绝对值。
    pub fn from_raw(raw: i16) -> Self {
        match raw.unsigned_abs() {
            0 => Color::ByBlock,
            v @ 1..=255 => Color::Index(v as u8),
            _ => Color::ByLayer,
        }
    }

    /// 从图层规则中的整数颜色码创建，超出 ACI 范围时返回 `None`
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Color::ByBlock),
            256 => Some(Color::ByLayer),
            1..=255 => Some(Color::Index(code as u8)),
            _ => None,
        }
    }

    /// 转换为 DXF 组码 62 的原始值
    pub fn to_raw(self) -> i16 {
        match self {
            Color::ByBlock => 0,
            Color::ByLayer => 256,
            Color::Index(i) => i as i16,
        }
    }

    pub fn is_by_layer(&self) -> bool {
        matches!(self, Color::ByLayer)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::ByLayer
    }
}

/// 实体线型引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineType {
    /// 跟随图层
    ByLayer,
    /// 跟随块
    ByBlock,
    /// 线型表中的命名线型
    Named(String),
}

impl LineType {
    /// 从 DXF 线型名称解析（`BYLAYER` / `BYBLOCK` 不区分大小写，空字符串视为随层）
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() || name.eq_ignore_ascii_case("BYLAYER") {
            LineType::ByLayer
        } else if name.eq_ignore_ascii_case("BYBLOCK") {
            LineType::ByBlock
        } else {
            LineType::Named(name.to_string())
        }
    }

    /// DXF 中使用的线型名称
    pub fn name(&self) -> &str {
        match self {
            LineType::ByLayer => "BYLAYER",
            LineType::ByBlock => "BYBLOCK",
            LineType::Named(name) => name,
        }
    }

    pub fn is_by_layer(&self) -> bool {
        matches!(self, LineType::ByLayer)
    }
}

impl Default for LineType {
    fn default() -> Self {
        LineType::ByLayer
    }
}

/// 线宽，单位为百分之一毫米（DXF 组码 370）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineWeight {
    /// 默认线宽（-3）
    Default,
    /// 跟随图层（-1）
    ByLayer,
    /// 跟随块（-2）
    ByBlock,
    /// 指定线宽（百分之一毫米）
    Hundredths(i16),
}

impl LineWeight {
    /// DXF 允许的最大线宽 2.11mm
    pub const MAX_HUNDREDTHS: i32 = 211;

    pub fn from_raw(raw: i16) -> Self {
        match raw {
            -1 => LineWeight::ByLayer,
            -2 => LineWeight::ByBlock,
            v if v >= 0 => LineWeight::Hundredths(v),
            _ => LineWeight::Default,
        }
    }

    /// 从图层规则中的整数线宽创建，超出范围时返回 `None`
    pub fn from_hundredths(value: i32) -> Option<Self> {
        if (0..=Self::MAX_HUNDREDTHS).contains(&value) {
            Some(LineWeight::Hundredths(value as i16))
        } else {
            None
        }
    }

    pub fn to_raw(self) -> i16 {
        match self {
            LineWeight::Default => -3,
            LineWeight::ByLayer => -1,
            LineWeight::ByBlock => -2,
            LineWeight::Hundredths(v) => v,
        }
    }

    pub fn is_by_layer(&self) -> bool {
        matches!(self, LineWeight::ByLayer)
    }
}

impl Default for LineWeight {
    fn default() -> Self {
        LineWeight::ByLayer
    }
}

/// 实体的视觉属性覆盖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// 颜色
    pub color: Color,
    /// 线型
    pub line_type: LineType,
    /// 线宽
    pub line_weight: LineWeight,
    /// 真彩色覆盖（0xRRGGBB），`None` 表示未覆盖
    pub true_color: Option<u32>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            color: Color::ByLayer,
            line_type: LineType::ByLayer,
            line_weight: LineWeight::ByLayer,
            true_color: None,
        }
    }
}

impl Properties {
    /// 创建带有指定颜色的属性
    pub fn with_color(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// 设置线型
    pub fn set_line_type(mut self, line_type: LineType) -> Self {
        self.line_type = line_type;
        self
    }

    /// 设置线宽
    pub fn set_line_weight(mut self, line_weight: LineWeight) -> Self {
        self.line_weight = line_weight;
        self
    }

    /// 是否完全随层（无任何覆盖）
    pub fn is_by_layer(&self) -> bool {
        self.color.is_by_layer()
            && self.line_type.is_by_layer()
            && self.line_weight.is_by_layer()
            && self.true_color.is_none()
    }

    /// 清除所有覆盖，回退到图层样式
    pub fn reset_to_by_layer(&mut self) {
        *self = Self::default();
    }
}
