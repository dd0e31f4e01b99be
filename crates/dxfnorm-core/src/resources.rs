//! 资源表：线型与文字样式
//!
//! 与 DXF 符号表一致，名称比较不区分大小写。

use serde::{Deserialize, Serialize};

/// 连续线型名称（未定义线型时的回退值）
pub const CONTINUOUS: &str = "Continuous";

/// 可按名称存入资源表的条目
pub trait NamedResource {
    fn name(&self) -> &str;
}

/// 线型定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTypeDef {
    pub name: String,
    pub description: String,
    /// 线型模式（正数表示画线，负数表示空白，0 表示点）
    pub pattern: Vec<f64>,
}

impl LineTypeDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>, pattern: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            pattern,
        }
    }

    /// 计算线型的总长度（一个重复单元）
    pub fn pattern_length(&self) -> f64 {
        self.pattern.iter().map(|x| x.abs()).sum()
    }
}

impl NamedResource for LineTypeDef {
    fn name(&self) -> &str {
        &self.name
    }
}

/// 文字样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub name: String,
    /// 字体文件（如 `arial.ttf`、`txt.shx`）
    pub font: String,
    /// 固定字高，0 表示不固定
    pub height: f64,
}

impl TextStyle {
    pub fn new(name: impl Into<String>, font: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            font: font.into(),
            height: 0.0,
        }
    }
}

impl NamedResource for TextStyle {
    fn name(&self) -> &str {
        &self.name
    }
}

/// 名称唯一的资源表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTable<T> {
    entries: Vec<T>,
}

impl<T: NamedResource> ResourceTable<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// 添加条目；名称已存在时保留原条目并返回 `false`
    pub fn add(&mut self, entry: T) -> bool {
        if self.contains(entry.name()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|e| e.name().eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: NamedResource> Default for ResourceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 新文档自带的标准线型
pub fn standard_line_types() -> ResourceTable<LineTypeDef> {
    let mut table = ResourceTable::new();
    table.add(LineTypeDef::new("ByBlock", "", Vec::new()));
    table.add(LineTypeDef::new("ByLayer", "", Vec::new()));
    table.add(LineTypeDef::new(CONTINUOUS, "Solid line", Vec::new()));
    table
}

/// 新文档自带的标准文字样式
pub fn standard_text_styles() -> ResourceTable<TextStyle> {
    let mut table = ResourceTable::new();
    table.add(TextStyle::new("Standard", "txt"));
    table
}
