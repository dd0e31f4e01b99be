//! 图层映射规则
//!
//! 每条规则描述：源图层 -> 目标图层，以及目标图层的颜色、线宽、线型。
//! 规则按源图层名称唯一，匹配区分大小写。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单条图层规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRule {
    /// 源图层名称
    pub source: String,
    /// 目标图层名称
    pub destination: String,
    /// 目标颜色（ACI 颜色号）
    pub color: i32,
    /// 目标线宽（0.01 mm）
    pub line_weight: i32,
    /// 目标线型名称
    pub line_type: String,
}

impl LayerRule {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        color: i32,
        line_weight: i32,
        line_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            color,
            line_weight,
            line_type: line_type.into(),
        }
    }
}

/// 规则表（保持插入顺序）
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<LayerRule>,
    index: HashMap<String, usize>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入规则；同名源图层的旧规则被原位替换，返回被替换的规则
    pub fn insert(&mut self, rule: LayerRule) -> Option<LayerRule> {
        match self.index.get(&rule.source) {
            Some(&idx) => Some(std::mem::replace(&mut self.rules[idx], rule)),
            None => {
                self.index.insert(rule.source.clone(), self.rules.len());
                self.rules.push(rule);
                None
            }
        }
    }

    /// 按源图层查找规则
    pub fn get(&self, source: &str) -> Option<&LayerRule> {
        self.index.get(source).map(|&idx| &self.rules[idx])
    }

    /// 图层名称经规则重映射后的名称（无规则时原样返回）
    pub fn resolve<'a>(&'a self, layer: &'a str) -> &'a str {
        self.get(layer).map_or(layer, |rule| rule.destination.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<LayerRule> for RuleTable {
    fn from_iter<I: IntoIterator<Item = LayerRule>>(iter: I) -> Self {
        let mut table = Self::new();
        for rule in iter {
            table.insert(rule);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_replace_in_place() {
        let table: RuleTable = [
            LayerRule::new("A", "B", 1, 25, "continuous"),
            LayerRule::new("C", "D", 2, 0, "DASHED"),
            LayerRule::new("A", "E", 3, 50, "continuous"),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 2);
        let sources: Vec<&str> = table.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["A", "C"]);
        assert_eq!(table.get("A").unwrap().destination, "E");
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let mut table = RuleTable::new();
        table.insert(LayerRule::new("LAYER099", "CLOUDS", 1, 0, "continuous"));

        assert_eq!(table.resolve("LAYER099"), "CLOUDS");
        assert_eq!(table.resolve("layer099"), "layer099");
    }
}
