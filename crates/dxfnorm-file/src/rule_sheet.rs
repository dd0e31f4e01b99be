//! 图层规则表读取
//!
//! 支持 CSV 与 JSON（对象数组）两种格式，列名固定：
//! `currentLayer`、`newLayer`、`colorID`、`lineType`、`lineweight`。
//!
//! 缺失值的处理：
//! - `currentLayer` 为空的行被丢弃，其余行去掉首尾空白
//! - `newLayer` 为空时为 `fallback`
//! - `colorID` 非数字时为 256（随层）
//! - `lineType` 为空时为 `continuous`
//! - `lineweight` 以毫米给出，非数字时为 0，换算为 0.01 mm 后截断取整
//!
//! 同一源图层出现多次时以最后一行为准。

use crate::error::FileError;
use dxfnorm_core::rule::{LayerRule, RuleTable};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// 必需的列
pub const REQUIRED_COLUMNS: [&str; 5] = ["currentLayer", "newLayer", "colorID", "lineType", "lineweight"];

const FALLBACK_LAYER: &str = "fallback";
const FALLBACK_LINE_TYPE: &str = "continuous";
const FALLBACK_COLOR: i32 = 256;

/// 按扩展名读取规则表
pub fn read_rule_sheet(path: &Path) -> Result<RuleTable, FileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" => parse_csv(std::fs::File::open(path)?)?,
        "json" => parse_json(&std::fs::read_to_string(path)?)?,
        other => {
            return Err(FileError::InvalidFormat(format!(
                "rule sheet must be .csv or .json, got '{other}'"
            )))
        }
    };

    info!(file = %path.display(), rules = table.len(), "loaded layer rules");
    Ok(table)
}

/// 解析 CSV 规则表（第一行为表头）
pub fn parse_csv<R: Read>(reader: R) -> Result<RuleTable, FileError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = column_indices(|name| headers.iter().position(|h| h == name))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(columns.map(|idx| record.get(idx).map(str::to_string)));
    }
    Ok(build_table(rows))
}

/// 解析 JSON 规则表（对象数组）
pub fn parse_json(text: &str) -> Result<RuleTable, FileError> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(text)?;

    let has_column = |name: &str| records.iter().any(|r| r.contains_key(name)).then_some(0);
    column_indices(has_column)?;

    let rows = records
        .iter()
        .map(|record| REQUIRED_COLUMNS.map(|name| record.get(name).and_then(json_cell)))
        .collect();
    Ok(build_table(rows))
}

/// 定位必需列，缺失时报告全部缺失的列名
fn column_indices(find: impl Fn(&str) -> Option<usize>) -> Result<[usize; 5], FileError> {
    let found = REQUIRED_COLUMNS.map(|name| find(name));
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(found.iter())
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FileError::RuleSheet(missing));
    }
    Ok(found.map(|idx| idx.unwrap_or_default()))
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 空白单元格视为缺失
fn present(cell: Option<String>) -> Option<String> {
    cell.filter(|s| !s.trim().is_empty())
}

fn numeric(cell: &Option<String>) -> Option<f64> {
    cell.as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// 单行 → 规则；源图层为空时返回 `None`
fn build_rule(row: [Option<String>; 5]) -> Option<LayerRule> {
    let [current, new, color, line_type, weight] = row.map(present);

    let source = current?.trim().to_string();
    let color = numeric(&color).map_or(FALLBACK_COLOR, |v| v as i32);
    let weight_mm = numeric(&weight).unwrap_or(0.0);

    Some(LayerRule::new(
        source,
        new.unwrap_or_else(|| FALLBACK_LAYER.to_string()),
        color,
        (weight_mm * 100.0) as i32,
        line_type.unwrap_or_else(|| FALLBACK_LINE_TYPE.to_string()),
    ))
}

fn build_table(rows: Vec<[Option<String>; 5]>) -> RuleTable {
    let mut table = RuleTable::new();
    let mut dropped = 0;
    for row in rows {
        match build_rule(row) {
            Some(rule) => {
                if let Some(previous) = table.insert(rule) {
                    debug!(source = %previous.source, "rule replaced by a later row");
                }
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "rows without currentLayer ignored");
    }
    table
}
