//! 规范化选项

use crate::error::EngineError;
use crate::flatten::DEFAULT_MAX_PASSES;
use crate::revcloud::DEFAULT_SEGMENT_LENGTH;
use serde::{Deserialize, Serialize};

/// 修订云默认来源图层
pub const DEFAULT_CLOUD_LAYER: &str = "LAYER099";

/// 填充默认来源图层
pub const DEFAULT_HATCH_LAYER: &str = "LAYER100";

/// 单文件规范化选项
///
/// 字段同时接受 snake_case 与 camelCase 名称。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// 是否把来源图层上的闭合轮廓转换为修订云
    #[serde(alias = "keepRevisionCloud")]
    pub keep_revision_cloud: bool,

    /// 修订云来源图层（会经过规则表重映射）
    #[serde(alias = "revisionCloudSourceLayer")]
    pub revision_cloud_source_layer: String,

    /// 保留填充（目前不做任何处理）
    #[serde(alias = "keepHatches")]
    pub keep_hatches: bool,

    /// 填充来源图层（目前不做任何处理）
    #[serde(alias = "hatchSourceLayer")]
    pub hatch_source_layer: String,

    /// 修订云弧段最大长度
    #[serde(alias = "cloudSegmentLength")]
    pub cloud_segment_length: f64,

    /// 块展开的最大轮数
    #[serde(alias = "flattenMaxPasses")]
    pub flatten_max_passes: usize,

    /// 批处理时并行处理文件
    pub parallel: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            keep_revision_cloud: false,
            revision_cloud_source_layer: DEFAULT_CLOUD_LAYER.to_string(),
            keep_hatches: false,
            hatch_source_layer: DEFAULT_HATCH_LAYER.to_string(),
            cloud_segment_length: DEFAULT_SEGMENT_LENGTH,
            flatten_max_passes: DEFAULT_MAX_PASSES,
            parallel: false,
        }
    }
}

impl NormalizeOptions {
    /// 检查选项取值
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.cloud_segment_length.is_finite() && self.cloud_segment_length > 0.0) {
            return Err(EngineError::InvalidOption {
                name: "cloud_segment_length",
                reason: format!("must be a positive number, got {}", self.cloud_segment_length),
            });
        }
        if self.flatten_max_passes == 0 {
            return Err(EngineError::InvalidOption {
                name: "flatten_max_passes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.keep_revision_cloud && self.revision_cloud_source_layer.trim().is_empty() {
            return Err(EngineError::InvalidOption {
                name: "revision_cloud_source_layer",
                reason: "must not be empty when revision clouds are enabled".to_string(),
            });
        }
        Ok(())
    }
}
