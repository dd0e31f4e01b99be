//! 处理报告
//!
//! 每个操作的结果要么成功，要么"跳过并附原因"（[`Skip`]）。
//! 跳过项按阶段汇总为 [`StageReport`]，再汇总为单文件与整批报告。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// 被跳过的操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    /// 操作对象（实体、块或图层）
    pub target: String,
    /// 跳过原因
    pub reason: String,
}

impl Skip {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Flatten,
    Purge,
    ReclaimPre,
    LayerRules,
    Styles,
    Stamp,
    ReclaimPost,
    RevisionCloud,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Flatten => "flatten",
            Stage::Purge => "purge",
            Stage::ReclaimPre => "reclaim_pre",
            Stage::LayerRules => "layer_rules",
            Stage::Styles => "styles",
            Stage::Stamp => "stamp",
            Stage::ReclaimPost => "reclaim_post",
            Stage::RevisionCloud => "revision_cloud",
        }
    }
}

/// 单个阶段的结果
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// 成功修改的对象数量
    pub changed: usize,
    /// 被跳过的操作
    pub skipped: Vec<Skip>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            changed: 0,
            skipped: Vec::new(),
        }
    }

    /// 记录一次跳过
    pub fn skip(&mut self, skip: Skip) {
        tracing::warn!(stage = self.stage.name(), "skipped {}", skip);
        self.skipped.push(skip);
    }

    /// 记录一次操作结果
    pub fn record(&mut self, result: Result<(), Skip>) {
        match result {
            Ok(()) => self.changed += 1,
            Err(skip) => self.skip(skip),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// 单个文件的处理报告
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stages: Vec<StageReport>,
}

impl FileReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    /// 查找某阶段的报告
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// 所有阶段的跳过总数
    pub fn skipped_count(&self) -> usize {
        self.stages.iter().map(|s| s.skipped.len()).sum()
    }

    pub(crate) fn finish(&mut self) {
        let elapsed = Utc::now() - self.started_at;
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}

/// 整个文件无法处理
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub name: String,
    pub error: String,
}

/// 批处理报告
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            files: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn normalized_count(&self) -> usize {
        self.files.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
