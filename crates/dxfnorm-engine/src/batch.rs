//! 批处理
//!
//! 规则表、选项与图章在整批内只读共享；每个文档只由一个处理过程独占修改。
//! 单个文件加载或处理失败时记录并跳过，只有全部失败时整批才失败。

use crate::consolidate::NamedDocument;
use crate::error::EngineError;
use crate::options::NormalizeOptions;
use crate::pipeline::normalize;
use crate::report::{BatchReport, FileFailure, FileReport};
use crate::stamp::PreparedStamp;
use dxfnorm_core::document::Document;
use dxfnorm_core::rule::RuleTable;
use rayon::prelude::*;
use std::fmt::Display;
use tracing::{error, info};

/// 批处理结果
#[derive(Debug)]
pub struct BatchOutcome {
    /// 成功规范化的文档（与输入顺序一致）
    pub documents: Vec<NamedDocument>,
    pub report: BatchReport,
}

/// 单个文件的处理结果
enum FileOutcome {
    Normalized(NamedDocument, FileReport),
    Failed(FileFailure),
}

fn process_file<L, E>(
    name: &str,
    loader: &L,
    rules: &RuleTable,
    options: &NormalizeOptions,
    stamp: Option<&PreparedStamp>,
) -> FileOutcome
where
    L: Fn(&str) -> Result<Document, E>,
    E: Display,
{
    let failed = |error: String| {
        error!(file = name, "{error}");
        FileOutcome::Failed(FileFailure {
            name: name.to_string(),
            error,
        })
    };

    let mut document = match loader(name) {
        Ok(document) => document,
        Err(e) => return failed(format!("load failed: {e}")),
    };
    if document.name.is_empty() {
        document.name = name.to_string();
    }

    match normalize(&mut document, rules, options, stamp) {
        Ok(report) => FileOutcome::Normalized(NamedDocument::new(name, document), report),
        Err(e) => failed(format!("normalize failed: {e}")),
    }
}

/// 规范化一批文件
///
/// `loader` 按名称加载文档；`options.parallel` 为真时在 rayon 线程池上并行处理。
pub fn normalize_batch<L, E>(
    names: &[String],
    loader: L,
    rules: &RuleTable,
    options: &NormalizeOptions,
    stamp: Option<&PreparedStamp>,
) -> Result<BatchOutcome, EngineError>
where
    L: Fn(&str) -> Result<Document, E> + Sync,
    E: Display,
{
    options.validate()?;

    let outcomes: Vec<FileOutcome> = if options.parallel {
        names
            .par_iter()
            .map(|name| process_file(name, &loader, rules, options, stamp))
            .collect()
    } else {
        names
            .iter()
            .map(|name| process_file(name, &loader, rules, options, stamp))
            .collect()
    };

    let mut report = BatchReport::new();
    let mut documents = Vec::new();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Normalized(document, file_report) => {
                documents.push(document);
                report.files.push(file_report);
            }
            FileOutcome::Failed(failure) => report.failures.push(failure),
        }
    }

    info!(
        normalized = report.normalized_count(),
        failed = report.failed_count(),
        "batch finished"
    );

    if documents.is_empty() {
        return Err(EngineError::NoFilesNormalized {
            failed: report.failed_count(),
        });
    }

    Ok(BatchOutcome { documents, report })
}
