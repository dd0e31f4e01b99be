//! 批量规范化作业
//!
//! 收集输入文件，准备图章，调用引擎批处理，再按输出方式写出 DXF 与 JSON 报告。

use crate::config::{OutputConfig, OutputMode};
use anyhow::{bail, Context, Result};
use dxfnorm_core::rule::RuleTable;
use dxfnorm_engine::{
    consolidate, normalize_batch, BatchReport, ConsolidationReport, NormalizeOptions, PreparedStamp,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// 输入目录中自动识别为图章的文件名（不区分大小写）
pub const STAMP_FILE_NAME: &str = "logos.dxf";

/// 一次作业的全部参数
#[derive(Debug, Clone)]
pub struct Job {
    pub inputs: Vec<PathBuf>,
    pub rules: RuleTable,
    pub options: NormalizeOptions,
    pub output: OutputConfig,
    /// 显式指定的图章；为空时在输入中查找 `logos.dxf`
    pub stamp: Option<PathBuf>,
}

/// 写入 JSON 的作业报告
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub batch: BatchReport,
    pub stamp: Option<String>,
    pub written: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidation: Option<ConsolidationReport>,
}

/// 展开输入：目录取其中的 `.dxf` 文件（不递归），文件原样保留；结果按路径排序去重
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .with_context(|| format!("cannot read directory {}", input.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_file() && has_dxf_extension(&path) {
                    files.push(path);
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn has_dxf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dxf"))
}

fn is_stamp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(STAMP_FILE_NAME))
}

/// 准备图章，返回图章及剩余需要规范化的文件
///
/// 显式图章加载失败是致命错误；自动识别的 `logos.dxf` 加载失败时只告警，
/// 并把它当作普通文件继续处理。
pub fn prepare_stamp(
    files: Vec<PathBuf>,
    explicit: Option<&Path>,
    max_passes: usize,
) -> Result<(Option<(String, PreparedStamp)>, Vec<PathBuf>)> {
    if let Some(path) = explicit {
        let document = dxfnorm_file::import(path)
            .with_context(|| format!("cannot load stamp {}", path.display()))?;
        let stamp = PreparedStamp::new(document, max_passes);
        return Ok((Some((path.display().to_string(), stamp)), files));
    }

    let Some(position) = files.iter().position(|p| is_stamp_file(p)) else {
        return Ok((None, files));
    };

    match dxfnorm_file::import(&files[position]) {
        Ok(document) => {
            let mut files = files;
            let path = files.remove(position);
            info!(stamp = %path.display(), "using stamp found among inputs");
            let stamp = PreparedStamp::new(document, max_passes);
            Ok((Some((path.display().to_string(), stamp)), files))
        }
        Err(e) => {
            warn!(stamp = %files[position].display(), "cannot load stamp, continuing without it: {e}");
            Ok((None, files))
        }
    }
}

/// 执行作业
pub fn run(job: Job) -> Result<JobReport> {
    let files = collect_inputs(&job.inputs)?;
    if files.is_empty() {
        bail!("no DXF files found in the given inputs");
    }

    let (stamp, files) = prepare_stamp(files, job.stamp.as_deref(), job.options.flatten_max_passes)?;
    if files.is_empty() {
        bail!("nothing to normalize besides the stamp");
    }
    info!(files = files.len(), rules = job.rules.len(), "starting batch");

    let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    let outcome = normalize_batch(
        &names,
        |name: &str| dxfnorm_file::import(Path::new(name)),
        &job.rules,
        &job.options,
        stamp.as_ref().map(|(_, s)| s),
    )?;

    fs::create_dir_all(&job.output.directory).with_context(|| {
        format!("cannot create output directory {}", job.output.directory.display())
    })?;

    let mut written = Vec::new();
    let mut consolidation = None;
    match job.output.mode {
        OutputMode::Separate => {
            let mut taken = HashSet::new();
            for mut named in outcome.documents {
                let target = job.output.directory.join(output_name(&named.name, &mut taken));
                match dxfnorm_file::export(&mut named.document, &target) {
                    Ok(()) => written.push(target),
                    Err(e) => error!(file = %target.display(), "export failed: {e}"),
                }
            }
        }
        OutputMode::Consolidated => {
            let (mut merged, report) = consolidate(&outcome.documents);
            let target = job.output.directory.join(&job.output.consolidated_name);
            dxfnorm_file::export(&mut merged, &target)
                .with_context(|| format!("cannot write {}", target.display()))?;
            written.push(target);
            consolidation = Some(report);
        }
    }

    if written.is_empty() {
        bail!("no output file could be written");
    }

    let report = JobReport {
        batch: outcome.report,
        stamp: stamp.map(|(name, _)| name),
        written,
        consolidation,
    };

    if let Some(path) = &job.output.report {
        write_report(&report, path)?;
    }

    info!(
        normalized = report.batch.normalized_count(),
        failed = report.batch.failed_count(),
        written = report.written.len(),
        "batch finished"
    );
    Ok(report)
}

/// 分别输出时的文件名；同名输入依次加 `-2`、`-3` 后缀，不区分大小写
fn output_name(source: &str, taken: &mut HashSet<String>) -> String {
    let path = Path::new(source);
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(source)
        .to_string();
    if taken.insert(file_name.to_lowercase()) {
        return file_name;
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(source);
    let extension = path.extension().and_then(|s| s.to_str());
    let mut counter = 2;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{stem}-{counter}.{ext}"),
            None => format!("{stem}-{counter}"),
        };
        if taken.insert(candidate.to_lowercase()) {
            warn!(source, output = %candidate, "output name already used, renamed");
            return candidate;
        }
        counter += 1;
    }
}

fn write_report(report: &JobReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("cannot write report {}", path.display()))?;
    info!(report = %path.display(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxfnorm_core::prelude::*;
    use tempfile::tempdir;

    fn write_drawing(path: &Path, layer: &str) {
        let mut doc = Document::new();
        doc.layers_mut().ensure_layer(layer);
        doc.model_space_mut().add_entity(
            Entity::new(Geometry::Line(Line::new(Point2::origin(), Point2::new(10.0, 0.0))))
                .on_layer(layer),
        );
        dxfnorm_file::export(&mut doc, path).unwrap();
    }

    fn rules() -> RuleTable {
        [LayerRule::new("A", "B", 1, 25, "continuous")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_collect_inputs_filters_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.DXF"), "").unwrap();
        fs::write(dir.path().join("a.dxf"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.dxf", "b.DXF"]);
    }

    #[test]
    fn test_logos_file_becomes_stamp() {
        let dir = tempdir().unwrap();
        write_drawing(&dir.path().join("LOGOS.dxf"), "LOGO");
        write_drawing(&dir.path().join("sheet.dxf"), "A");
        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();

        let (stamp, remaining) = prepare_stamp(files, None, 20).unwrap();

        assert!(stamp.is_some());
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].ends_with("sheet.dxf"));
    }

    #[test]
    fn test_run_separate_with_report() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        write_drawing(&input.join("one.dxf"), "A");
        write_drawing(&input.join("two.dxf"), "A");
        fs::write(input.join("broken.dxf"), "not a drawing").unwrap();

        let output = OutputConfig {
            directory: dir.path().join("out"),
            report: Some(dir.path().join("out/report.json")),
            ..Default::default()
        };
        let report = run(Job {
            inputs: vec![input],
            rules: rules(),
            options: NormalizeOptions::default(),
            output,
            stamp: None,
        })
        .unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.batch.failed_count(), 1);

        let normalized = dxfnorm_file::import(&dir.path().join("out/one.dxf")).unwrap();
        assert!(normalized.layers().contains("B"));
        assert!(!normalized.layers().contains("A"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("out/report.json")).unwrap())
                .unwrap();
        assert_eq!(json["batch"]["failures"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_output_name_collisions() {
        let mut taken = HashSet::new();

        assert_eq!(output_name("a/one.dxf", &mut taken), "one.dxf");
        assert_eq!(output_name("b/ONE.dxf", &mut taken), "ONE-2.dxf");
        assert_eq!(output_name("c/one.dxf", &mut taken), "one-3.dxf");
        assert_eq!(output_name("d/two.dxf", &mut taken), "two.dxf");
    }

    #[test]
    fn test_run_separate_keeps_same_named_inputs() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("north");
        let second = dir.path().join("south");
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();
        write_drawing(&first.join("one.dxf"), "A");
        write_drawing(&second.join("one.dxf"), "KEEP");

        let output = OutputConfig {
            directory: dir.path().join("out"),
            ..Default::default()
        };
        let report = run(Job {
            inputs: vec![first, second],
            rules: rules(),
            options: NormalizeOptions::default(),
            output,
            stamp: None,
        })
        .unwrap();

        assert_eq!(report.written.len(), 2);
        assert_ne!(report.written[0], report.written[1]);
        let north = dxfnorm_file::import(&dir.path().join("out/one.dxf")).unwrap();
        let south = dxfnorm_file::import(&dir.path().join("out/one-2.dxf")).unwrap();
        assert!(north.layers().contains("B"));
        assert!(south.layers().contains("KEEP"));
    }

    #[test]
    fn test_run_consolidated() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        write_drawing(&input.join("one.dxf"), "A");
        write_drawing(&input.join("two.dxf"), "A");

        let output = OutputConfig {
            mode: OutputMode::Consolidated,
            directory: dir.path().join("out"),
            ..Default::default()
        };
        let report = run(Job {
            inputs: vec![input],
            rules: rules(),
            options: NormalizeOptions::default(),
            output,
            stamp: None,
        })
        .unwrap();

        let consolidation = report.consolidation.unwrap();
        assert_eq!(consolidation.sources.len(), 2);
        assert_eq!(consolidation.sources[0].layout, "FL 01");
        assert!(dir.path().join("out/consolidated.dxf").exists());
    }
}
