//! 应用配置
//!
//! 配置文件为 TOML，分为 `[logging]`、`[normalize]`、`[output]` 三节，缺省项取默认值。
//! 查找顺序：环境变量 `DXFNORM_CONFIG`，然后是 `./config/default.toml`，都不存在时使用默认配置。

use dxfnorm_engine::NormalizeOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "DXFNORM_CONFIG";

/// 应用配置的根结构
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，`RUST_LOG` 存在时以它为准
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 输出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// 每个输入文件输出一个规范化后的 DXF
    #[default]
    Separate,
    /// 所有文件合并为一个 DXF，每个来源一个布局
    Consolidated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default = "OutputConfig::default_directory")]
    pub directory: PathBuf,
    #[serde(default = "OutputConfig::default_consolidated_name")]
    pub consolidated_name: String,
    /// JSON 报告路径，未设置时不写报告
    #[serde(default)]
    pub report: Option<PathBuf>,
}

impl OutputConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("normalized")
    }

    fn default_consolidated_name() -> String {
        "consolidated.dxf".to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            directory: Self::default_directory(),
            consolidated_name: Self::default_consolidated_name(),
            report: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.output.mode, OutputMode::Separate);
        assert_eq!(cfg.output.directory, PathBuf::from("normalized"));
        assert!(cfg.output.report.is_none());
        assert!(!cfg.normalize.keep_revision_cloud);
        assert_eq!(cfg.normalize.revision_cloud_source_layer, "LAYER099");
    }

    #[test]
    fn test_load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [normalize]
            keep_revision_cloud = true
            revisionCloudSourceLayer = "REV"
            cloud_segment_length = 4.5

            [output]
            mode = "consolidated"
            directory = "out"
            report = "out/report.json"
            "#
        )
        .expect("write config");

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.normalize.keep_revision_cloud);
        assert_eq!(cfg.normalize.revision_cloud_source_layer, "REV");
        assert_eq!(cfg.normalize.cloud_segment_length, 4.5);
        assert_eq!(cfg.normalize.flatten_max_passes, 20);
        assert_eq!(cfg.output.mode, OutputMode::Consolidated);
        assert_eq!(cfg.output.directory, PathBuf::from("out"));
        assert_eq!(cfg.output.consolidated_name, "consolidated.dxf");
        assert_eq!(cfg.output.report, Some(PathBuf::from("out/report.json")));
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[output]\nmode = \"zip\"").expect("write config");

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
