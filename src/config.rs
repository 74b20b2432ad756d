//! 应用配置模块

use crate::core::comparator::CompareConfig;
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 应用配置，对应 config.json 中的各个分节
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        crate::dirs::config_dir()
            .map(|p| p.join("foldersync"))
            .unwrap_or_else(|| PathBuf::from(".foldersync"))
            .join(CONFIG_FILE_NAME)
    }

    /// 从配置文件加载；文件不存在或无法解析时使用默认值
    pub fn load(config_file: &Path) -> Self {
        let Ok(content) = fs::read_to_string(config_file) else {
            return Self::default();
        };

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("配置文件无法解析，使用默认配置 {}: {}", config_file.display(), e);
                Self::default()
            }
        }
    }

    /// 保存配置，保留文件中的其他字段
    pub fn save(&self, config_file: &Path) -> io::Result<()> {
        let mut config: serde_json::Value = if config_file.exists() {
            let content = fs::read_to_string(config_file)?;
            serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };
        if !config.is_object() {
            config = serde_json::json!({});
        }

        config["compare"] = serde_json::to_value(&self.compare)?;
        config["log"] = serde_json::to_value(&self.log)?;

        if let Some(parent) = config_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(config_file, serde_json::to_string_pretty(&config)?)
    }
}
