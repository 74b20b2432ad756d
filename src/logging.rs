//! 日志模块 - 同步动作日志（文件 + 控制台）以及诊断日志

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// 时间戳格式，例如 `2024-01-01 12:00:00.000000`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// 同步动作日志
///
/// 每一次复制、删除以及每一次失败都会写一条记录。实现需要自行处理写入失败，
/// 日志问题不应中断同步流程。
pub trait ActionLog {
    /// 写入日志文件并回显到控制台
    fn record(&self, message: &str);

    /// 只写入日志文件
    fn record_file_only(&self, message: &str);
}

impl<T: ActionLog + ?Sized> ActionLog for &T {
    fn record(&self, message: &str) {
        (**self).record(message)
    }

    fn record_file_only(&self, message: &str) {
        (**self).record_file_only(message)
    }
}

/// 给消息加上方括号时间戳前缀
pub fn format_line(message: &str) -> String {
    format!(
        "[{}] {}",
        chrono::Local::now().format(TIMESTAMP_FORMAT),
        message
    )
}

/// 追加写入的文件日志
pub struct FileLogger {
    file_path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl FileLogger {
    /// 以追加模式打开日志文件，必要时创建父目录
    pub fn open(file_path: impl AsRef<Path>) -> io::Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        Ok(Self {
            file_path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn append(&self, message: &str) {
        let line = format_line(message);
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        // 每条记录立即落盘，进程崩溃时日志仍然完整
        let result = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        if let Err(e) = result {
            tracing::warn!("写入日志文件失败 {}: {}", self.file_path.display(), e);
        }
    }
}

impl Clone for FileLogger {
    fn clone(&self) -> Self {
        Self {
            file_path: self.file_path.clone(),
            writer: self.writer.clone(),
        }
    }
}

impl ActionLog for FileLogger {
    fn record(&self, message: &str) {
        println!("{}", message);
        self.append(message);
    }

    fn record_file_only(&self, message: &str) {
        self.append(message);
    }
}

/// 单条内存日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub message: String,
    /// 是否同时回显到了控制台
    pub echoed: bool,
}

/// 内存日志，供嵌入使用和测试
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    /// 以指定前缀开头的消息
    pub fn messages_starting_with(&self, prefix: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.starts_with(prefix))
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn push(&self, message: &str, echoed: bool) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LogRecord {
                message: message.to_string(),
                echoed,
            });
    }
}

impl ActionLog for MemoryLog {
    fn record(&self, message: &str) {
        self.push(message, true);
    }

    fn record_file_only(&self, message: &str) {
        self.push(message, false);
    }
}

/// 诊断日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LogConfig {
    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "info" => tracing::Level::INFO,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::WARN,
        }
    }
}

/// 初始化诊断日志（stderr），RUST_LOG 优先于配置
pub fn init_diagnostics(config: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.tracing_level().into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
