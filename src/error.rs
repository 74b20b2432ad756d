//! 错误类型

use std::path::PathBuf;

/// 同步过程中无法恢复的错误
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// 源目录不存在，没有可同步的内容
    #[error("Could not find the source folder at the provided path: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// 无法解析为绝对路径（通常是当前工作目录不可用）
    #[error("Could not resolve path {}: {source}", .path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 定时任务管理错误
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// 间隔必须能表示为分钟字段的步长
    #[error("Invalid synchronisation interval {0}: expected a number of minutes between 1 and 59")]
    InvalidInterval(u32),

    /// crontab 命令执行失败
    #[error("crontab {action} failed: {message}")]
    Crontab { action: &'static str, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
