use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use foldersync_lib::logging::init_diagnostics;
use foldersync_lib::schedule::{add_job, build_sync_command, remove_job, UserCrontab};
use foldersync_lib::{AppConfig, FileLogger};
use std::path::PathBuf;
use tracing::debug;

/// 同步程序的文件名
const SYNC_BINARY: &str = if cfg!(windows) { "foldersync.exe" } else { "foldersync" };

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Add the job, or change its frequency if it already exists
    Add,
    /// Remove every job with the same command
    #[value(alias = "remove")]
    Del,
}

/// 在当前用户的 crontab 中添加或移除定时同步任务
#[derive(Debug, Parser)]
#[command(
    name = "foldersync-schedule",
    version,
    about = "Register or remove a periodic foldersync job in the user's crontab"
)]
struct Cli {
    /// Source folder path
    source: String,

    /// Replica folder path
    replica: String,

    /// Synchronisation interval in minutes
    interval: u32,

    /// Log file path
    log_file: String,

    /// add or del
    #[arg(value_enum, ignore_case = true)]
    mode: Mode,

    /// Unexpected extra arguments, ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    extra: Vec<String>,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// 多余参数的提示，不受诊断日志级别影响
fn extra_args_warning(extra: &[String]) -> Option<String> {
    if extra.is_empty() {
        return None;
    }
    Some(format!(
        "Additional (unexpected) command line arguments specified! \
         Expected usage: foldersync-schedule <source folder path> <replica folder path> \
         <synchronisation interval (minutes)> <log file path> <mode>. \
         The following arguments will be ignored: {:?}",
        extra
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    init_diagnostics(&AppConfig::load(&config_path).log);

    if let Some(warning) = extra_args_warning(&cli.extra) {
        eprintln!("{}", warning);
    }

    // 同步程序与本程序位于同一目录
    let current_exe = std::env::current_exe().context("无法获取当前程序路径")?;
    let working_dir = current_exe
        .parent()
        .map(PathBuf::from)
        .context("无法获取程序所在目录")?;
    let command = build_sync_command(
        &working_dir,
        &working_dir.join(SYNC_BINARY),
        &cli.source,
        &cli.replica,
        &cli.log_file,
    );
    debug!("定时命令: {}", command);

    let logger = FileLogger::open(&cli.log_file)
        .with_context(|| format!("无法打开日志文件 {}", cli.log_file))?;
    let mut crontab = UserCrontab::new();

    match cli.mode {
        Mode::Add => {
            add_job(&mut crontab, &command, cli.interval, &logger)?;
        }
        Mode::Del => {
            remove_job(&mut crontab, &command, &logger)?;
        }
    }

    Ok(())
}
