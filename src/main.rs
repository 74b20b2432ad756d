use anyhow::{Context, Result};
use clap::Parser;
use foldersync_lib::logging::init_diagnostics;
use foldersync_lib::{AppConfig, FileLogger, SyncEngine};
use std::path::PathBuf;
use tracing::debug;

/// 单向同步：让副本目录与源目录保持一致
#[derive(Debug, Parser)]
#[command(name = "foldersync", version, about = "Mirror a source folder into a replica folder")]
struct Cli {
    /// Source folder (never modified)
    source: PathBuf,

    /// Replica folder (made identical to the source)
    replica: PathBuf,

    /// Log file that every action is appended to
    log_file: PathBuf,

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
         Expected usage: foldersync <source folder path> <replica folder path> <log file path>. \
         The following arguments will be ignored: {:?}",
        extra
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path);
    init_diagnostics(&config.log);

    if let Some(warning) = extra_args_warning(&cli.extra) {
        eprintln!("{}", warning);
    }

    let logger = FileLogger::open(&cli.log_file)
        .with_context(|| format!("无法打开日志文件 {}", cli.log_file.display()))?;
    debug!("配置: {:?}, 日志: {}", config, logger.path().display());

    let engine = SyncEngine::with_config(logger, config.compare);
    let report = engine.sync(&cli.source, &cli.replica)?;

    debug!("同步报告: {}", serde_json::to_string(&report)?);
    Ok(())
}
