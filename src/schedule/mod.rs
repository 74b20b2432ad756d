//! 定时任务管理 - 把同步命令注册到当前用户的 crontab 中

pub mod crontab;

pub use crontab::{Crontab, UserCrontab};

use crate::error::ScheduleError;
use crate::logging::ActionLog;
use std::path::Path;

/// 允许的同步间隔（分钟），必须能写成分钟字段的步长
pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 59;

/// 一条定时任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    /// 五段式时间表达式，或 `@reboot` 之类的特殊表达式
    pub schedule: String,
    pub command: String,
}

impl ScheduledJob {
    /// 每 `interval` 分钟执行一次的任务
    pub fn every_minutes(command: &str, interval: u32) -> Self {
        Self {
            schedule: format!("{} * * * *", minute_step(interval)),
            command: command.to_string(),
        }
    }

    /// 如果时间表达式是“每 N 分钟”，返回 N
    pub fn interval_minutes(&self) -> Option<u32> {
        let fields: Vec<&str> = self.schedule.split_whitespace().collect();
        if fields.len() != 5 || fields[1..].iter().any(|f| *f != "*") {
            return None;
        }
        match fields[0] {
            "*" => Some(1),
            minute => minute.strip_prefix("*/")?.parse().ok(),
        }
    }

    /// 只修改分钟字段；特殊表达式整体替换
    fn set_every_minutes(&mut self, interval: u32) {
        let step = minute_step(interval);
        let mut fields: Vec<&str> = self.schedule.split_whitespace().collect();
        if fields.len() == 5 {
            fields[0] = &step;
            self.schedule = fields.join(" ");
        } else {
            self.schedule = format!("{} * * * *", step);
        }
    }
}

fn minute_step(interval: u32) -> String {
    if interval == 1 {
        "*".to_string()
    } else {
        format!("*/{}", interval)
    }
}

/// 校验同步间隔
pub fn validate_interval(interval: u32) -> Result<u32, ScheduleError> {
    if (MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&interval) {
        Ok(interval)
    } else {
        Err(ScheduleError::InvalidInterval(interval))
    }
}

/// 添加或更新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChange {
    /// 新建了一条任务
    Added,
    /// 已有 N 条同命令任务，修改了它们的频率
    Updated(usize),
}

/// 外部定时任务表
///
/// 以命令字符串完全匹配作为任务标识。
pub trait Scheduler {
    fn list_jobs(&mut self) -> Result<Vec<ScheduledJob>, ScheduleError>;

    /// 不存在则新建，存在则修改所有匹配任务的频率
    fn add_or_update(&mut self, command: &str, interval_minutes: u32)
        -> Result<ScheduleChange, ScheduleError>;

    /// 删除所有匹配的任务，返回删除数量
    fn remove_all(&mut self, command: &str) -> Result<usize, ScheduleError>;
}

/// 注册同步任务并记录结果
pub fn add_job<S, L>(
    scheduler: &mut S,
    command: &str,
    interval_minutes: u32,
    log: &L,
) -> Result<ScheduleChange, ScheduleError>
where
    S: Scheduler + ?Sized,
    L: ActionLog + ?Sized,
{
    let interval = validate_interval(interval_minutes)?;
    let change = scheduler.add_or_update(command, interval)?;

    match change {
        ScheduleChange::Added => log.record(&format!(
            "Cron job {} added with frequency every {} minutes!",
            command, interval
        )),
        ScheduleChange::Updated(_) => log.record(&format!(
            "Cron job already exists, modifying frequency to every {} minutes!",
            interval
        )),
    }

    Ok(change)
}

/// 移除同步任务；没有匹配任务时只记录日志
pub fn remove_job<S, L>(scheduler: &mut S, command: &str, log: &L) -> Result<usize, ScheduleError>
where
    S: Scheduler + ?Sized,
    L: ActionLog + ?Sized,
{
    let removed = scheduler.remove_all(command)?;

    if removed > 0 {
        log.record(&format!("Cron job(s) with command {} removed.", command));
    } else {
        log.record(&format!("No matching cron job found for command {}", command));
    }

    Ok(removed)
}

/// 构造定时执行的同步命令：先切换工作目录，再调用同步程序
///
/// crontab 会把命令中未转义的 `%` 换成换行，引号也挡不住，所以统一写成 `\%`。
pub fn build_sync_command(
    working_dir: &Path,
    executable: &Path,
    source: &str,
    replica: &str,
    log_file: &str,
) -> String {
    let command = format!(
        "cd {}; {} {} {} {}",
        shell_quote(&working_dir.to_string_lossy()),
        shell_quote(&executable.to_string_lossy()),
        shell_quote(source),
        shell_quote(replica),
        shell_quote(log_file)
    );
    command.replace('%', r"\%")
}

/// 需要时用单引号包裹参数
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
