use super::{ScheduleChange, ScheduledJob, Scheduler};
use crate::error::ScheduleError;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// 五段式任务行：分 时 日 月 周 命令
fn job_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\S+\s+\S+\s+\S+\s+\S+\s+\S+)\s+(\S.*)$").expect("valid cron line regex")
    })
}

/// 环境变量赋值行，例如 MAILTO=ops
fn env_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[A-Za-z_][A-Za-z0-9_]*\s*=").expect("valid env line regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CrontabLine {
    Job(ScheduledJob),
    /// 注释、空行、环境变量等原样保留
    Verbatim(String),
}

/// 内存中的 crontab
///
/// 非任务行在解析和输出之间保持不变。也用作测试中的定时任务表。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Crontab {
    lines: Vec<CrontabLine>,
}

impl Crontab {
    pub fn parse(text: &str) -> Self {
        let lines = text.lines().map(parse_line).collect();
        Self { lines }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                CrontabLine::Job(job) => {
                    out.push_str(&job.schedule);
                    out.push(' ');
                    out.push_str(&job.command);
                }
                CrontabLine::Verbatim(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    fn jobs_mut(&mut self) -> impl Iterator<Item = &mut ScheduledJob> {
        self.lines.iter_mut().filter_map(|line| match line {
            CrontabLine::Job(job) => Some(job),
            CrontabLine::Verbatim(_) => None,
        })
    }
}

fn parse_line(raw: &str) -> CrontabLine {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || env_line().is_match(trimmed) {
        return CrontabLine::Verbatim(raw.to_string());
    }

    // @reboot、@daily 等特殊表达式
    if trimmed.starts_with('@') {
        if let Some((schedule, command)) = trimmed.split_once(char::is_whitespace) {
            return CrontabLine::Job(ScheduledJob {
                schedule: schedule.to_string(),
                command: command.trim().to_string(),
            });
        }
        return CrontabLine::Verbatim(raw.to_string());
    }

    match job_line().captures(trimmed) {
        Some(caps) => CrontabLine::Job(ScheduledJob {
            schedule: caps[1].split_whitespace().collect::<Vec<_>>().join(" "),
            command: caps[2].trim_end().to_string(),
        }),
        None => CrontabLine::Verbatim(raw.to_string()),
    }
}

impl Scheduler for Crontab {
    fn list_jobs(&mut self) -> Result<Vec<ScheduledJob>, ScheduleError> {
        Ok(self.jobs_mut().map(|job| job.clone()).collect())
    }

    fn add_or_update(
        &mut self,
        command: &str,
        interval_minutes: u32,
    ) -> Result<ScheduleChange, ScheduleError> {
        let interval = super::validate_interval(interval_minutes)?;

        let mut updated = 0;
        for job in self.jobs_mut().filter(|job| job.command == command) {
            job.set_every_minutes(interval);
            updated += 1;
        }

        if updated > 0 {
            return Ok(ScheduleChange::Updated(updated));
        }

        self.lines
            .push(CrontabLine::Job(ScheduledJob::every_minutes(command, interval)));
        Ok(ScheduleChange::Added)
    }

    fn remove_all(&mut self, command: &str) -> Result<usize, ScheduleError> {
        let before = self.lines.len();
        self.lines.retain(|line| match line {
            CrontabLine::Job(job) => job.command != command,
            CrontabLine::Verbatim(_) => true,
        });
        Ok(before - self.lines.len())
    }
}

/// 当前用户的 crontab（通过 `crontab` 命令读写）
#[derive(Debug, Clone)]
pub struct UserCrontab {
    program: PathBuf,
}

impl Default for UserCrontab {
    fn default() -> Self {
        Self {
            program: PathBuf::from("crontab"),
        }
    }
}

impl UserCrontab {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的 crontab 程序
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 读取当前 crontab；用户还没有 crontab 时返回空表
    pub fn load(&self) -> Result<Crontab, ScheduleError> {
        let output = Command::new(&self.program).arg("-l").output()?;

        if output.status.success() {
            return Ok(Crontab::parse(&String::from_utf8_lossy(&output.stdout)));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_lowercase().contains("no crontab") {
            tracing::debug!("当前用户还没有 crontab");
            return Ok(Crontab::default());
        }

        Err(ScheduleError::Crontab {
            action: "-l",
            message: stderr.trim().to_string(),
        })
    }

    /// 写回整个 crontab
    pub fn store(&self, table: &Crontab) -> Result<(), ScheduleError> {
        let mut child = Command::new(&self.program)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(table.render().as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ScheduleError::Crontab {
                action: "install",
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Scheduler for UserCrontab {
    fn list_jobs(&mut self) -> Result<Vec<ScheduledJob>, ScheduleError> {
        self.load()?.list_jobs()
    }

    fn add_or_update(
        &mut self,
        command: &str,
        interval_minutes: u32,
    ) -> Result<ScheduleChange, ScheduleError> {
        let mut table = self.load()?;
        let change = table.add_or_update(command, interval_minutes)?;
        self.store(&table)?;
        Ok(change)
    }

    fn remove_all(&mut self, command: &str) -> Result<usize, ScheduleError> {
        let mut table = self.load()?;
        let removed = table.remove_all(command)?;
        if removed > 0 {
            self.store(&table)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING: &str = "\
# m h dom mon dow command
MAILTO=ops@example.com

0 3 * * * /usr/bin/backup --full
@reboot /usr/local/bin/agent   start
*/10  *  * * *   cd /opt/fs; /opt/fs/foldersync /a /b /c.log
";

    #[test]
    fn test_parse_keeps_other_lines() {
        let table = Crontab::parse(EXISTING);
        let mut table_mut = table.clone();
        let jobs = table_mut.list_jobs().unwrap();

        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].schedule, "0 3 * * *");
        assert_eq!(jobs[0].command, "/usr/bin/backup --full");
        assert_eq!(jobs[1].schedule, "@reboot");
        assert_eq!(jobs[1].command, "/usr/local/bin/agent   start");
        assert_eq!(jobs[2].interval_minutes(), Some(10));
        assert_eq!(jobs[2].command, "cd /opt/fs; /opt/fs/foldersync /a /b /c.log");

        let rendered = table.render();
        assert!(rendered.starts_with("# m h dom mon dow command\nMAILTO=ops@example.com\n\n"));
        assert!(rendered.ends_with("*/10 * * * * cd /opt/fs; /opt/fs/foldersync /a /b /c.log\n"));
    }

    #[test]
    fn test_update_rewrites_minute_field_only() {
        let mut table = Crontab::parse(EXISTING);
        let change = table
            .add_or_update("cd /opt/fs; /opt/fs/foldersync /a /b /c.log", 2)
            .unwrap();

        assert_eq!(change, ScheduleChange::Updated(1));
        assert!(table
            .render()
            .contains("\n*/2 * * * * cd /opt/fs; /opt/fs/foldersync /a /b /c.log\n"));
        assert_eq!(table.list_jobs().unwrap().len(), 3);
    }

    #[test]
    fn test_add_appends_new_job() {
        let mut table = Crontab::parse(EXISTING);
        assert_eq!(
            table.add_or_update("/bin/true", 30).unwrap(),
            ScheduleChange::Added
        );
        assert!(table.render().ends_with("*/30 * * * * /bin/true\n"));
    }

    #[test]
    fn test_remove_ignores_verbatim_lines() {
        let mut table = Crontab::parse(EXISTING);
        assert_eq!(table.remove_all("MAILTO=ops@example.com").unwrap(), 0);
        assert_eq!(table.remove_all("/usr/bin/backup --full").unwrap(), 1);
        assert!(table.render().contains("MAILTO=ops@example.com"));
        assert!(!table.render().contains("backup"));
    }

    #[test]
    fn test_empty_table_renders_empty() {
        assert_eq!(Crontab::parse("").render(), "");
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let crontab = UserCrontab::with_program("/nonexistent/crontab-binary");
        assert!(matches!(crontab.load(), Err(ScheduleError::Io(_))));
    }
}
