use crate::core::comparator::{CompareConfig, FileComparator};
use crate::core::purge::purge;
use crate::core::transfer::{reconcile, TransferSummary};
use crate::error::SyncError;
use crate::logging::ActionLog;
use crate::storage::{absolutize, copy_tree};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// 单层目录的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelOutcome {
    /// 副本目录不存在，整体复制
    FreshCopy,
    /// 复制、删除、递归都已完成
    Completed,
    /// 复制阶段有失败，本层停止（不删除、不递归）
    HaltedAfterReconcile,
    /// 删除阶段有失败，本层停止（不递归）
    HaltedAfterPurge,
    /// 无法比较本层目录
    HaltedAfterCompare,
}

/// 同步报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub start_time: i64,
    pub end_time: i64,
    /// 访问过的目录层数
    pub levels_visited: u32,
    pub entries_copied: u32,
    pub files_copied: u32,
    pub bytes_copied: u64,
    pub entries_deleted: u32,
    pub entries_failed: u32,
    /// 因失败而停止处理的目录
    pub halted: Vec<PathBuf>,
    pub errors: Vec<String>,
    /// 耗时（毫秒）
    pub duration: u64,
}

impl SyncReport {
    /// 没有任何条目失败
    pub fn is_clean(&self) -> bool {
        self.entries_failed == 0 && self.halted.is_empty()
    }

    fn absorb_copies(&mut self, dir: &Path, summary: &TransferSummary) {
        self.entries_copied += summary.succeeded as u32;
        self.files_copied += summary.files as u32;
        self.bytes_copied += summary.bytes;
        self.absorb_failures(dir, summary);
    }

    fn absorb_deletes(&mut self, dir: &Path, summary: &TransferSummary) {
        self.entries_deleted += summary.succeeded as u32;
        self.absorb_failures(dir, summary);
    }

    fn absorb_failures(&mut self, dir: &Path, summary: &TransferSummary) {
        for failure in &summary.failed {
            self.entries_failed += 1;
            self.errors.push(format!(
                "{}: {}",
                dir.join(&failure.name).display(),
                failure.error
            ));
        }
    }
}

/// 同步引擎
///
/// 单线程、顺序执行：每层目录依次比较、复制、删除，然后递归进入两侧共有的子目录。
/// 调用方需保证同一对目录不会同时运行两次同步。
pub struct SyncEngine<L: ActionLog> {
    comparator: FileComparator,
    log: L,
}

impl<L: ActionLog> SyncEngine<L> {
    pub fn new(log: L) -> Self {
        Self {
            comparator: FileComparator::default(),
            log,
        }
    }

    pub fn with_config(log: L, config: CompareConfig) -> Self {
        Self {
            comparator: FileComparator::with_config(config),
            log,
        }
    }

    /// 让副本目录与源目录一致
    ///
    /// 只有源目录不存在时返回错误；单个条目的失败记录在日志和报告中。
    pub fn sync(&self, source: &Path, replica: &Path) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let source = absolutize(source).map_err(|e| SyncError::Resolve {
            path: source.to_path_buf(),
            source: e,
        })?;
        let replica = absolutize(replica).map_err(|e| SyncError::Resolve {
            path: replica.to_path_buf(),
            source: e,
        })?;

        info!("开始同步: {} -> {}", source.display(), replica.display());

        let mut report = SyncReport {
            source: source.clone(),
            replica: replica.clone(),
            start_time: chrono::Utc::now().timestamp(),
            ..Default::default()
        };

        if let Err(e) = self.sync_level(&source, &replica, &mut report) {
            self.log.record_file_only(&format!("EXCEPTION: {}", e));
            return Err(e);
        }

        report.end_time = chrono::Utc::now().timestamp();
        report.duration = started.elapsed().as_millis() as u64;

        info!(
            "同步完成: 复制 {} 个条目, 删除 {} 个条目, 失败 {} 个, 耗时 {}ms",
            report.entries_copied, report.entries_deleted, report.entries_failed, report.duration
        );

        Ok(report)
    }

    /// 处理一层目录并递归
    fn sync_level(
        &self,
        source: &Path,
        replica: &Path,
        report: &mut SyncReport,
    ) -> Result<LevelOutcome, SyncError> {
        if !source.exists() {
            return Err(SyncError::SourceNotFound(source.to_path_buf()));
        }
        report.levels_visited += 1;

        if !replica.exists() {
            self.log.record(&format!(
                "Replica folder not found at path {}. Copying entire source folder from path {}",
                replica.display(),
                source.display()
            ));

            match copy_tree(source, replica) {
                Ok(tree) => {
                    report.entries_copied += 1;
                    report.files_copied += tree.files as u32;
                    report.bytes_copied += tree.bytes;
                }
                Err(e) => {
                    self.log.record(&format!(
                        "Exception while copying entire folder {}: {}",
                        source.display(),
                        e
                    ));
                    report.entries_failed += 1;
                    report.errors.push(format!("{}: {}", source.display(), e));
                    report.halted.push(replica.to_path_buf());
                }
            }
            return Ok(LevelOutcome::FreshCopy);
        }

        let classification = match self.comparator.compare_level(source, replica) {
            Ok(classification) => classification,
            Err(e) => {
                self.log.record(&format!(
                    "Exception while comparing folders {} and {}: {}",
                    source.display(),
                    replica.display(),
                    e
                ));
                report.errors.push(format!("{}: {}", source.display(), e));
                report.halted.push(replica.to_path_buf());
                return Ok(LevelOutcome::HaltedAfterCompare);
            }
        };

        debug!(
            "{}: {} 个新增, {} 个修改, {} 个多余, {} 个共有子目录",
            source.display(),
            classification.source_only.len(),
            classification.modified.len(),
            classification.replica_only.len(),
            classification.common_subdirs.len()
        );

        let copied = reconcile(source, replica, &classification.to_copy(), &self.log);
        report.absorb_copies(source, &copied);
        if !copied.all_succeeded() {
            // 未完全复制的层不做删除和递归
            report.halted.push(replica.to_path_buf());
            return Ok(LevelOutcome::HaltedAfterReconcile);
        }

        let deleted = purge(replica, &classification.to_delete(), &self.log);
        report.absorb_deletes(replica, &deleted);
        if !deleted.all_succeeded() {
            report.halted.push(replica.to_path_buf());
            return Ok(LevelOutcome::HaltedAfterPurge);
        }

        for name in &classification.common_subdirs {
            let child_source = source.join(name);
            let child_replica = replica.join(name);

            // 子树之间互不影响
            if let Err(e) = self.sync_level(&child_source, &child_replica, report) {
                self.log.record(&format!(
                    "Source folder vanished during synchronisation: {}",
                    child_source.display()
                ));
                report.errors.push(e.to_string());
            }
        }

        Ok(LevelOutcome::Completed)
    }
}
