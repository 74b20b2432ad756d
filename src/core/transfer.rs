//! 条目复制 - 把新增和修改的条目从源目录复制到副本目录

use crate::logging::ActionLog;
use crate::storage::{copy_file, copy_tree, entry_kind};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;

/// 单个条目的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub name: OsString,
    pub error: String,
}

/// 一批条目的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// 成功处理的条目数
    pub succeeded: usize,
    /// 涉及的文件数（目录条目按其中的文件计）
    pub files: usize,
    pub bytes: u64,
    pub failed: Vec<EntryFailure>,
}

impl TransferSummary {
    /// 所有条目都成功（空批次也算成功）
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn fail(&mut self, name: &OsStr, error: &io::Error) {
        self.failed.push(EntryFailure {
            name: name.to_os_string(),
            error: error.to_string(),
        });
    }
}

/// 复制新增或修改的条目
///
/// 每个条目独立处理：一个条目失败只记录日志并标记失败，继续处理其余条目。
/// 目录条目以合并方式复制整个子树。
pub fn reconcile<L: ActionLog + ?Sized>(
    source_dir: &Path,
    replica_dir: &Path,
    names: &[OsString],
    log: &L,
) -> TransferSummary {
    let mut summary = TransferSummary::default();

    for name in names {
        let source_path = source_dir.join(name);
        let replica_path = replica_dir.join(name);

        let result = if entry_kind(&source_path).is_dir() {
            log.record(&format!(
                "Copying folder from {} to {}",
                source_path.display(),
                replica_path.display()
            ));
            copy_tree(&source_path, &replica_path).map(|tree| (tree.files, tree.bytes))
        } else {
            log.record(&format!(
                "Copying file from {} to {}",
                source_path.display(),
                replica_path.display()
            ));
            copy_file(&source_path, &replica_path).map(|bytes| (1, bytes))
        };

        match result {
            Ok((files, bytes)) => {
                summary.succeeded += 1;
                summary.files += files;
                summary.bytes += bytes;
            }
            Err(e) => {
                log.record(&format!(
                    "Exception while copying modified file/folder {}: {}",
                    name.to_string_lossy(),
                    e
                ));
                summary.fail(name, &e);
            }
        }
    }

    summary
}
