//! 条目删除 - 删除只存在于副本中的条目

use super::transfer::TransferSummary;
use crate::logging::ActionLog;
use crate::storage::{entry_kind, remove_entry};
use std::ffi::OsString;
use std::path::Path;

/// 删除 `root_dir` 下的指定条目（文件或整个子树）
///
/// 与复制相同，每个条目独立处理，失败只影响返回值。
pub fn purge<L: ActionLog + ?Sized>(root_dir: &Path, names: &[OsString], log: &L) -> TransferSummary {
    let mut summary = TransferSummary::default();

    for name in names {
        let path = root_dir.join(name);

        if entry_kind(&path).is_dir() {
            log.record(&format!("Deleting folder {}", path.display()));
        } else {
            log.record(&format!("Deleting file {}", path.display()));
        }

        match remove_entry(&path) {
            Ok(()) => {
                summary.succeeded += 1;
            }
            Err(e) => {
                log.record(&format!(
                    "Exception during file/folder deletion {}: {}",
                    name.to_string_lossy(),
                    e
                ));
                summary.fail(name, &e);
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use std::fs;

    #[test]
    fn test_deletes_files_and_trees() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("old.txt"), "old").unwrap();
        fs::create_dir_all(root.join("tree").join("nested")).unwrap();
        fs::write(root.join("tree").join("nested").join("x"), "x").unwrap();
        fs::write(root.join("survivor.txt"), "keep").unwrap();

        let log = MemoryLog::new();
        let names = vec![OsString::from("old.txt"), OsString::from("tree")];
        let summary = purge(root, &names, &log);

        assert!(summary.all_succeeded());
        assert_eq!(summary.succeeded, 2);
        assert!(!root.join("old.txt").exists());
        assert!(!root.join("tree").exists());
        assert!(root.join("survivor.txt").exists());
        assert_eq!(
            log.messages(),
            vec![
                format!("Deleting file {}", root.join("old.txt").display()),
                format!("Deleting folder {}", root.join("tree").display()),
            ]
        );
    }

    #[test]
    fn test_missing_entry_fails_but_continues() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("b"), "b").unwrap();

        let log = MemoryLog::new();
        let names = vec![OsString::from("a"), OsString::from("b")];
        let summary = purge(root, &names, &log);

        assert!(!summary.all_succeeded());
        assert_eq!(summary.failed[0].name, OsString::from("a"));
        assert_eq!(summary.succeeded, 1);
        assert!(!root.join("b").exists());
        assert_eq!(
            log.messages_starting_with("Exception during file/folder deletion a: ")
                .len(),
            1
        );
    }
}
