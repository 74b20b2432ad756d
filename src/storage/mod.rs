//! 本地文件系统访问

pub mod local;

pub use local::{
    absolutize, copy_file, copy_tree, entry_kind, list_names, remove_entry, TreeCopy,
};

/// 条目类型（跟随符号链接）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// 不存在，或是悬空的符号链接
    Missing,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }

    pub fn exists(self) -> bool {
        self != EntryKind::Missing
    }
}
