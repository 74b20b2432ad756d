use crate::storage::{entry_kind, list_names, EntryKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

/// 内容比较时的读取块大小
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// 文件相等判定策略
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComparePolicy {
    /// 大小和修改时间都相同即视为相同；大小相同但时间不同时再比较内容
    #[default]
    Shallow,
    /// 大小相同时总是比较内容
    Deep,
}

/// 比较配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompareConfig {
    #[serde(default)]
    pub policy: ComparePolicy,
}

/// 文件比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRelation {
    /// 文件相同
    Equal,
    /// 大小不同
    SizeDiffers,
    /// 大小相同，内容不同
    ContentDiffers,
}

impl FileRelation {
    pub fn is_equal(self) -> bool {
        self == FileRelation::Equal
    }
}

/// 单层目录的比较结果
///
/// `source_only`、`replica_only`、`modified` 按所在侧划分全部条目名；
/// `common_subdirs` 是两侧都为目录的条目，与 `modified` 不相交。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub source_only: BTreeSet<OsString>,
    pub replica_only: BTreeSet<OsString>,
    pub modified: BTreeSet<OsString>,
    pub common_subdirs: BTreeSet<OsString>,
}

impl Classification {
    /// 需要从源复制到副本的条目：新增条目在前，修改条目在后
    pub fn to_copy(&self) -> Vec<OsString> {
        self.source_only
            .iter()
            .chain(self.modified.iter())
            .cloned()
            .collect()
    }

    /// 需要从副本删除的条目
    pub fn to_delete(&self) -> Vec<OsString> {
        self.replica_only.iter().cloned().collect()
    }
}

/// 文件比较器
#[derive(Debug, Clone, Default)]
pub struct FileComparator {
    config: CompareConfig,
}

impl FileComparator {
    pub fn new(policy: ComparePolicy) -> Self {
        Self {
            config: CompareConfig { policy },
        }
    }

    pub fn with_config(config: CompareConfig) -> Self {
        Self { config }
    }

    /// 比较两个文件
    pub fn compare_files(&self, source: &Path, replica: &Path) -> io::Result<FileRelation> {
        let src_meta = fs::metadata(source)?;
        let dst_meta = fs::metadata(replica)?;

        // 大小不同，肯定不同
        if src_meta.len() != dst_meta.len() {
            return Ok(FileRelation::SizeDiffers);
        }

        if self.config.policy == ComparePolicy::Shallow
            && src_meta.modified()? == dst_meta.modified()?
        {
            return Ok(FileRelation::Equal);
        }

        if content_hash(source)? == content_hash(replica)? {
            Ok(FileRelation::Equal)
        } else {
            Ok(FileRelation::ContentDiffers)
        }
    }

    /// 比较一层目录（不递归）
    ///
    /// 一侧是文件、另一侧是目录的条目归入 `modified`，不做特殊处理；
    /// 之后的复制会把它当作普通的单条目失败。
    pub fn compare_level(&self, source_dir: &Path, replica_dir: &Path) -> io::Result<Classification> {
        let source_names = list_names(source_dir)?;
        let replica_names = list_names(replica_dir)?;
        let mut result = Classification::default();

        for name in &source_names {
            if !replica_names.contains(name) {
                result.source_only.insert(name.clone());
                continue;
            }

            let src_path = source_dir.join(name);
            let dst_path = replica_dir.join(name);

            match (entry_kind(&src_path), entry_kind(&dst_path)) {
                (EntryKind::Directory, EntryKind::Directory) => {
                    result.common_subdirs.insert(name.clone());
                }
                (EntryKind::File, EntryKind::File) => {
                    match self.compare_files(&src_path, &dst_path) {
                        Ok(FileRelation::Equal) => {}
                        Ok(relation) => {
                            tracing::debug!("文件不同: {} ({:?})", src_path.display(), relation);
                            result.modified.insert(name.clone());
                        }
                        Err(e) => {
                            tracing::debug!("无法比较 {}: {}", src_path.display(), e);
                            result.modified.insert(name.clone());
                        }
                    }
                }
                (src_kind, dst_kind) => {
                    tracing::debug!(
                        "条目类型不一致: {} ({:?} / {:?})",
                        src_path.display(),
                        src_kind,
                        dst_kind
                    );
                    result.modified.insert(name.clone());
                }
            }
        }

        result.replica_only = replica_names.difference(&source_names).cloned().collect();

        Ok(result)
    }
}

/// 计算文件内容的 BLAKE3 哈希（分块读取）
pub fn content_hash(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize())
}
