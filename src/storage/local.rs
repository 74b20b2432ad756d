use super::EntryKind;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 转换为绝对路径
///
/// 已存在的路径会被规范化（解析符号链接）；不存在的路径只做词法上的 `.`/`..` 处理。
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.exists() {
        return dunce::canonicalize(path);
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// 列出目录下一层的条目名称（有序）
pub fn list_names(dir: &Path) -> io::Result<BTreeSet<OsString>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        names.insert(entry?.file_name());
    }
    Ok(names)
}

/// 获取条目类型
pub fn entry_kind(path: &Path) -> EntryKind {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => EntryKind::Directory,
        Ok(_) => EntryKind::File,
        Err(_) => EntryKind::Missing,
    }
}

/// 复制单个文件，保留权限以及访问/修改时间
pub fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
    // 源和目标指向同一个文件时 fs::copy 会先截断目标
    if dest.exists() && dunce::canonicalize(source)? == dunce::canonicalize(dest)? {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} and {} are the same file", source.display(), dest.display()),
        ));
    }

    // fs::copy 会同时复制权限位
    let bytes = fs::copy(source, dest)?;

    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    match open_for_times(dest).and_then(|file| file.set_times(times)) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::Unsupported => {
            debug!("目标不支持设置文件时间: {}", dest.display());
        }
        Err(e) => return Err(e),
    }

    Ok(bytes)
}

#[cfg(not(windows))]
fn open_for_times(path: &Path) -> io::Result<File> {
    // 只读文件也允许文件所有者修改时间戳
    File::open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    fs::OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)
}

/// 目录树复制统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCopy {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
}

/// 递归复制目录树（合并语义）
///
/// 目标目录已存在时保留其中的内容，只覆盖同名文件。单个条目失败不会中断其余条目，
/// 所有条目处理完后返回第一个错误。目标根目录无法创建时立即返回。
pub fn copy_tree(source: &Path, dest: &Path) -> io::Result<TreeCopy> {
    let mut stats = TreeCopy::default();
    let mut failures: Vec<(PathBuf, io::Error)> = Vec::new();
    // 目录权限在内容写完后再设置，避免只读目录阻止子条目写入
    let mut dir_permissions = Vec::new();

    let walker = WalkDir::new(source)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                failures.push((path, e.into()));
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = if relative.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(relative)
        };

        if entry.file_type().is_dir() {
            match fs::create_dir_all(&target) {
                Ok(()) => {
                    stats.dirs += 1;
                    if let Ok(metadata) = entry.metadata() {
                        dir_permissions.push((target, metadata.permissions()));
                    }
                }
                Err(e) if entry.depth() == 0 => return Err(e),
                Err(e) => failures.push((entry.path().to_path_buf(), e)),
            }
        } else {
            match copy_file(entry.path(), &target) {
                Ok(bytes) => {
                    debug!("已复制 {} -> {}", entry.path().display(), target.display());
                    stats.files += 1;
                    stats.bytes += bytes;
                }
                Err(e) => failures.push((entry.path().to_path_buf(), e)),
            }
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        if let Err(e) = fs::set_permissions(&dir, permissions) {
            debug!("无法设置目录权限 {}: {}", dir.display(), e);
        }
    }

    match failures.len() {
        0 => Ok(stats),
        count => {
            let (path, first) = failures.swap_remove(0);
            Err(io::Error::new(
                first.kind(),
                format!(
                    "{} of the entries under {} could not be copied; first failure at {}: {}",
                    count,
                    source.display(),
                    path.display(),
                    first
                ),
            ))
        }
    }
}

/// 删除文件或整个目录
///
/// 指向目录的符号链接只删除链接本身。
pub fn remove_entry(path: &Path) -> io::Result<()> {
    if entry_kind(path).is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_absolutize_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let base = dunce::canonicalize(dir.path()).unwrap();
        let missing = base.join("a").join("..").join("b").join(".").join("c");

        assert_eq!(absolutize(&missing).unwrap(), base.join("b").join("c"));
    }

    #[test]
    fn test_absolutize_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x");
        fs::create_dir(&nested).unwrap();

        let resolved = absolutize(&nested.join("..").join("x")).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, dunce::canonicalize(&nested).unwrap());
    }

    #[test]
    fn test_list_names_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("b.txt"), "b");
        write(&dir.path().join("a.txt"), "a");
        fs::create_dir(dir.path().join("c")).unwrap();

        let names: Vec<_> = list_names(dir.path()).unwrap().into_iter().collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn test_copy_file_preserves_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        write(&src, "payload");

        let past = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(copy_file(&src, &dst).unwrap(), 7);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
        assert_eq!(
            fs::metadata(&dst).unwrap().modified().unwrap(),
            fs::metadata(&src).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn test_copy_tree_merges() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("keep.txt"), "new");
        write(&src.join("sub").join("deep.txt"), "deep");
        write(&dst.join("keep.txt"), "old");
        write(&dst.join("extra.txt"), "extra");

        let stats = copy_tree(&src, &dst).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.dirs, 2);
        assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("sub/deep.txt")).unwrap(), "deep");
        assert_eq!(fs::read_to_string(dst.join("extra.txt")).unwrap(), "extra");
    }

    #[test]
    fn test_copy_tree_onto_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("a.txt"), "a");
        write(&dst, "i am a file");

        assert!(copy_tree(&src, &dst).is_err());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "i am a file");
    }

    #[test]
    fn test_remove_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        let tree = dir.path().join("tree");
        write(&file, "f");
        write(&tree.join("inner").join("x.txt"), "x");

        remove_entry(&file).unwrap();
        remove_entry(&tree).unwrap();
        assert_eq!(entry_kind(&file), EntryKind::Missing);
        assert_eq!(entry_kind(&tree), EntryKind::Missing);

        let err = remove_entry(&dir.path().join("ghost")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
