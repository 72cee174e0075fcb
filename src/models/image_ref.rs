use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// 图片引用：文件路径或内存中的原始字节
///
/// TOML 中写字符串即为路径，写整数数组即为字节。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    FilePath(PathBuf),
    InMemoryBytes(Vec<u8>),
}

impl ImageRef {
    /// 文件路径（内存图片返回 None）
    pub fn path(&self) -> Option<&Path> {
        match self {
            ImageRef::FilePath(path) => Some(path.as_path()),
            ImageRef::InMemoryBytes(_) => None,
        }
    }

    /// 用于日志和错误信息的简短描述
    pub fn label(&self) -> String {
        match self {
            ImageRef::FilePath(path) => path.display().to_string(),
            ImageRef::InMemoryBytes(bytes) => format!("<内存图片 {} 字节>", bytes.len()),
        }
    }

    /// 相对路径基于 `base` 解析，绝对路径和内存图片保持不变
    pub fn resolved_against(self, base: &Path) -> Self {
        match self {
            ImageRef::FilePath(path) if path.is_relative() => ImageRef::FilePath(base.join(path)),
            other => other,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        ImageRef::FilePath(path)
    }
}

impl From<&Path> for ImageRef {
    fn from(path: &Path) -> Self {
        ImageRef::FilePath(path.to_path_buf())
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> Self {
        ImageRef::FilePath(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageRef {
    fn from(bytes: Vec<u8>) -> Self {
        ImageRef::InMemoryBytes(bytes)
    }
}
