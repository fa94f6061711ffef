//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 前台 / 后台分类
//!
//! 调度器本身不知道任务组的含义，分类由宿主提供。
//! 对应 Android 上的 cgroup 约定：后台任务组挂在 /bg_non_interactive 下，
//! 因此路径第二个字节为 'b' 的任务组视为后台。
//!
//! 路径写入调用者栈上的 `PathBuf`，不使用全局缓冲区，可重入。

use core::fmt;

use super::entity::GroupId;

/// 路径缓冲区长度
pub const PATH_BUF_LEN: usize = 64;

/// 分类器
pub trait GroupClassifier: Send + Sync {
    /// 任务组是否属于后台，None 表示根任务组
    fn is_background(&self, group: Option<GroupId>) -> bool;
}

/// 所有任务都视为前台
#[derive(Debug, Clone, Copy, Default)]
pub struct AllForeground;

impl GroupClassifier for AllForeground {
    fn is_background(&self, _group: Option<GroupId>) -> bool {
        false
    }
}

/// 固定长度的路径缓冲区
///
/// 超出长度的部分被截断，分类只看前几个字节
pub struct PathBuf {
    bytes: [u8; PATH_BUF_LEN],
    len: usize,
}

impl Default for PathBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl PathBuf {
    pub const fn new() -> Self {
        Self {
            bytes: [0; PATH_BUF_LEN],
            len: 0,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl fmt::Write for PathBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = PATH_BUF_LEN - self.len;
        let n = s.len().min(room);
        self.bytes[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

/// 路径是否指向后台任务组
#[inline]
pub fn is_background_path(path: &[u8]) -> bool {
    path.get(1) == Some(&b'b')
}

/// 按任务组路径分类
///
/// `path_of` 由宿主提供，把任务组路径写入缓冲区（对应 task_group_path）
pub struct PathClassifier<F> {
    path_of: F,
}

impl<F> PathClassifier<F>
where
    F: Fn(GroupId, &mut PathBuf) + Send + Sync,
{
    pub fn new(path_of: F) -> Self {
        Self { path_of }
    }
}

impl<F> GroupClassifier for PathClassifier<F>
where
    F: Fn(GroupId, &mut PathBuf) + Send + Sync,
{
    fn is_background(&self, group: Option<GroupId>) -> bool {
        let Some(group) = group else {
            return false;
        };
        let mut buf = PathBuf::new();
        (self.path_of)(group, &mut buf);
        is_background_path(buf.as_bytes())
    }
}
