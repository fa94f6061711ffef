//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 标准错误代码定义
//!
//! 和 include/uapi/asm-generic/errno-base.h 保持一致的编号，
//! WRR 调度类只用到其中一小部分

use core::fmt;

/// 标准错误代码
///
/// 使用方法：
/// ```rust
/// use rux_wrr::errno::Errno;
///
/// fn lookup(found: bool) -> Result<(), Errno> {
///     if !found {
///         return Err(Errno::InvalidArgument);
///     }
///     Ok(())
/// }
///
/// // 系统调用风格，返回负数
/// assert_eq!(lookup(false).unwrap_err().as_neg_i32(), -22);
/// ```
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Errno {
    /// No such file or directory (ENOENT, 2)
    ///
    /// 调度类中用于：任务组不存在
    NoSuchFileOrDirectory = 2,

    /// No such process (ESRCH, 3)
    NoSuchProcess = 3,

    /// Out of memory (ENOMEM, 12)
    ///
    /// 调度实体 / 运行队列槽位耗尽
    OutOfMemory = 12,

    /// Device or resource busy (EBUSY, 16)
    ///
    /// 释放仍有成员的任务组
    DeviceOrResourceBusy = 16,

    /// File exists (EEXIST, 17)
    ///
    /// PID 或任务组 ID 重复注册
    FileExists = 17,

    /// Invalid argument (EINVAL, 22)
    InvalidArgument = 22,
}

impl Errno {
    /// 获取错误代码的正数值（用于比较）
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// 获取错误代码的负数值（用于系统调用返回）
    #[inline]
    pub const fn as_neg_i32(self) -> i32 {
        -(self as i32)
    }

    /// 错误名称（ENOENT 风格）
    pub const fn name(self) -> &'static str {
        match self {
            Errno::NoSuchFileOrDirectory => "ENOENT",
            Errno::NoSuchProcess => "ESRCH",
            Errno::OutOfMemory => "ENOMEM",
            Errno::DeviceOrResourceBusy => "EBUSY",
            Errno::FileExists => "EEXIST",
            Errno::InvalidArgument => "EINVAL",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i32())
    }
}
