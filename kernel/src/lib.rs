//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! Rux WRR 调度类
//!
//! 可嵌入内核调度框架的加权轮转 (Weighted Round Robin) 调度类，包含三个变体：
//! - basic: 单层优先级队列
//! - group: 按任务组分层调度
//! - rmlfq: 随机多级反馈队列，时间片用完时随机升降 stage
//!
//! 运行队列锁、时钟中断和任务生命周期由宿主负责，本 crate 只实现调度算法。
//! 日志通过 `log` 门面输出，由宿主安装 logger。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod collection;
pub mod config;
pub mod errno;
pub mod list;
pub mod sched;

#[cfg(test)]
mod tests;

pub use errno::Errno;
pub use sched::{CpuSched, WrrPolicy, WrrScheduler, WrrTunables};
