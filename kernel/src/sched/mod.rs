//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! WRR 调度类
//!
//! 遵循 Linux 内核 rt 调度类的设计 (kernel/sched/rt.c)
//!
//! 架构：
//! - 调度类 (sched_class): `SchedClass` trait，三个变体 basic / group / rmlfq
//! - 运行队列 (rq): 每个执行单元一个 `Rq`，内含根 `WrrRq`
//! - 调度实体 (sched_wrr_entity): `WrrEntity`，任务或任务组的代表
//! - 入口: `CpuSched` 提供宿主调用的钩子，`WrrScheduler` 管理所有执行单元
//!
//! 优先级约定：三个变体一致，数值越小越紧急，范围 0..MAX_WRR_PRIO

/// WRR 优先级个数 (MAX_WRR_PRIO)
pub const MAX_WRR_PRIO: usize = 100;

pub mod bitmap;
pub mod class;
pub mod classify;
pub mod core;
pub mod entity;
pub mod group;
pub mod percpu;
pub mod prio_array;
pub mod rq;
pub mod timeslice;
pub mod wrr_basic;
pub mod wrr_group;
pub mod wrr_rmlfq;
pub mod wrr_rq;

pub use self::class::{DequeueFlags, EnqueueFlags, SchedClass, WrrPolicy, WrrTunables};
pub use self::classify::{AllForeground, GroupClassifier, PathBuf, PathClassifier};
pub use self::core::CpuSched;
pub use self::entity::{Classification, EntityId, ExecStats, GroupId, Owner, Pid, RqId, WrrEntity};
pub use self::percpu::WrrScheduler;
pub use self::rq::Rq;
pub use self::timeslice::Timeslice;
pub use self::wrr_rmlfq::{RandStage, StageMove, StageRng};
