//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 场景测试
//!
//! 按调度钩子的调用顺序驱动 `CpuSched` / `WrrScheduler`，检查队列状态。
//! 各模块内部的单元测试放在对应源文件的 `tests` 子模块里。
//!
//! 运行测试：
//! ```bash
//! cargo test --package rux-wrr
//! ```

mod basic;
mod percpu;

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::sched::class::{EnqueueFlags, WrrPolicy, WrrTunables};
use crate::sched::classify::{AllForeground, GroupClassifier, PathBuf, PathClassifier};
use crate::sched::core::CpuSched;
use crate::sched::entity::{EntityId, GroupId, Pid, RqId};
use crate::sched::timeslice::Timeslice;
use crate::sched::wrr_rmlfq::{StageRng, WrrRmlfq};
use crate::sched::MAX_WRR_PRIO;

/// 路径为 /bg_non_interactive 的后台任务组
pub(crate) const BG_GROUP: GroupId = 100;

/// 路径为 /apps 的前台任务组
pub(crate) const FG_GROUP: GroupId = 200;

pub(crate) fn tunables() -> WrrTunables {
    WrrTunables {
        timeslice: Timeslice::new(10, 1),
        max_entities: 64,
        draw_range: 1000,
        seed: 1,
    }
}

pub(crate) fn android_classifier() -> Arc<dyn GroupClassifier> {
    Arc::new(PathClassifier::new(|group: GroupId, buf: &mut PathBuf| {
        let _ = match group {
            BG_GROUP => write!(buf, "/bg_non_interactive"),
            FG_GROUP => write!(buf, "/apps"),
            other => write!(buf, "/g{}", other),
        };
    }))
}

pub(crate) fn cpu_sched(policy: WrrPolicy) -> CpuSched {
    CpuSched::new(0, policy, &tunables(), Arc::new(AllForeground)).unwrap()
}

/// RMLFQ 执行单元，随机数按给定顺序取出
pub(crate) fn rmlfq_sched(draws: &[u64]) -> CpuSched {
    let class = WrrRmlfq::new(Box::new(ScriptedStage::new(draws)), 1000);
    CpuSched::with_class(0, Box::new(class), &tunables(), android_classifier()).unwrap()
}

/// 预先写好的随机数序列，用完后返回 range / 2
pub(crate) struct ScriptedStage {
    draws: VecDeque<u64>,
}

impl ScriptedStage {
    pub(crate) fn new(draws: &[u64]) -> Self {
        Self {
            draws: draws.iter().copied().collect(),
        }
    }
}

impl StageRng for ScriptedStage {
    fn draw(&mut self, range: u64) -> u64 {
        self.draws.pop_front().unwrap_or(range / 2)
    }
}

/// 准入并入队到队尾
pub(crate) fn admit_queued(
    sched: &mut CpuSched,
    pid: Pid,
    prio: usize,
    group: Option<GroupId>,
) -> EntityId {
    let se = sched.admit_task(pid, prio, group).unwrap();
    sched.enqueue(se, EnqueueFlags::empty()).unwrap();
    se
}

/// 运行队列各优先级链表的内容
pub(crate) fn queue_snapshot(sched: &CpuSched, rq: RqId) -> Vec<(usize, Vec<EntityId>)> {
    let rq_ref = sched.rq();
    let wrr_rq = rq_ref.wrr_rq(rq).unwrap();
    (0..MAX_WRR_PRIO)
        .filter(|&p| wrr_rq.prio_array().len(p) > 0)
        .map(|p| (p, wrr_rq.prio_array().iter(&rq_ref.entities, p).collect()))
        .collect()
}

/// 让当前任务的时间片刚好用完
pub(crate) fn expire(sched: &mut CpuSched, se: EntityId) {
    let slice = sched.entity(se).unwrap().time_slice();
    for _ in 0..slice {
        sched.on_tick(se).unwrap();
    }
}
