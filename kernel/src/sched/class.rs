//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! WRR 调度类
//!
//! 对应 Linux 的 struct sched_class (kernel/sched/sched.h)。
//! Linux 用一张函数指针表描述调度类，这里用 trait 表示，三个变体
//! （基本 WRR、组调度 WRR、RMLFQ）各实现一份，在创建执行单元时选定。
//!
//! 默认方法实现的是基本 WRR 的行为，变体只覆盖不同的部分。

use alloc::boxed::Box;

use bitflags::bitflags;
use log::trace;

use super::entity::EntityId;
use super::rq::Rq;
use super::timeslice::Timeslice;
use super::wrr_basic::WrrBasic;
use super::wrr_group::WrrGroup;
use super::wrr_rmlfq::{RandStage, WrrRmlfq};
use crate::config::{
    WRR_BACK_TIMESLICE, WRR_DEFAULT_POLICY, WRR_FORE_TIMESLICE, WRR_MAX_ENTITIES,
    WRR_RMLFQ_DRAW_RANGE, WRR_RMLFQ_SEED,
};

bitflags! {
    /// ENQUEUE_* (kernel/sched/sched.h)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EnqueueFlags: u32 {
        const WAKEUP  = 0x01;
        const RESTORE = 0x02;
        const HEAD    = 0x10;
    }
}

bitflags! {
    /// DEQUEUE_* (kernel/sched/sched.h)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DequeueFlags: u32 {
        const SLEEP = 0x01;
        const SAVE  = 0x02;
    }
}

/// 调度类
///
/// 所有方法都在宿主持有执行单元锁时调用
pub trait SchedClass: Send {
    fn name(&self) -> &'static str;

    /// 任务是否挂到所属任务组的子运行队列上
    fn is_group_aware(&self) -> bool {
        false
    }

    /// 分配时间片，同时刷新实体上记录的分类
    fn refill(&mut self, rq: &mut Rq, se: EntityId) {
        let class = rq.classify(se);
        let slice = rq.timeslice.for_class(class);
        if let Some(entity) = rq.entity_mut(se) {
            entity.time_slice = slice;
        }
        trace!("wrr: refill {:?} {:?} -> {}", se, class, slice);
    }

    /// enqueue_task
    fn enqueue_task(&mut self, rq: &mut Rq, se: EntityId, flags: EnqueueFlags) {
        rq.enqueue_task_entity(se, flags.contains(EnqueueFlags::HEAD));
    }

    /// dequeue_task
    fn dequeue_task(&mut self, rq: &mut Rq, se: EntityId, _flags: DequeueFlags) {
        rq.update_curr();
        rq.dequeue_task_entity(se);
    }

    /// yield_task：当前任务移到本级队列尾部，不改变优先级
    fn yield_task(&mut self, rq: &mut Rq) {
        if let Some(curr) = rq.curr() {
            rq.requeue_entity(curr, false);
        }
    }

    /// check_preempt_curr：被唤醒的任务比当前任务更紧急时请求重新调度
    fn check_preempt_curr(&mut self, rq: &mut Rq, se: EntityId) {
        let Some(curr) = rq.curr() else {
            return;
        };
        if curr != se && rq.se_prio(se) < rq.se_prio(curr) {
            rq.resched_curr();
        }
    }

    /// pick_next_task
    fn pick_next_task(&mut self, rq: &mut Rq) -> Option<EntityId> {
        if rq.nr_running() == 0 {
            return None;
        }
        let se = rq.pick_next_entity()?;
        rq.start_exec(se);
        Some(se)
    }

    /// put_prev_task
    fn put_prev_task(&mut self, rq: &mut Rq, _se: EntityId) {
        rq.update_curr();
    }

    /// set_curr_task
    fn set_curr_task(&mut self, rq: &mut Rq) {
        if let Some(curr) = rq.curr() {
            rq.start_exec(curr);
        }
    }

    /// task_tick
    ///
    /// 时间片减到 0 时重新分配；链上某一层还有同级实体时移到队尾并请求重新调度，
    /// 独占队列时只补充时间片
    fn task_tick(&mut self, rq: &mut Rq, se: EntityId) {
        rq.update_curr();

        let Some(entity) = rq.entity_mut(se) else {
            return;
        };
        entity.time_slice = entity.time_slice.saturating_sub(1);
        if entity.time_slice > 0 {
            return;
        }

        self.refill(rq, se);
        if rq.chain_has_peer(se) {
            rq.requeue_entity(se, false);
            rq.resched_curr();
        }
    }

    /// get_rr_interval：不修改任何状态
    fn get_rr_interval(&self, rq: &Rq, se: EntityId) -> u32 {
        rq.timeslice.for_class(rq.classification_of(se))
    }

    /// task_fork：子任务从新的时间片开始
    fn task_fork(&mut self, rq: &mut Rq, _parent: EntityId, child: EntityId) {
        self.refill(rq, child);
    }

    /// switched_to
    fn switched_to(&mut self, rq: &mut Rq, se: EntityId) {
        let queued = rq.entity(se).is_some_and(|e| e.on_rq());
        if !queued {
            return;
        }
        match rq.curr() {
            Some(curr) if curr == se => {}
            Some(curr) => {
                if rq.se_prio(se) < rq.se_prio(curr) {
                    rq.resched_curr();
                }
            }
            None => rq.resched_curr(),
        }
    }

    /// prio_changed
    ///
    /// 当前任务变得不那么紧急时让出 CPU；其他任务变得比当前任务更紧急时抢占
    fn prio_changed(&mut self, rq: &mut Rq, se: EntityId, old_prio: usize) {
        let queued = rq.entity(se).is_some_and(|e| e.on_rq());
        if !queued {
            return;
        }
        let prio = rq.se_prio(se);
        match rq.curr() {
            Some(curr) if curr == se => {
                if prio > old_prio {
                    rq.resched_curr();
                }
            }
            Some(curr) => {
                if prio < rq.se_prio(curr) {
                    rq.resched_curr();
                }
            }
            None => {}
        }
    }
}

/// 运行时可调参数，默认值来自 Kernel.toml
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrrTunables {
    pub timeslice: Timeslice,
    /// 每个执行单元的调度实体上限
    pub max_entities: usize,
    /// RMLFQ 随机数范围 [0, draw_range)
    pub draw_range: u64,
    /// RMLFQ 随机数种子
    pub seed: u64,
}

impl Default for WrrTunables {
    fn default() -> Self {
        Self {
            timeslice: Timeslice::new(WRR_FORE_TIMESLICE, WRR_BACK_TIMESLICE),
            max_entities: WRR_MAX_ENTITIES,
            draw_range: WRR_RMLFQ_DRAW_RANGE,
            seed: WRR_RMLFQ_SEED,
        }
    }
}

/// 调度策略变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrrPolicy {
    /// 单层优先级队列
    Basic,
    /// 组调度
    Group,
    /// 随机多级反馈队列
    Rmlfq,
}

impl Default for WrrPolicy {
    fn default() -> Self {
        Self::from_name(WRR_DEFAULT_POLICY).unwrap_or(Self::Group)
    }
}

impl WrrPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Self::Basic),
            "group" => Some(Self::Group),
            "rmlfq" => Some(Self::Rmlfq),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Group => "group",
            Self::Rmlfq => "rmlfq",
        }
    }

    /// 为指定执行单元创建调度类实例
    ///
    /// RMLFQ 的随机数种子按执行单元编号区分
    pub fn build(self, tunables: &WrrTunables, cpu: usize) -> Box<dyn SchedClass> {
        match self {
            Self::Basic => Box::new(WrrBasic::new()),
            Self::Group => Box::new(WrrGroup::new()),
            Self::Rmlfq => Box::new(WrrRmlfq::new(
                Box::new(RandStage::seeded(tunables.seed ^ cpu as u64)),
                tunables.draw_range,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_round_trip() {
        for policy in [WrrPolicy::Basic, WrrPolicy::Group, WrrPolicy::Rmlfq] {
            assert_eq!(WrrPolicy::from_name(policy.name()), Some(policy));
        }
        assert_eq!(WrrPolicy::from_name("cfs"), None);
    }

    #[test]
    fn default_policy_comes_from_config() {
        assert_eq!(WrrPolicy::default().name(), WRR_DEFAULT_POLICY);
    }

    #[test]
    fn build_selects_variant() {
        let tunables = WrrTunables::default();
        assert_eq!(WrrPolicy::Basic.build(&tunables, 0).name(), "wrr");
        assert_eq!(WrrPolicy::Group.build(&tunables, 0).name(), "wrr_group");
        assert_eq!(WrrPolicy::Rmlfq.build(&tunables, 1).name(), "wrr_rmlfq");
        assert!(WrrPolicy::Group.build(&tunables, 0).is_group_aware());
        assert!(!WrrPolicy::Rmlfq.build(&tunables, 0).is_group_aware());
    }

    #[test]
    fn enqueue_flags_compose() {
        let flags = EnqueueFlags::WAKEUP | EnqueueFlags::HEAD;
        assert!(flags.contains(EnqueueFlags::HEAD));
        assert!(!flags.contains(EnqueueFlags::RESTORE));
    }
}
