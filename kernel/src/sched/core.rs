//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 执行单元调度入口
//!
//! 对应 Linux kernel/sched/core.c 中调用 sched_class 钩子的那一层：
//! enqueue_task / dequeue_task / schedule 中的 pick_next_task /
//! scheduler_tick / sched_fork / check_class_changed / rt_mutex_setprio 等。
//!
//! `CpuSched` 把一个执行单元的 `Rq` 和选定的调度类绑在一起，
//! 校验宿主传入的句柄和参数，再转交给调度类。
//! 所有方法都假定宿主已持有本执行单元的锁。

use alloc::boxed::Box;
use alloc::sync::Arc;

use log::{debug, warn};

use super::class::{DequeueFlags, EnqueueFlags, SchedClass, WrrPolicy, WrrTunables};
use super::classify::GroupClassifier;
use super::entity::{EntityId, GroupId, Pid, WrrEntity};
use super::rq::Rq;
use super::MAX_WRR_PRIO;
use crate::errno::Errno;

pub struct CpuSched {
    rq: Rq,
    class: Box<dyn SchedClass>,
}

impl CpuSched {
    /// 按策略创建执行单元
    pub fn new(
        cpu: usize,
        policy: WrrPolicy,
        tunables: &WrrTunables,
        classifier: Arc<dyn GroupClassifier>,
    ) -> Result<Self, Errno> {
        let class = policy.build(tunables, cpu);
        Self::with_class(cpu, class, tunables, classifier)
    }

    /// 使用指定的调度类实例创建执行单元
    pub fn with_class(
        cpu: usize,
        class: Box<dyn SchedClass>,
        tunables: &WrrTunables,
        classifier: Arc<dyn GroupClassifier>,
    ) -> Result<Self, Errno> {
        let rq = Rq::new(cpu, tunables.max_entities, tunables.timeslice, classifier)?;
        debug!("wrr: cpu {} using {} class", cpu, class.name());
        Ok(Self { rq, class })
    }

    #[inline]
    pub fn cpu(&self) -> usize {
        self.rq.cpu()
    }

    pub fn class_name(&self) -> &'static str {
        self.class.name()
    }

    pub fn rq(&self) -> &Rq {
        &self.rq
    }

    #[inline]
    pub fn nr_running(&self) -> usize {
        self.rq.nr_running()
    }

    #[inline]
    pub fn curr(&self) -> Option<EntityId> {
        self.rq.curr()
    }

    pub fn task(&self, pid: Pid) -> Option<EntityId> {
        self.rq.task(pid)
    }

    pub fn entity(&self, se: EntityId) -> Option<&WrrEntity> {
        self.rq.entity(se)
    }

    /// 更新任务时钟 (update_rq_clock)
    pub fn update_clock(&mut self, now: u64) {
        self.rq.set_clock_task(now);
    }

    #[inline]
    pub fn need_resched(&self) -> bool {
        self.rq.need_resched()
    }

    /// 读取并清除重新调度请求
    pub fn test_and_clear_need_resched(&mut self) -> bool {
        self.rq.test_and_clear_need_resched()
    }

    /// 检查所有运行队列的不变式
    pub fn check_invariants(&self) -> bool {
        self.rq.check_invariants()
    }

    // ------------------------------------------------------------------
    // 任务生命周期
    // ------------------------------------------------------------------

    /// 任务进入 WRR 调度类 (__setscheduler / sched_setscheduler)
    ///
    /// 新实体不在队列上，并已分配时间片
    pub fn admit_task(
        &mut self,
        pid: Pid,
        prio: usize,
        group: Option<GroupId>,
    ) -> Result<EntityId, Errno> {
        let nest = self.class.is_group_aware();
        let se = self.rq.admit_task(pid, prio, group, nest)?;
        self.class.refill(&mut self.rq, se);
        Ok(se)
    }

    /// 任务离开 WRR 调度类或退出
    pub fn release_task(&mut self, pid: Pid) -> Result<(), Errno> {
        if let Some(se) = self.rq.task(pid) {
            if self.rq.curr() == Some(se) {
                self.class.put_prev_task(&mut self.rq, se);
            }
        }
        self.rq.release_task(pid)
    }

    /// sched_fork：子任务以父任务的优先级和任务组进入 WRR 调度类
    pub fn fork(&mut self, parent: Pid, child: Pid) -> Result<EntityId, Errno> {
        let parent_se = self.rq.task(parent).ok_or(Errno::NoSuchProcess)?;
        let (prio, group) = {
            let entity = self.rq.task_entity(parent_se)?;
            (entity.prio(), entity.task_group())
        };
        let child_se = self.rq.admit_task(child, prio, group, self.class.is_group_aware())?;
        self.class.task_fork(&mut self.rq, parent_se, child_se);
        Ok(child_se)
    }

    /// task_fork 钩子
    pub fn on_fork(&mut self, parent: EntityId, child: EntityId) -> Result<(), Errno> {
        self.rq.task_entity(parent)?;
        self.rq.task_entity(child)?;
        self.class.task_fork(&mut self.rq, parent, child);
        Ok(())
    }

    // ------------------------------------------------------------------
    // 调度钩子
    // ------------------------------------------------------------------

    /// enqueue_task
    pub fn enqueue(&mut self, se: EntityId, flags: EnqueueFlags) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        self.class.enqueue_task(&mut self.rq, se, flags);
        Ok(())
    }

    /// dequeue_task
    pub fn dequeue(&mut self, se: EntityId, flags: DequeueFlags) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        self.class.dequeue_task(&mut self.rq, se, flags);
        Ok(())
    }

    /// yield_task
    pub fn yield_current(&mut self) {
        self.class.yield_task(&mut self.rq);
    }

    /// check_preempt_curr
    pub fn check_preempt(&mut self, se: EntityId) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        self.class.check_preempt_curr(&mut self.rq, se);
        Ok(())
    }

    /// pick_next_task：返回的任务成为当前任务，仍留在队列上
    pub fn pick_next(&mut self) -> Option<EntityId> {
        let next = self.class.pick_next_task(&mut self.rq);
        self.rq.set_curr(next);
        next
    }

    /// put_prev_task
    pub fn put_prev(&mut self, se: EntityId) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        if self.rq.curr() != Some(se) {
            warn!("wrr: put_prev of non-current entity {:?}", se);
        }
        self.class.put_prev_task(&mut self.rq, se);
        if self.rq.curr() == Some(se) {
            self.rq.set_curr(None);
        }
        Ok(())
    }

    /// set_curr_task：任务不经 pick_next 成为当前任务
    pub fn set_curr(&mut self, se: EntityId) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        self.rq.set_curr(Some(se));
        self.class.set_curr_task(&mut self.rq);
        Ok(())
    }

    /// task_tick
    pub fn on_tick(&mut self, se: EntityId) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        self.class.task_tick(&mut self.rq, se);
        Ok(())
    }

    /// get_rr_interval：任务不存在时返回 EINVAL
    pub fn get_interval(&self, se: Option<EntityId>) -> Result<u32, Errno> {
        let se = se.ok_or(Errno::InvalidArgument)?;
        self.rq.task_entity(se)?;
        Ok(self.class.get_rr_interval(&self.rq, se))
    }

    /// switched_to
    pub fn on_switch_to(&mut self, se: EntityId) -> Result<(), Errno> {
        self.rq.task_entity(se)?;
        self.class.switched_to(&mut self.rq, se);
        Ok(())
    }

    /// 修改任务优先级，然后调用 prio_changed
    pub fn set_prio(&mut self, se: EntityId, prio: usize) -> Result<(), Errno> {
        if prio >= MAX_WRR_PRIO {
            return Err(Errno::InvalidArgument);
        }
        let old_prio = self.rq.task_entity(se)?.prio();
        if old_prio == prio {
            return Ok(());
        }
        if self.rq.curr() == Some(se) {
            self.rq.update_curr();
        }
        self.rq.change_prio(se, prio);
        self.class.prio_changed(&mut self.rq, se, old_prio);
        Ok(())
    }

    // ------------------------------------------------------------------
    // 任务组
    // ------------------------------------------------------------------

    pub fn alloc_group(&mut self, group: GroupId, parent: Option<GroupId>) -> Result<(), Errno> {
        self.rq.alloc_group(group, parent)
    }

    pub fn free_group(&mut self, group: GroupId) -> Result<(), Errno> {
        self.rq.free_group(group)
    }

    pub fn can_alloc_group(&self) -> bool {
        self.rq.can_alloc_group()
    }
}
