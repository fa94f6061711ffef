//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 执行单元运行队列
//!
//! 对应 Linux 的 struct rq (kernel/sched/sched.h) 中和 WRR 相关的部分：
//! - `wrr`: 根 WRR 运行队列
//! - `leaf_wrr_rq_list`: 当前非空的 WRR 运行队列
//! - `clock_task` / `curr` / need_resched
//!
//! 调度实体和运行队列都放在本执行单元私有的 `Slab` 中。
//! 热路径（入队、出队、tick、选择下一个任务）只操作 Slab 和链表，不分配内存。
//!
//! 调用约定：宿主持有本执行单元的锁，同一时刻只有一个钩子在执行。

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use log::{debug, trace, warn};

use super::classify::GroupClassifier;
use super::entity::{Classification, EntityId, GroupId, Pid, RqId, WrrEntity};
use super::timeslice::Timeslice;
use super::wrr_rq::WrrRq;
use super::MAX_WRR_PRIO;
use crate::collection::Slab;
use crate::errno::Errno;
use crate::list::{Iter, ListHead};

/// 任务组在本执行单元上的调度资源 (tg->wrr_se[cpu] / tg->wrr_rq[cpu])
#[derive(Debug, Clone, Copy)]
pub struct GroupSched {
    /// 组实体
    pub se: EntityId,
    /// 组拥有的子运行队列
    pub rq: RqId,
    /// 父任务组
    pub parent: Option<GroupId>,
    /// 属于本组的任务数
    pub(crate) members: usize,
    /// 子任务组数
    pub(crate) children: usize,
}

pub struct Rq {
    cpu: usize,

    pub(crate) entities: Slab<EntityId, WrrEntity>,
    pub(crate) wrr_rqs: Slab<RqId, WrrRq>,

    /// 根运行队列 (rq->wrr)
    root: RqId,

    /// pid -> 调度实体
    tasks: BTreeMap<Pid, EntityId>,

    pub(crate) groups: BTreeMap<GroupId, GroupSched>,

    /// 非空的 WRR 运行队列
    leaf_wrr_rq_list: ListHead<RqId>,

    /// 任务时钟 (rq->clock_task)
    clock_task: u64,

    /// 当前运行的任务
    curr: Option<EntityId>,

    /// 本执行单元上在队的 WRR 任务数
    nr_running: usize,

    need_resched: bool,

    pub(crate) timeslice: Timeslice,

    classifier: Arc<dyn GroupClassifier>,
}

impl Rq {
    /// 创建执行单元运行队列，`max_entities` 为实体和组运行队列的上限
    pub fn new(
        cpu: usize,
        max_entities: usize,
        timeslice: Timeslice,
        classifier: Arc<dyn GroupClassifier>,
    ) -> Result<Self, Errno> {
        if max_entities == 0 {
            return Err(Errno::InvalidArgument);
        }

        // 根运行队列额外占一个槽位
        let mut wrr_rqs = Slab::with_limit(max_entities + 1);
        let root = wrr_rqs.insert(WrrRq::new())?;

        Ok(Self {
            cpu,
            entities: Slab::with_limit(max_entities),
            wrr_rqs,
            root,
            tasks: BTreeMap::new(),
            groups: BTreeMap::new(),
            leaf_wrr_rq_list: ListHead::new(),
            clock_task: 0,
            curr: None,
            nr_running: 0,
            need_resched: false,
            timeslice,
            classifier,
        })
    }

    #[inline]
    pub fn cpu(&self) -> usize {
        self.cpu
    }

    #[inline]
    pub fn root(&self) -> RqId {
        self.root
    }

    #[inline]
    pub fn clock_task(&self) -> u64 {
        self.clock_task
    }

    pub(crate) fn set_clock_task(&mut self, now: u64) {
        self.clock_task = now;
    }

    #[inline]
    pub fn curr(&self) -> Option<EntityId> {
        self.curr
    }

    pub(crate) fn set_curr(&mut self, curr: Option<EntityId>) {
        self.curr = curr;
    }

    #[inline]
    pub fn nr_running(&self) -> usize {
        self.nr_running
    }

    #[inline]
    pub fn need_resched(&self) -> bool {
        self.need_resched
    }

    /// resched_curr
    pub(crate) fn resched_curr(&mut self) {
        trace!("wrr: cpu {} resched", self.cpu);
        self.need_resched = true;
    }

    pub(crate) fn test_and_clear_need_resched(&mut self) -> bool {
        core::mem::replace(&mut self.need_resched, false)
    }

    pub fn entity(&self, se: EntityId) -> Option<&WrrEntity> {
        self.entities.get(se)
    }

    pub(crate) fn entity_mut(&mut self, se: EntityId) -> Option<&mut WrrEntity> {
        self.entities.get_mut(se)
    }

    pub fn wrr_rq(&self, id: RqId) -> Option<&WrrRq> {
        self.wrr_rqs.get(id)
    }

    pub fn root_wrr_rq(&self) -> &WrrRq {
        &self.wrr_rqs[self.root]
    }

    pub fn task(&self, pid: Pid) -> Option<EntityId> {
        self.tasks.get(&pid).copied()
    }

    pub fn group(&self, group: GroupId) -> Option<&GroupSched> {
        self.groups.get(&group)
    }

    /// 非空 WRR 运行队列链表
    pub fn leaf_wrr_rqs(&self) -> Iter<'_, RqId, Slab<RqId, WrrRq>> {
        self.leaf_wrr_rq_list.iter(&self.wrr_rqs)
    }

    /// 句柄是否指向一个任务实体
    pub(crate) fn task_entity(&self, se: EntityId) -> Result<&WrrEntity, Errno> {
        match self.entities.get(se) {
            Some(entity) if entity.is_task() => Ok(entity),
            _ => Err(Errno::InvalidArgument),
        }
    }

    /// 实体当前的有效优先级
    ///
    /// 任务实体取自身优先级，组实体取子运行队列的 highest_prio
    pub(crate) fn se_prio(&self, se: EntityId) -> usize {
        let entity = &self.entities[se];
        match entity.my_q {
            Some(q) => self.wrr_rqs[q].highest_prio.min(MAX_WRR_PRIO - 1),
            None => entity.prio,
        }
    }

    /// 分类器给出的分类，不修改实体
    pub(crate) fn classification_of(&self, se: EntityId) -> Classification {
        let group = self.entities.get(se).and_then(|e| e.task_group);
        if self.classifier.is_background(group) {
            Classification::Background
        } else {
            Classification::Foreground
        }
    }

    /// 重新分类并记录在实体上
    pub(crate) fn classify(&mut self, se: EntityId) -> Classification {
        let class = self.classification_of(se);
        if let Some(entity) = self.entities.get_mut(se) {
            entity.class = class;
        }
        class
    }

    // ------------------------------------------------------------------
    // 任务准入
    // ------------------------------------------------------------------

    /// 任务进入 WRR 调度类
    ///
    /// `nest` 为 true 时任务挂到所属任务组的子运行队列，否则挂到根运行队列，
    /// 任务组只用于分类
    pub(crate) fn admit_task(
        &mut self,
        pid: Pid,
        prio: usize,
        group: Option<GroupId>,
        nest: bool,
    ) -> Result<EntityId, Errno> {
        if prio >= MAX_WRR_PRIO {
            return Err(Errno::InvalidArgument);
        }
        if self.tasks.contains_key(&pid) {
            return Err(Errno::FileExists);
        }

        let (wrr_rq, parent) = match group {
            Some(g) => {
                let gs = self.groups.get(&g).ok_or(Errno::NoSuchFileOrDirectory)?;
                if nest {
                    (gs.rq, Some(gs.se))
                } else {
                    (self.root, None)
                }
            }
            None => (self.root, None),
        };

        let mut entity = WrrEntity::new_task(pid, prio, wrr_rq, parent);
        entity.task_group = group;
        let se = self.entities.insert(entity)?;

        self.tasks.insert(pid, se);
        if let Some(gs) = group.and_then(|g| self.groups.get_mut(&g)) {
            gs.members += 1;
        }
        debug!(
            "wrr: cpu {} admit pid {} prio {} group {:?}",
            self.cpu, pid, prio, group
        );
        Ok(se)
    }

    /// 任务离开 WRR 调度类
    pub(crate) fn release_task(&mut self, pid: Pid) -> Result<(), Errno> {
        let se = self.tasks.get(&pid).copied().ok_or(Errno::NoSuchProcess)?;

        if self.entities[se].on_rq() {
            warn!("wrr: releasing queued pid {}, dequeuing first", pid);
            self.dequeue_task_entity(se);
        }
        if self.curr == Some(se) {
            self.curr = None;
        }

        let group = self.entities[se].task_group;
        if let Some(gs) = group.and_then(|g| self.groups.get_mut(&g)) {
            gs.members = gs.members.saturating_sub(1);
        }
        self.entities.remove(se);
        self.tasks.remove(&pid);
        debug!("wrr: cpu {} release pid {}", self.cpu, pid);
        Ok(())
    }

    // ------------------------------------------------------------------
    // 运行时间统计
    // ------------------------------------------------------------------

    /// update_curr_wrr
    ///
    /// 时钟回退时增量记为 0；运行时间同时记到所有祖先组实体上
    pub(crate) fn update_curr(&mut self) {
        let Some(curr) = self.curr else {
            return;
        };
        if !self.entities.contains(curr) {
            warn!("wrr: stale curr handle, clearing");
            self.curr = None;
            return;
        }

        let now = self.clock_task;
        let stats = &mut self.entities[curr].stats;
        let delta = now.checked_sub(stats.exec_start).unwrap_or(0);
        stats.exec_max = stats.exec_max.max(delta);
        stats.sum_exec_runtime = stats.sum_exec_runtime.saturating_add(delta);
        stats.exec_start = now;

        // account_group_exec_runtime
        let mut parent = self.entities[curr].parent;
        while let Some(se) = parent {
            let stats = &mut self.entities[se].stats;
            stats.sum_exec_runtime = stats.sum_exec_runtime.saturating_add(delta);
            stats.exec_max = stats.exec_max.max(delta);
            stats.exec_start = now;
            parent = self.entities[se].parent;
        }
    }

    /// 把实体的 exec_start 设为当前时钟
    pub(crate) fn start_exec(&mut self, se: EntityId) {
        let now = self.clock_task;
        self.entities[se].stats.exec_start = now;
    }

    // ------------------------------------------------------------------
    // 单层入队 / 出队
    // ------------------------------------------------------------------

    /// __enqueue_wrr_entity
    fn __enqueue_entity(&mut self, se: EntityId, head: bool) {
        if let Some(q) = self.entities[se].my_q {
            if self.wrr_rqs[q].wrr_nr_running == 0 {
                return;
            }
        }
        if self.entities[se].on_rq() {
            warn!("wrr: entity {:?} already queued", se);
            return;
        }

        let prio = self.se_prio(se);
        let rq_id = self.entities[se].wrr_rq;

        if self.wrr_rqs[rq_id].wrr_nr_running == 0 {
            self.leaf_wrr_rq_list.add(&mut self.wrr_rqs, rq_id);
        }

        self.wrr_rqs[rq_id]
            .active
            .insert(&mut self.entities, se, prio, head);
        self.entities[se].run_prio = Some(prio);
        self.wrr_rqs[rq_id].inc_wrr_tasks(prio);
        trace!("wrr: enqueue {:?} prio {} head {}", se, prio, head);
    }

    /// __dequeue_wrr_entity
    fn __dequeue_entity(&mut self, se: EntityId) {
        let Some(prio) = self.entities[se].run_prio.take() else {
            warn!("wrr: dequeue of unqueued entity {:?}", se);
            return;
        };
        let rq_id = self.entities[se].wrr_rq;

        if self.wrr_rqs[rq_id]
            .active
            .remove(&mut self.entities, se, prio)
            .is_err()
        {
            warn!("wrr: entity {:?} missing from prio {} list", se, prio);
            return;
        }

        self.wrr_rqs[rq_id].dec_wrr_tasks(prio);
        if self.wrr_rqs[rq_id].wrr_nr_running == 0 {
            self.leaf_wrr_rq_list.del(&mut self.wrr_rqs, rq_id);
        }
        trace!("wrr: dequeue {:?} prio {}", se, prio);
    }

    // ------------------------------------------------------------------
    // 沿祖先链的入队 / 出队
    // ------------------------------------------------------------------

    /// 已在队实体的有效优先级变化时，换到新优先级的链表里。
    ///
    /// 优先级不变时保持原位，同优先级实体之间的先后次序不受影响。
    fn __reprio_entity(&mut self, se: EntityId, head: bool) {
        let Some(old) = self.entities[se].run_prio else {
            return;
        };
        let prio = self.se_prio(se);
        if prio == old {
            return;
        }
        let rq_id = self.entities[se].wrr_rq;

        if self.wrr_rqs[rq_id]
            .active
            .remove(&mut self.entities, se, old)
            .is_err()
        {
            warn!("wrr: entity {:?} missing from prio {} list", se, old);
            self.entities[se].run_prio = None;
            return;
        }
        self.wrr_rqs[rq_id].dec_wrr_tasks(old);

        self.wrr_rqs[rq_id]
            .active
            .insert(&mut self.entities, se, prio, head);
        self.entities[se].run_prio = Some(prio);
        self.wrr_rqs[rq_id].inc_wrr_tasks(prio);
        trace!("wrr: reprio {:?} {} -> {}", se, old, prio);
    }

    /// dequeue_wrr_stack
    ///
    /// 上层实体的优先级取决于下层，过期的组实体必须自顶向下摘除。
    /// 第一遍沿 parent 向上填写 back 指针，第二遍沿 back 向下，
    /// 摘掉子运行队列已空却仍在队的组实体。
    fn dequeue_wrr_stack(&mut self, se: EntityId) {
        let mut back = None;
        let mut cur = Some(se);
        while let Some(s) = cur {
            self.entities[s].back = back;
            back = Some(s);
            cur = self.entities[s].parent;
        }

        let mut cur = back;
        while let Some(s) = cur {
            let stale = self.entities[s]
                .my_q
                .is_some_and(|q| self.wrr_rqs[q].wrr_nr_running == 0);
            if stale && self.entities[s].on_rq() {
                self.__dequeue_entity(s);
            }
            cur = self.entities[s].back;
        }
    }

    /// 自底向上修正 se 的祖先组实体
    ///
    /// 子运行队列为空的摘下，不在队的挂上，已在队的只在有效优先级变化时移动。
    fn update_ancestors(&mut self, se: EntityId, head: bool) {
        let mut cur = self.entities[se].parent;
        while let Some(s) = cur {
            let nonempty = self.entities[s]
                .my_q
                .is_some_and(|q| self.wrr_rqs[q].wrr_nr_running > 0);
            let queued = self.entities[s].on_rq();
            match (nonempty, queued) {
                (false, true) => self.__dequeue_entity(s),
                (true, false) => self.__enqueue_entity(s, head),
                (true, true) => self.__reprio_entity(s, head),
                (false, false) => {}
            }
            cur = self.entities[s].parent;
        }
    }

    /// enqueue_wrr_entity
    pub(crate) fn enqueue_entity(&mut self, se: EntityId, head: bool) {
        self.dequeue_wrr_stack(se);
        if self.entities[se].on_rq() {
            self.__reprio_entity(se, head);
        } else {
            self.__enqueue_entity(se, head);
        }
        self.update_ancestors(se, head);
    }

    /// dequeue_wrr_entity
    ///
    /// 摘下 se 后，自底向上调整祖先：子运行队列仍非空的保持在队
    pub(crate) fn dequeue_entity(&mut self, se: EntityId) {
        self.dequeue_wrr_stack(se);
        if self.entities[se].on_rq() {
            self.__dequeue_entity(se);
        }
        self.update_ancestors(se, false);
    }

    /// requeue_task_wrr：链上每一层都在本级队列内移动，不改变优先级
    pub(crate) fn requeue_entity(&mut self, se: EntityId, head: bool) {
        let mut cur = Some(se);
        while let Some(s) = cur {
            if let Some(prio) = self.entities[s].run_prio {
                let rq_id = self.entities[s].wrr_rq;
                self.wrr_rqs[rq_id]
                    .active
                    .requeue(&mut self.entities, s, prio, head);
            }
            cur = self.entities[s].parent;
        }
        trace!("wrr: requeue {:?} head {}", se, head);
    }

    /// 链上是否有某一层不是本级队列中唯一的实体
    pub(crate) fn chain_has_peer(&self, se: EntityId) -> bool {
        let mut cur = Some(se);
        while let Some(s) = cur {
            let entity = &self.entities[s];
            if let Some(prio) = entity.run_prio {
                if !self.wrr_rqs[entity.wrr_rq].active.is_singular(prio) {
                    return true;
                }
            }
            cur = entity.parent;
        }
        false
    }

    /// 任务入队，并计入执行单元的 nr_running
    pub(crate) fn enqueue_task_entity(&mut self, se: EntityId, head: bool) {
        if self.entities[se].on_rq() {
            warn!("wrr: task entity {:?} enqueued twice", se);
            return;
        }
        self.enqueue_entity(se, head);
        self.nr_running += 1;
    }

    /// 任务出队
    pub(crate) fn dequeue_task_entity(&mut self, se: EntityId) {
        if !self.entities[se].on_rq() {
            warn!("wrr: task entity {:?} not queued", se);
            return;
        }
        self.dequeue_entity(se);
        if self.nr_running == 0 {
            warn!("wrr: cpu {} nr_running underflow", self.cpu);
        } else {
            self.nr_running -= 1;
        }
    }

    /// 修改任务优先级，在队时保持层次关系重新入队
    pub(crate) fn change_prio(&mut self, se: EntityId, prio: usize) {
        if self.entities[se].on_rq() {
            self.dequeue_entity(se);
            self.entities[se].prio = prio;
            self.enqueue_entity(se, false);
        } else {
            self.entities[se].prio = prio;
        }
    }

    // ------------------------------------------------------------------
    // 选择下一个任务
    // ------------------------------------------------------------------

    /// _pick_next_task_wrr
    ///
    /// 从根运行队列开始，每层取最紧急的实体，遇到组实体就进入其子运行队列，
    /// 直到取到任务实体。遇到子运行队列为空的过期组实体时把它摘下并从头再选。
    pub(crate) fn pick_next_entity(&mut self) -> Option<EntityId> {
        'restart: loop {
            let mut rq_id = self.root;
            let mut via: Option<EntityId> = None;
            loop {
                match self.wrr_rqs[rq_id].active.peek_highest() {
                    Some(se) => match self.entities[se].my_q {
                        Some(q) => {
                            via = Some(se);
                            rq_id = q;
                        }
                        None => return Some(se),
                    },
                    None => {
                        let stale = via?;
                        warn!("wrr: group entity {:?} queued with empty child rq", stale);
                        self.__dequeue_entity(stale);
                        continue 'restart;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // 一致性检查
    // ------------------------------------------------------------------

    /// 检查所有运行队列的不变式
    pub fn check_invariants(&self) -> bool {
        let mut queued_tasks = 0;
        for (rq_id, wrr_rq) in self.wrr_rqs.iter() {
            let array = &wrr_rq.active;
            if !array.is_consistent() {
                return false;
            }
            let linked: usize = (0..MAX_WRR_PRIO).map(|p| array.len(p)).sum();
            if linked != wrr_rq.wrr_nr_running {
                return false;
            }
            if wrr_rq.highest_prio != array.first_active().unwrap_or(MAX_WRR_PRIO) {
                return false;
            }
            let on_leaf_list = self.leaf_wrr_rq_list.is_linked(&self.wrr_rqs, rq_id);
            if on_leaf_list != (wrr_rq.wrr_nr_running > 0) {
                return false;
            }
            for prio in 0..MAX_WRR_PRIO {
                for se in array.iter(&self.entities, prio) {
                    let entity = &self.entities[se];
                    if entity.run_prio != Some(prio) || entity.wrr_rq != rq_id {
                        return false;
                    }
                    if entity.is_task() {
                        queued_tasks += 1;
                    } else if entity.my_q.is_some_and(|q| self.wrr_rqs[q].wrr_nr_running == 0) {
                        return false;
                    } else if entity.run_prio != Some(self.se_prio(se)) {
                        return false;
                    }
                }
            }
        }
        queued_tasks == self.nr_running
    }
}
