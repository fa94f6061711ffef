//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! WRR 运行队列
//!
//! 对应 Linux 的 struct rt_rq (kernel/sched/sched.h)。
//! 每个执行单元有一个根运行队列，组调度下每个任务组在每个执行单元上
//! 还各有一个子运行队列。

use log::warn;

use super::entity::{EntityId, RqId};
use super::prio_array::WrrPrioArray;
use super::MAX_WRR_PRIO;
use crate::collection::Slab;
use crate::list::{ListLink, ListNodes};

pub struct WrrRq {
    /// 优先级数组
    pub(crate) active: WrrPrioArray,

    /// 直接挂在本队列上的实体数
    pub(crate) wrr_nr_running: usize,

    /// 最紧急的在队优先级，队列为空时为 MAX_WRR_PRIO
    pub(crate) highest_prio: usize,

    /// 拥有本队列的组实体，根运行队列为 None
    pub(crate) owner: Option<EntityId>,

    /// 执行单元 leaf_wrr_rq_list 上的节点
    pub(crate) leaf_link: ListLink<RqId>,
}

impl Default for WrrRq {
    fn default() -> Self {
        Self::new()
    }
}

impl WrrRq {
    /// init_wrr_rq
    pub const fn new() -> Self {
        Self {
            active: WrrPrioArray::new(),
            wrr_nr_running: 0,
            highest_prio: MAX_WRR_PRIO,
            owner: None,
            leaf_link: ListLink::new(),
        }
    }

    #[inline]
    pub fn nr_running(&self) -> usize {
        self.wrr_nr_running
    }

    #[inline]
    pub fn highest_prio(&self) -> usize {
        self.highest_prio
    }

    #[inline]
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.wrr_nr_running == 0
    }

    pub fn prio_array(&self) -> &WrrPrioArray {
        &self.active
    }

    /// inc_wrr_tasks + inc_wrr_prio
    pub(crate) fn inc_wrr_tasks(&mut self, prio: usize) {
        self.wrr_nr_running += 1;
        if prio < self.highest_prio {
            self.highest_prio = prio;
        }
    }

    /// dec_wrr_tasks + dec_wrr_prio
    ///
    /// 必须在实体已经从优先级数组摘下之后调用，重新计算依赖位图
    pub(crate) fn dec_wrr_tasks(&mut self, prio: usize) {
        if self.wrr_nr_running == 0 {
            warn!("wrr: wrr_nr_running underflow (prio {})", prio);
            self.highest_prio = MAX_WRR_PRIO;
            return;
        }
        self.wrr_nr_running -= 1;

        if self.wrr_nr_running == 0 {
            self.highest_prio = MAX_WRR_PRIO;
            return;
        }

        if prio < self.highest_prio {
            warn!(
                "wrr: dequeued prio {} above cached highest {}",
                prio, self.highest_prio
            );
        }
        if prio <= self.highest_prio {
            self.highest_prio = self.active.first_active().unwrap_or(MAX_WRR_PRIO);
        }
    }
}

impl ListNodes<RqId> for Slab<RqId, WrrRq> {
    fn link(&self, key: RqId) -> &ListLink<RqId> {
        &self[key].leaf_link
    }

    fn link_mut(&mut self, key: RqId) -> &mut ListLink<RqId> {
        &mut self[key].leaf_link
    }
}
