//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 任务组层次
//!
//! 对应 Linux 的 alloc_rt_sched_group / free_rt_sched_group /
//! init_tg_rt_entry (kernel/sched/rt.c)。
//!
//! 每个任务组在每个执行单元上有一对资源：一个组实体和它拥有的子运行队列。
//! 组实体挂在父任务组的子运行队列上（父为根任务组时挂在根运行队列上），
//! 形成一棵以根运行队列为根的树。

use log::debug;

use super::entity::{GroupId, WrrEntity};
use super::rq::{GroupSched, Rq};
use super::wrr_rq::WrrRq;
use crate::errno::Errno;

impl Rq {
    /// 本执行单元是否还能容纳一个任务组
    pub fn can_alloc_group(&self) -> bool {
        self.entities.remaining() >= 1 && self.wrr_rqs.remaining() >= 1
    }

    /// alloc_wrr_sched_group
    ///
    /// 先检查两个槽位都可用，再一起插入并链接；失败时不留下任何资源
    pub fn alloc_group(&mut self, group: GroupId, parent: Option<GroupId>) -> Result<(), Errno> {
        if self.groups.contains_key(&group) {
            return Err(Errno::FileExists);
        }
        let (parent_se, parent_rq) = match parent {
            Some(p) => {
                let gs = self.groups.get(&p).ok_or(Errno::NoSuchFileOrDirectory)?;
                (Some(gs.se), gs.rq)
            }
            None => (None, self.root()),
        };
        if !self.can_alloc_group() {
            return Err(Errno::OutOfMemory);
        }

        let rq = self.wrr_rqs.insert(WrrRq::new())?;
        let se = match self
            .entities
            .insert(WrrEntity::new_group(group, parent_rq, rq, parent_se))
        {
            Ok(se) => se,
            Err(e) => {
                self.wrr_rqs.remove(rq);
                return Err(e);
            }
        };

        // init_tg_wrr_entry
        self.wrr_rqs[rq].owner = Some(se);
        self.groups.insert(
            group,
            GroupSched {
                se,
                rq,
                parent,
                members: 0,
                children: 0,
            },
        );
        if let Some(gs) = parent.and_then(|p| self.groups.get_mut(&p)) {
            gs.children += 1;
        }

        debug!(
            "wrr: cpu {} alloc group {} parent {:?}",
            self.cpu(),
            group,
            parent
        );
        Ok(())
    }

    /// free_wrr_sched_group
    ///
    /// 任务组仍有成员任务或子任务组时返回 EBUSY
    pub fn free_group(&mut self, group: GroupId) -> Result<(), Errno> {
        let gs = *self.groups.get(&group).ok_or(Errno::NoSuchFileOrDirectory)?;
        if gs.members > 0 || gs.children > 0 || self.wrr_rqs[gs.rq].nr_running() > 0 {
            return Err(Errno::DeviceOrResourceBusy);
        }

        if self.entities[gs.se].on_rq() {
            self.dequeue_entity(gs.se);
        }
        self.entities.remove(gs.se);
        self.wrr_rqs.remove(gs.rq);
        self.groups.remove(&group);
        if let Some(parent) = gs.parent.and_then(|p| self.groups.get_mut(&p)) {
            parent.children = parent.children.saturating_sub(1);
        }

        debug!("wrr: cpu {} free group {}", self.cpu(), group);
        Ok(())
    }

    /// 组成员数
    pub fn group_members(&self, group: GroupId) -> Option<usize> {
        self.groups.get(&group).map(|gs| gs.members)
    }
}
