//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 组调度 WRR 调度类
//!
//! 对应 Linux CONFIG_RT_GROUP_SCHED 下的 rt 调度类：
//! - 任务挂在所属任务组的子运行队列上，组实体挂在父运行队列上
//! - 入队 / 出队沿祖先链传播（见 `Rq::enqueue_entity` / `Rq::dequeue_entity`）
//! - 选择时从根运行队列逐层向下
//! - fork 出的子任务继承父任务剩余的时间片

use log::trace;

use super::class::SchedClass;
use super::entity::EntityId;
use super::rq::Rq;

#[derive(Debug, Default)]
pub struct WrrGroup;

impl WrrGroup {
    pub const fn new() -> Self {
        Self
    }
}

impl SchedClass for WrrGroup {
    fn name(&self) -> &'static str {
        "wrr_group"
    }

    fn is_group_aware(&self) -> bool {
        true
    }

    /// 子任务继承父任务剩余的时间片，父任务时间片为 0 时重新分配
    fn task_fork(&mut self, rq: &mut Rq, parent: EntityId, child: EntityId) {
        let inherited = rq.entity(parent).map_or(0, |p| p.time_slice());
        if inherited == 0 {
            self.refill(rq, child);
            return;
        }

        let class = rq.classify(child);
        if let Some(entity) = rq.entity_mut(child) {
            entity.time_slice = inherited;
        }
        trace!("wrr: fork {:?} inherits {} ({:?})", child, inherited, class);
    }
}
