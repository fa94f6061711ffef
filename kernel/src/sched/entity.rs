//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! WRR 调度实体
//!
//! 对应 Linux 内核的 struct sched_rt_entity (include/linux/sched.h)，
//! 在 WRR 作业中为 struct sched_wrr_entity。
//!
//! 和 Linux 不同的是，调度实体不嵌入在 task_struct 里，而是放在每个
//! 执行单元的 `Slab` 中，用 `EntityId` 句柄引用；句柄到所属任务 / 任务组
//! 的映射保存在 `owner` 字段里，不需要 container_of。

use crate::collection::{Slab, SlabKey};
use crate::list::{ListLink, ListNodes};

/// 进程 ID
pub type Pid = u32;

/// 任务组 ID（由宿主分配，对应 struct task_group）
pub type GroupId = u32;

/// 调度实体句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u32);

/// WRR 运行队列句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RqId(u32);

impl SlabKey for EntityId {
    fn from_index(index: usize) -> Self {
        EntityId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl SlabKey for RqId {
    fn from_index(index: usize) -> Self {
        RqId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// 前台 / 后台分类
///
/// 由外部分类器给出，决定时间片长度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classification {
    #[default]
    Foreground,
    Background,
}

/// 调度实体的所属者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// 普通任务
    Task(Pid),
    /// 任务组在本执行单元上的代表实体
    Group(GroupId),
}

/// 运行时间统计
///
/// 对应 struct sched_entity 的 exec_start / sum_exec_runtime /
/// statistics.exec_max
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    /// 本次开始运行的时钟
    pub exec_start: u64,
    /// 累计运行时间
    pub sum_exec_runtime: u64,
    /// 单次 update_curr 的最大增量
    pub exec_max: u64,
}

pub struct WrrEntity {
    /// 优先级队列链表节点 (run_list)
    pub(crate) run_list: ListLink<EntityId>,

    /// 当前挂在哪一级优先级队列上，None 表示不在队列中
    ///
    /// 出队时按入队时的级别查找链表，组实体的优先级在入队后可能变化
    pub(crate) run_prio: Option<usize>,

    /// 任务优先级，数值越小越紧急
    pub(crate) prio: usize,

    /// 剩余时间片 (tick)
    pub(crate) time_slice: u32,

    pub(crate) class: Classification,

    /// 在当前 stage 连续停留的次数（RMLFQ）
    pub(crate) times: u32,

    /// 父实体（组调度），None 表示挂在根运行队列
    pub(crate) parent: Option<EntityId>,

    /// 自顶向下出队时的回溯指针 (sched_rt_entity::back)
    pub(crate) back: Option<EntityId>,

    /// 本实体入队的运行队列
    pub(crate) wrr_rq: RqId,

    /// 组实体拥有的子运行队列 (my_q)
    pub(crate) my_q: Option<RqId>,

    pub(crate) owner: Owner,

    /// 任务所属的任务组，用于前台/后台分类
    pub(crate) task_group: Option<GroupId>,

    pub(crate) stats: ExecStats,
}

impl WrrEntity {
    pub(crate) fn new_task(pid: Pid, prio: usize, wrr_rq: RqId, parent: Option<EntityId>) -> Self {
        Self {
            run_list: ListLink::new(),
            run_prio: None,
            prio,
            time_slice: 0,
            class: Classification::Foreground,
            times: 1,
            parent,
            back: None,
            wrr_rq,
            my_q: None,
            owner: Owner::Task(pid),
            task_group: None,
            stats: ExecStats::default(),
        }
    }

    pub(crate) fn new_group(
        group: GroupId,
        wrr_rq: RqId,
        my_q: RqId,
        parent: Option<EntityId>,
    ) -> Self {
        Self {
            run_list: ListLink::new(),
            run_prio: None,
            prio: 0,
            time_slice: 0,
            class: Classification::Foreground,
            times: 1,
            parent,
            back: None,
            wrr_rq,
            my_q: Some(my_q),
            owner: Owner::Group(group),
            task_group: Some(group),
            stats: ExecStats::default(),
        }
    }

    /// 任务优先级（组实体的有效优先级见 `Rq::se_prio`）
    #[inline]
    pub fn prio(&self) -> usize {
        self.prio
    }

    #[inline]
    pub fn time_slice(&self) -> u32 {
        self.time_slice
    }

    #[inline]
    pub fn classification(&self) -> Classification {
        self.class
    }

    /// 在当前 stage 的停留计数
    #[inline]
    pub fn stability(&self) -> u32 {
        self.times
    }

    #[inline]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    #[inline]
    pub fn owner(&self) -> Owner {
        self.owner
    }

    #[inline]
    pub fn task_group(&self) -> Option<GroupId> {
        self.task_group
    }

    #[inline]
    pub fn wrr_rq(&self) -> RqId {
        self.wrr_rq
    }

    #[inline]
    pub fn group_rq(&self) -> Option<RqId> {
        self.my_q
    }

    /// wrr_entity_is_task
    #[inline]
    pub fn is_task(&self) -> bool {
        self.my_q.is_none()
    }

    /// on_wrr_rq
    #[inline]
    pub fn on_rq(&self) -> bool {
        self.run_prio.is_some()
    }

    #[inline]
    pub fn run_prio(&self) -> Option<usize> {
        self.run_prio
    }

    #[inline]
    pub fn stats(&self) -> &ExecStats {
        &self.stats
    }

    pub fn pid(&self) -> Option<Pid> {
        match self.owner {
            Owner::Task(pid) => Some(pid),
            Owner::Group(_) => None,
        }
    }
}

impl ListNodes<EntityId> for Slab<EntityId, WrrEntity> {
    fn link(&self, key: EntityId) -> &ListLink<EntityId> {
        &self[key].run_list
    }

    fn link_mut(&mut self, key: EntityId) -> &mut ListLink<EntityId> {
        &mut self[key].run_list
    }
}
