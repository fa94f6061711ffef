//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 随机多级反馈队列 (RMLFQ) 调度类
//!
//! 优先级 0..99 分成 10 个 stage，每个 stage 宽 10：
//!
//! ```text
//! stage(prio) = (99 - prio) / 10
//! stage 9 = prio 0..=9   (最紧急)
//! stage 0 = prio 90..=99 (最不紧急)
//! ```
//!
//! 时间片用完时抽一个随机数 r ∈ [0, RANGE)，b 为 stage，s 为连续停留次数：
//! - r < (s + b/2) × RANGE / 10 → 降一级
//! - r > (5 − s + b/2) × RANGE / 10 → 升一级
//! - 否则停留，s += 1
//!
//! 发生迁移（包括已在边界上的饱和迁移）时 s 重置为 1。
//! 补充的时间片为 base × (stage + 1)。

use alloc::boxed::Box;

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

use super::class::SchedClass;
use super::entity::EntityId;
use super::rq::Rq;
use super::MAX_WRR_PRIO;

/// stage 个数
pub const NR_STAGES: usize = 10;

/// 每个 stage 包含的优先级数
pub const STAGE_WIDTH: usize = MAX_WRR_PRIO / NR_STAGES;

/// 优先级所在的 stage
#[inline]
pub fn stage_of(prio: usize) -> usize {
    (MAX_WRR_PRIO - 1 - prio.min(MAX_WRR_PRIO - 1)) / STAGE_WIDTH
}

/// 一次抽签的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMove {
    /// 降到不那么紧急的 stage
    Demote,
    /// 升到更紧急的 stage
    Promote,
    /// 留在原 stage
    Stay,
}

/// 根据抽到的 r 决定迁移方向
pub fn decide(r: u64, stage: usize, times: u32, range: u64) -> StageMove {
    let r = i128::from(r);
    let s = i128::from(times);
    let b = (stage / 2) as i128;
    let range = i128::from(range);

    let demote = (s + b) * range / 10;
    let promote = (5 - s + b) * range / 10;

    if r < demote {
        StageMove::Demote
    } else if r > promote {
        StageMove::Promote
    } else {
        StageMove::Stay
    }
}

/// 迁移后的优先级，已在边界上时保持不变
pub fn apply_move(prio: usize, mv: StageMove) -> usize {
    let stage = stage_of(prio);
    match mv {
        StageMove::Demote if stage > 0 => prio + STAGE_WIDTH,
        StageMove::Promote if stage + 1 < NR_STAGES => prio - STAGE_WIDTH,
        _ => prio,
    }
}

/// 随机数来源
pub trait StageRng: Send {
    /// 返回 [0, range) 内均匀分布的值，range 为 0 时返回 0
    fn draw(&mut self, range: u64) -> u64;
}

/// 基于 rand 的随机数来源
pub struct RandStage<R> {
    rng: R,
}

impl<R: RngCore + Send> RandStage<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandStage<SmallRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> StageRng for RandStage<R> {
    fn draw(&mut self, range: u64) -> u64 {
        if range == 0 {
            return 0;
        }
        self.rng.gen_range(0..range)
    }
}

pub struct WrrRmlfq {
    rng: Box<dyn StageRng>,
    range: u64,
}

impl WrrRmlfq {
    pub fn new(rng: Box<dyn StageRng>, range: u64) -> Self {
        Self { rng, range }
    }

    /// 时间片用完时抽签并迁移，返回迁移方向
    fn migrate(&mut self, rq: &mut Rq, se: EntityId) -> StageMove {
        let Some(entity) = rq.entity(se) else {
            return StageMove::Stay;
        };
        let prio = entity.prio();
        let times = entity.stability();
        let stage = stage_of(prio);

        let r = self.rng.draw(self.range);
        let mv = decide(r, stage, times, self.range);
        let new_prio = apply_move(prio, mv);

        match mv {
            StageMove::Stay => {
                if let Some(entity) = rq.entity_mut(se) {
                    entity.times = entity.times.saturating_add(1);
                }
                rq.requeue_entity(se, false);
            }
            StageMove::Demote | StageMove::Promote => {
                if let Some(entity) = rq.entity_mut(se) {
                    entity.times = 1;
                }
                // 新旧优先级相同时也走一遍出队/入队，效果是移到队尾
                rq.change_prio(se, new_prio);
            }
        }

        debug!(
            "wrr: rmlfq {:?} r={} stage {} s={} {:?} -> prio {}",
            se, r, stage, times, mv, new_prio
        );
        mv
    }
}

impl SchedClass for WrrRmlfq {
    fn name(&self) -> &'static str {
        "wrr_rmlfq"
    }

    fn refill(&mut self, rq: &mut Rq, se: EntityId) {
        let Some(prio) = rq.entity(se).map(|e| e.prio()) else {
            return;
        };
        let class = rq.classify(se);
        let slice = rq.timeslice.scaled(class, stage_of(prio));
        if let Some(entity) = rq.entity_mut(se) {
            entity.time_slice = slice;
        }
    }

    /// 时间片用完时总是抽签迁移并移到队尾，有其他任务可运行时才请求重新调度
    fn task_tick(&mut self, rq: &mut Rq, se: EntityId) {
        rq.update_curr();

        let Some(entity) = rq.entity_mut(se) else {
            return;
        };
        entity.time_slice = entity.time_slice.saturating_sub(1);
        if entity.time_slice > 0 {
            return;
        }

        self.migrate(rq, se);
        self.refill(rq, se);
        if rq.nr_running() > 1 {
            rq.resched_curr();
        }
    }

    fn get_rr_interval(&self, rq: &Rq, se: EntityId) -> u32 {
        let class = rq.classification_of(se);
        let stage = rq.entity(se).map_or(0, |e| stage_of(e.prio()));
        rq.timeslice.scaled(class, stage)
    }
}
