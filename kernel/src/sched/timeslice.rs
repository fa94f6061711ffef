//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 时间片计算
//!
//! 前台任务和后台任务各有一个固定的时间片长度（单位：tick）。
//! RMLFQ 策略下，前台时间片再按所在 stage 放大，后台时间片保持不变。

use super::entity::Classification;
use crate::config::{WRR_BACK_TIMESLICE, WRR_FORE_TIMESLICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeslice {
    /// 前台时间片 (WRR_FORE_TIMESLICE)
    pub fore: u32,
    /// 后台时间片 (WRR_BACK_TIMESLICE)
    pub back: u32,
}

impl Default for Timeslice {
    fn default() -> Self {
        Self {
            fore: WRR_FORE_TIMESLICE,
            back: WRR_BACK_TIMESLICE,
        }
    }
}

impl Timeslice {
    pub const fn new(fore: u32, back: u32) -> Self {
        Self { fore, back }
    }

    /// 按分类给出基础时间片
    #[inline]
    pub fn for_class(&self, class: Classification) -> u32 {
        match class {
            Classification::Foreground => self.fore,
            Classification::Background => self.back,
        }
    }

    /// 按 stage 放大后的时间片：前台为 fore × (stage + 1)，后台固定为 back
    #[inline]
    pub fn scaled(&self, class: Classification, stage: usize) -> u32 {
        match class {
            Classification::Foreground => {
                let factor = u32::try_from(stage + 1).unwrap_or(u32::MAX);
                self.fore.saturating_mul(factor)
            }
            Classification::Background => self.back,
        }
    }
}
