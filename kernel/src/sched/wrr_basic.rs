//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 基本 WRR 调度类
//!
//! 所有任务挂在根运行队列上：
//! - 选择最紧急的非空优先级队列的队头
//! - 时间片用完后补充，同级还有其他任务时移到队尾
//! - fork 出的子任务从新的时间片开始
//!
//! 行为就是 `SchedClass` 的默认实现。

use super::class::SchedClass;

#[derive(Debug, Default)]
pub struct WrrBasic;

impl WrrBasic {
    pub const fn new() -> Self {
        Self
    }
}

impl SchedClass for WrrBasic {
    fn name(&self) -> &'static str {
        "wrr"
    }
}
