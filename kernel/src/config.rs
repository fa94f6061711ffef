//! Rux 内核配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "Rux";

/// 内核版本
pub const KERNEL_VERSION: &str = "0.1.0";

// ============================================================
// SMP 配置
// ============================================================

/// 最大CPU数量
pub const MAX_CPUS: usize = 4;

// ============================================================
// WRR 调度器配置
// ============================================================

/// 默认 WRR 调度策略 (basic / group / rmlfq)
pub const WRR_DEFAULT_POLICY: &str = "group";

/// 前台任务时间片 (tick)
pub const WRR_FORE_TIMESLICE: u32 = 10;

/// 后台任务时间片 (tick)
pub const WRR_BACK_TIMESLICE: u32 = 1;

/// 每个执行单元的调度实体槽位上限
pub const WRR_MAX_ENTITIES: usize = 256;

/// RMLFQ 随机数抽取范围 [0, range)
pub const WRR_RMLFQ_DRAW_RANGE: u64 = 4294967295;

/// RMLFQ 随机数种子
pub const WRR_RMLFQ_SEED: u64 = 20260417;
