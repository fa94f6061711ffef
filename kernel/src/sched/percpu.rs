//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! Per-CPU 调度器
//!
//! 对应 Linux 的 DEFINE_PER_CPU_SHARED_ALIGNED(struct rq, runqueues) 和 cpu_rq()。
//! 每个执行单元一个 `spin::Mutex<CpuSched>`，调用调度钩子前先拿对应的锁。
//!
//! 任务组的资源在每个执行单元上各分配一份，分配是全有或全无的：
//! 任何一个执行单元失败，已经分配的部分全部回滚。

use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, warn};
use spin::{Mutex, MutexGuard};

use super::class::{WrrPolicy, WrrTunables};
use super::classify::GroupClassifier;
use super::core::CpuSched;
use super::entity::GroupId;
use crate::config::MAX_CPUS;
use crate::errno::Errno;

pub struct WrrScheduler {
    cpus: Vec<Mutex<CpuSched>>,
    policy: WrrPolicy,
}

impl WrrScheduler {
    /// 创建 `nr_cpus` 个执行单元，数量须在 1..=MAX_CPUS 之内
    pub fn new(
        nr_cpus: usize,
        policy: WrrPolicy,
        tunables: &WrrTunables,
        classifier: Arc<dyn GroupClassifier>,
    ) -> Result<Self, Errno> {
        if nr_cpus == 0 || nr_cpus > MAX_CPUS {
            return Err(Errno::InvalidArgument);
        }

        let mut cpus = Vec::with_capacity(nr_cpus);
        for cpu in 0..nr_cpus {
            let sched = CpuSched::new(cpu, policy, tunables, classifier.clone())?;
            cpus.push(Mutex::new(sched));
        }

        debug!("wrr: {} cpus, policy {}", nr_cpus, policy.name());
        Ok(Self { cpus, policy })
    }

    #[inline]
    pub fn nr_cpus(&self) -> usize {
        self.cpus.len()
    }

    pub fn policy(&self) -> WrrPolicy {
        self.policy
    }

    /// cpu_rq：拿到指定执行单元的锁
    pub fn cpu_rq(&self, cpu: usize) -> Option<MutexGuard<'_, CpuSched>> {
        self.cpus.get(cpu).map(|rq| rq.lock())
    }

    /// alloc_wrr_sched_group：在所有执行单元上分配任务组资源
    pub fn alloc_group(&self, group: GroupId, parent: Option<GroupId>) -> Result<(), Errno> {
        for (cpu, rq) in self.cpus.iter().enumerate() {
            let result = rq.lock().alloc_group(group, parent);
            if let Err(e) = result {
                warn!("wrr: alloc group {} failed on cpu {}: {}", group, cpu, e);
                self.rollback_group(group, cpu);
                return Err(e);
            }
        }
        Ok(())
    }

    /// 释放前 `nr` 个执行单元上的任务组，返回释放失败的执行单元数
    fn rollback_group(&self, group: GroupId, nr: usize) -> usize {
        let mut failed = 0;
        for (cpu, rq) in self.cpus[..nr].iter().enumerate() {
            if let Err(e) = rq.lock().free_group(group) {
                warn!("wrr: rollback of group {} failed on cpu {}: {}", group, cpu, e);
                failed += 1;
            }
        }
        failed
    }

    /// free_wrr_sched_group：在所有执行单元上释放任务组资源
    ///
    /// 先确认每个执行单元上都可以释放，再逐个释放
    pub fn free_group(&self, group: GroupId) -> Result<(), Errno> {
        for rq in self.cpus.iter() {
            let rq = rq.lock();
            let gs = rq.rq().group(group).ok_or(Errno::NoSuchFileOrDirectory)?;
            let busy = gs.members > 0
                || gs.children > 0
                || rq.rq().wrr_rq(gs.rq).is_some_and(|q| !q.is_empty());
            if busy {
                return Err(Errno::DeviceOrResourceBusy);
            }
        }
        for rq in self.cpus.iter() {
            rq.lock().free_group(group)?;
        }
        Ok(())
    }
}
