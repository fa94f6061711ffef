//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：Per-CPU 调度器和任务组资源分配
use super::*;
use crate::config::MAX_CPUS;
use crate::errno::Errno;
use crate::sched::percpu::WrrScheduler;

fn scheduler(nr_cpus: usize, max_entities: usize) -> WrrScheduler {
    let mut tunables = tunables();
    tunables.max_entities = max_entities;
    WrrScheduler::new(nr_cpus, WrrPolicy::Group, &tunables, Arc::new(AllForeground)).unwrap()
}

#[test]
fn cpu_count_is_validated() {
    let t = tunables();
    for bad in [0, MAX_CPUS + 1] {
        let result = WrrScheduler::new(bad, WrrPolicy::Basic, &t, Arc::new(AllForeground));
        assert_eq!(result.err(), Some(Errno::InvalidArgument));
    }

    let sched = scheduler(MAX_CPUS, 8);
    assert_eq!(sched.nr_cpus(), MAX_CPUS);
    assert!(sched.cpu_rq(MAX_CPUS).is_none());
    for cpu in 0..MAX_CPUS {
        let rq = sched.cpu_rq(cpu).unwrap();
        assert_eq!(rq.cpu(), cpu);
        assert_eq!(rq.class_name(), "wrr_group");
    }
}

#[test]
fn group_alloc_spans_all_cpus() {
    let sched = scheduler(2, 8);
    sched.alloc_group(1, None).unwrap();
    sched.alloc_group(2, Some(1)).unwrap();

    for cpu in 0..2 {
        let rq = sched.cpu_rq(cpu).unwrap();
        assert!(rq.rq().group(1).is_some());
        assert!(rq.rq().group(2).is_some());
    }

    // 每个执行单元上的任务独立入队
    {
        let mut rq = sched.cpu_rq(1).unwrap();
        let se = admit_queued(&mut rq, 10, 5, Some(2));
        assert_eq!(rq.pick_next(), Some(se));
    }
    assert_eq!(sched.cpu_rq(0).unwrap().nr_running(), 0);
    assert_eq!(sched.cpu_rq(1).unwrap().nr_running(), 1);
}

#[test]
fn failed_alloc_rolls_back_every_cpu() {
    let sched = scheduler(3, 4);

    // 执行单元 2 的实体槽位用完
    {
        let mut rq = sched.cpu_rq(2).unwrap();
        for pid in 0..4 {
            rq.admit_task(pid, 50, None).unwrap();
        }
        assert!(!rq.can_alloc_group());
    }

    assert_eq!(sched.alloc_group(7, None), Err(Errno::OutOfMemory));
    for cpu in 0..3 {
        assert!(
            sched.cpu_rq(cpu).unwrap().rq().group(7).is_none(),
            "group 7 left behind on cpu {}",
            cpu
        );
    }

    // 腾出槽位后可以重新分配
    sched.cpu_rq(2).unwrap().release_task(0).unwrap();
    sched.alloc_group(7, None).unwrap();
    assert_eq!(sched.alloc_group(7, None), Err(Errno::FileExists));
}

#[test]
fn free_group_is_all_or_nothing() {
    let sched = scheduler(2, 8);
    sched.alloc_group(1, None).unwrap();
    sched.cpu_rq(1).unwrap().admit_task(5, 20, Some(1)).unwrap();

    assert_eq!(sched.free_group(1), Err(Errno::DeviceOrResourceBusy));
    assert!(sched.cpu_rq(0).unwrap().rq().group(1).is_some());

    sched.cpu_rq(1).unwrap().release_task(5).unwrap();
    sched.free_group(1).unwrap();
    for cpu in 0..2 {
        assert!(sched.cpu_rq(cpu).unwrap().rq().group(1).is_none());
    }
    assert_eq!(sched.free_group(1), Err(Errno::NoSuchFileOrDirectory));
}
