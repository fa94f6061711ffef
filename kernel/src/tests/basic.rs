//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：基本 WRR 调度类的入队、出队和选择
use super::*;
use crate::errno::Errno;
use crate::sched::class::DequeueFlags;

#[test]
fn pick_order_follows_priority_then_fifo() {
    let mut sched = cpu_sched(WrrPolicy::Basic);

    // 测试 1: 优先级 5, 5, 10 依次入队
    let a = admit_queued(&mut sched, 1, 5, None);
    let b = admit_queued(&mut sched, 2, 5, None);
    let c = admit_queued(&mut sched, 3, 10, None);
    assert_eq!(sched.nr_running(), 3);
    assert!(sched.check_invariants());

    // 测试 2: 先选出第一个优先级 5 的任务
    assert_eq!(sched.pick_next(), Some(a), "first prio-5 entity should run first");
    sched.dequeue(a, DequeueFlags::SLEEP).unwrap();

    // 测试 3: 然后是第二个优先级 5 的任务
    assert_eq!(sched.pick_next(), Some(b));
    sched.dequeue(b, DequeueFlags::SLEEP).unwrap();

    // 测试 4: 最后是优先级 10 的任务
    assert_eq!(sched.pick_next(), Some(c));
    sched.dequeue(c, DequeueFlags::SLEEP).unwrap();

    // 测试 5: 队列为空
    assert_eq!(sched.pick_next(), None);
    assert_eq!(sched.nr_running(), 0);
    assert!(sched.rq().root_wrr_rq().is_empty());
    assert!(sched.rq().root_wrr_rq().prio_array().is_empty());
    assert!(sched.check_invariants());
}

#[test]
fn head_enqueue_runs_before_earlier_arrivals() {
    let mut sched = cpu_sched(WrrPolicy::Basic);
    let a = admit_queued(&mut sched, 1, 7, None);
    let b = sched.admit_task(2, 7, None).unwrap();
    sched.enqueue(b, EnqueueFlags::HEAD | EnqueueFlags::RESTORE).unwrap();

    let root = sched.rq().root();
    assert_eq!(queue_snapshot(&sched, root), [(7, alloc::vec![b, a])]);
    assert_eq!(sched.pick_next(), Some(b));
}

#[test]
fn enqueue_then_dequeue_restores_state() {
    let mut sched = cpu_sched(WrrPolicy::Basic);
    admit_queued(&mut sched, 1, 5, None);
    admit_queued(&mut sched, 2, 5, None);
    admit_queued(&mut sched, 3, 40, None);

    let root = sched.rq().root();
    let before = queue_snapshot(&sched, root);
    let highest = sched.rq().root_wrr_rq().highest_prio();
    let bitmap = *sched.rq().root_wrr_rq().prio_array().bitmap();

    // 更紧急的任务入队后立即出队
    for prio in [0, 5, 40, 99] {
        let se = admit_queued(&mut sched, 10, prio, None);
        assert_eq!(sched.rq().root_wrr_rq().highest_prio(), prio.min(5));
        sched.dequeue(se, DequeueFlags::empty()).unwrap();
        sched.release_task(10).unwrap();

        assert_eq!(queue_snapshot(&sched, root), before);
        assert_eq!(sched.rq().root_wrr_rq().highest_prio(), highest);
        assert_eq!(*sched.rq().root_wrr_rq().prio_array().bitmap(), bitmap);
        assert_eq!(sched.nr_running(), 3);
    }
    assert!(sched.check_invariants());
}

#[test]
fn double_enqueue_is_ignored() {
    let mut sched = cpu_sched(WrrPolicy::Basic);
    let a = admit_queued(&mut sched, 1, 5, None);
    sched.enqueue(a, EnqueueFlags::empty()).unwrap();
    assert_eq!(sched.nr_running(), 1);

    // 不在队列上的任务出队同样被忽略
    sched.dequeue(a, DequeueFlags::empty()).unwrap();
    sched.dequeue(a, DequeueFlags::empty()).unwrap();
    assert_eq!(sched.nr_running(), 0);
    assert!(sched.check_invariants());
}

#[test]
fn yield_moves_current_to_tail() {
    let mut sched = cpu_sched(WrrPolicy::Basic);
    let a = admit_queued(&mut sched, 1, 5, None);
    let b = admit_queued(&mut sched, 2, 5, None);
    let c = admit_queued(&mut sched, 3, 8, None);

    assert_eq!(sched.pick_next(), Some(a));
    sched.yield_current();

    let root = sched.rq().root();
    assert_eq!(
        queue_snapshot(&sched, root),
        [(5, alloc::vec![b, a]), (8, alloc::vec![c])]
    );
    assert_eq!(sched.entity(a).unwrap().prio(), 5, "yield must not change priority");
    sched.put_prev(a).unwrap();
    assert_eq!(sched.pick_next(), Some(b));
}

#[test]
fn wakeup_preemption_is_a_hint() {
    let mut sched = cpu_sched(WrrPolicy::Basic);
    let running = admit_queued(&mut sched, 1, 10, None);
    assert_eq!(sched.pick_next(), Some(running));

    // 测试 1: 不如当前任务紧急，不抢占
    let lazy = admit_queued(&mut sched, 2, 20, None);
    sched.check_preempt(lazy).unwrap();
    assert!(!sched.need_resched());

    // 测试 2: 同优先级，不抢占
    let peer = admit_queued(&mut sched, 3, 10, None);
    sched.check_preempt(peer).unwrap();
    assert!(!sched.need_resched());

    // 测试 3: 更紧急，请求重新调度但当前任务不变
    let urgent = admit_queued(&mut sched, 4, 5, None);
    sched.check_preempt(urgent).unwrap();
    assert!(sched.test_and_clear_need_resched());
    assert!(!sched.need_resched());
    assert_eq!(sched.curr(), Some(running));
}

#[test]
fn invalid_input_is_rejected_without_mutation() {
    let mut sched = cpu_sched(WrrPolicy::Basic);
    let a = admit_queued(&mut sched, 1, 5, None);

    // 测试 1: 优先级越界
    assert_eq!(sched.admit_task(2, MAX_WRR_PRIO, None), Err(Errno::InvalidArgument));
    assert_eq!(sched.set_prio(a, MAX_WRR_PRIO), Err(Errno::InvalidArgument));
    assert_eq!(sched.entity(a).unwrap().prio(), 5);

    // 测试 2: 重复的 pid
    assert_eq!(sched.admit_task(1, 3, None), Err(Errno::FileExists));

    // 测试 3: 不存在的任务组
    assert_eq!(sched.admit_task(2, 3, Some(77)), Err(Errno::NoSuchFileOrDirectory));

    // 测试 4: 不存在的任务
    assert_eq!(sched.get_interval(None), Err(Errno::InvalidArgument));
    assert_eq!(sched.release_task(99), Err(Errno::NoSuchProcess));
    assert_eq!(sched.fork(99, 100), Err(Errno::NoSuchProcess));

    // 测试 5: 释放后的句柄失效
    sched.release_task(1).unwrap();
    assert_eq!(sched.get_interval(Some(a)), Err(Errno::InvalidArgument));
    assert_eq!(sched.enqueue(a, EnqueueFlags::empty()), Err(Errno::InvalidArgument));
    assert_eq!(sched.on_tick(a), Err(Errno::InvalidArgument));
    assert_eq!(sched.nr_running(), 0);
    assert!(sched.check_invariants());
}

#[test]
fn entity_arena_is_bounded() {
    let mut tunables = tunables();
    tunables.max_entities = 2;
    let mut sched =
        CpuSched::new(0, WrrPolicy::Basic, &tunables, Arc::new(AllForeground)).unwrap();

    sched.admit_task(1, 5, None).unwrap();
    sched.admit_task(2, 5, None).unwrap();
    assert_eq!(sched.admit_task(3, 5, None), Err(Errno::OutOfMemory));

    sched.release_task(1).unwrap();
    assert!(sched.admit_task(3, 5, None).is_ok());
}
