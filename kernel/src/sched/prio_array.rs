//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! WRR 优先级数组
//!
//! 对应 Linux 的 struct rt_prio_array (kernel/sched/sched.h)：
//! 一个位图加上每个优先级一条 FIFO 链表。
//!
//! 不变式：任意优先级 p，bitmap[p] 置位 ⇔ queue[p] 非空。
//! 检测到不一致时记录 warn 日志并就地修正，不向上传播。

use log::warn;

use super::bitmap::PrioBitmap;
use super::entity::{EntityId, WrrEntity};
use super::MAX_WRR_PRIO;
use crate::collection::Slab;
use crate::errno::Errno;
use crate::list::{ListHead, Iter};

type Entities = Slab<EntityId, WrrEntity>;

pub struct WrrPrioArray {
    bitmap: PrioBitmap,
    queue: [ListHead<EntityId>; MAX_WRR_PRIO],
}

impl Default for WrrPrioArray {
    fn default() -> Self {
        Self::new()
    }
}

impl WrrPrioArray {
    pub const fn new() -> Self {
        Self {
            bitmap: PrioBitmap::new(),
            queue: [ListHead::new(); MAX_WRR_PRIO],
        }
    }

    /// 把实体挂到 queue[prio] 的头部或尾部，并置位
    pub fn insert(&mut self, entities: &mut Entities, se: EntityId, prio: usize, head: bool) {
        let queue = &mut self.queue[prio];
        if head {
            queue.add(entities, se);
        } else {
            queue.add_tail(entities, se);
        }
        self.bitmap.set(prio);
    }

    /// 把实体从 queue[prio] 摘下，链表变空时清位
    ///
    /// 实体不在该链表上时返回 EINVAL，数组保持不变
    pub fn remove(&mut self, entities: &mut Entities, se: EntityId, prio: usize) -> Result<(), Errno> {
        if prio >= MAX_WRR_PRIO {
            return Err(Errno::InvalidArgument);
        }
        let queue = &mut self.queue[prio];
        if !queue.del(entities, se) {
            self.sync_bit(prio);
            return Err(Errno::InvalidArgument);
        }
        if queue.is_empty() {
            self.bitmap.clear(prio);
        } else if !self.bitmap.test(prio) {
            warn!("wrr: prio {} queue non-empty but bit clear, fixing", prio);
            self.bitmap.set(prio);
        }
        Ok(())
    }

    /// 在同一级链表内移动实体，不改变优先级 (list_move / list_move_tail)
    pub fn requeue(&mut self, entities: &mut Entities, se: EntityId, prio: usize, head: bool) -> bool {
        if prio >= MAX_WRR_PRIO {
            return false;
        }
        let queue = &mut self.queue[prio];
        if head {
            queue.move_head(entities, se)
        } else {
            queue.move_tail(entities, se)
        }
    }

    /// 最紧急的非空优先级
    #[inline]
    pub fn first_active(&self) -> Option<usize> {
        self.bitmap.find_first()
    }

    /// 最不紧急的非空优先级
    #[inline]
    pub fn last_active(&self) -> Option<usize> {
        self.bitmap.find_last()
    }

    /// 最紧急优先级队列的队头
    ///
    /// 位图和链表不一致时（位置位但链表为空）清掉该位后继续查找
    pub fn peek_highest(&mut self) -> Option<EntityId> {
        while let Some(idx) = self.bitmap.find_first() {
            if let Some(se) = self.queue[idx].first() {
                return Some(se);
            }
            warn!("wrr: bitmap bit {} set on empty queue, clearing", idx);
            self.bitmap.clear(idx);
        }
        None
    }

    /// queue[prio] 的队头
    #[inline]
    pub fn first(&self, prio: usize) -> Option<EntityId> {
        self.queue.get(prio).and_then(|q| q.first())
    }

    /// 实体是否是 queue[prio] 中唯一的节点
    #[inline]
    pub fn is_singular(&self, prio: usize) -> bool {
        self.queue.get(prio).is_some_and(|q| q.is_singular())
    }

    #[inline]
    pub fn test_bit(&self, prio: usize) -> bool {
        self.bitmap.test(prio)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    #[inline]
    pub fn len(&self, prio: usize) -> usize {
        self.queue.get(prio).map_or(0, |q| q.len())
    }

    pub fn iter<'a>(&self, entities: &'a Entities, prio: usize) -> Iter<'a, EntityId, Entities> {
        self.queue[prio].iter(entities)
    }

    pub fn bitmap(&self) -> &PrioBitmap {
        &self.bitmap
    }

    /// 检查位图和链表是否一致
    pub fn is_consistent(&self) -> bool {
        (0..MAX_WRR_PRIO).all(|p| self.bitmap.test(p) == !self.queue[p].is_empty())
    }

    /// 按链表状态重建位图，返回修正的位数
    pub fn repair(&mut self) -> usize {
        let mut fixed = 0;
        for prio in 0..MAX_WRR_PRIO {
            if self.sync_bit(prio) {
                fixed += 1;
            }
        }
        fixed
    }

    fn sync_bit(&mut self, prio: usize) -> bool {
        let occupied = !self.queue[prio].is_empty();
        if self.bitmap.test(prio) == occupied {
            return false;
        }
        warn!(
            "wrr: bitmap/list mismatch at prio {} (queue {}), fixing",
            prio,
            if occupied { "non-empty" } else { "empty" }
        );
        if occupied {
            self.bitmap.set(prio);
        } else {
            self.bitmap.clear(prio);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::entity::RqId;
    use crate::collection::SlabKey;
    use alloc::vec::Vec;

    fn entities(n: usize) -> (Entities, Vec<EntityId>) {
        let mut slab = Slab::with_limit(n);
        let ids = (0..n)
            .map(|i| {
                slab.insert(WrrEntity::new_task(i as u32, 0, RqId::from_index(0), None))
                    .unwrap()
            })
            .collect();
        (slab, ids)
    }

    #[test]
    fn insert_sets_bit_and_remove_clears_it() {
        let (mut ents, ids) = entities(2);
        let mut array = WrrPrioArray::new();

        array.insert(&mut ents, ids[0], 5, false);
        array.insert(&mut ents, ids[1], 5, false);
        assert!(array.test_bit(5));
        assert_eq!(array.len(5), 2);

        array.remove(&mut ents, ids[0], 5).unwrap();
        assert!(array.test_bit(5));
        array.remove(&mut ents, ids[1], 5).unwrap();
        assert!(!array.test_bit(5));
        assert!(array.is_empty());
        assert!(array.is_consistent());
    }

    #[test]
    fn remove_absent_entity_is_reported() {
        let (mut ents, ids) = entities(2);
        let mut array = WrrPrioArray::new();
        array.insert(&mut ents, ids[0], 7, false);

        assert_eq!(array.remove(&mut ents, ids[1], 7), Err(Errno::InvalidArgument));
        assert_eq!(array.remove(&mut ents, ids[0], MAX_WRR_PRIO), Err(Errno::InvalidArgument));
        assert_eq!(array.len(7), 1);
        assert!(array.is_consistent());
    }

    #[test]
    fn head_insert_goes_first() {
        let (mut ents, ids) = entities(3);
        let mut array = WrrPrioArray::new();
        array.insert(&mut ents, ids[0], 3, false);
        array.insert(&mut ents, ids[1], 3, false);
        array.insert(&mut ents, ids[2], 3, true);

        let order: Vec<EntityId> = array.iter(&ents, 3).collect();
        assert_eq!(order, [ids[2], ids[0], ids[1]]);
        assert_eq!(array.peek_highest(), Some(ids[2]));
    }

    #[test]
    fn peek_highest_prefers_lowest_index() {
        let (mut ents, ids) = entities(2);
        let mut array = WrrPrioArray::new();
        array.insert(&mut ents, ids[0], 40, false);
        array.insert(&mut ents, ids[1], 2, false);
        assert_eq!(array.first_active(), Some(2));
        assert_eq!(array.last_active(), Some(40));
        assert_eq!(array.peek_highest(), Some(ids[1]));
    }

    #[test]
    fn requeue_moves_to_tail() {
        let (mut ents, ids) = entities(2);
        let mut array = WrrPrioArray::new();
        array.insert(&mut ents, ids[0], 1, false);
        array.insert(&mut ents, ids[1], 1, false);
        assert!(array.requeue(&mut ents, ids[0], 1, false));
        assert_eq!(array.first(1), Some(ids[1]));
    }

    #[test]
    fn stale_bit_is_repaired() {
        let (mut ents, ids) = entities(1);
        let mut array = WrrPrioArray::new();
        array.insert(&mut ents, ids[0], 9, false);
        // 人为制造不一致
        array.bitmap.set(4);
        assert!(!array.is_consistent());
        assert_eq!(array.peek_highest(), Some(ids[0]));
        assert!(array.is_consistent());

        array.bitmap.set(60);
        assert_eq!(array.repair(), 1);
        assert!(array.is_consistent());
    }
}
