//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 简单的集合类型实现
//!
//! `Slab` 是一个容量有上限的槽位数组：
//! - 槽位在创建时一次性预留，插入/删除不会触发重新分配
//! - 句柄 (`SlabKey`) 在元素存活期间保持稳定，释放后槽位可复用
//! - 槽位用完时返回 ENOMEM，而不是扩容

use alloc::vec::Vec;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

use crate::errno::Errno;

/// Slab 句柄
pub trait SlabKey: Copy {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

enum Slot<T> {
    Occupied(T),
    /// 空闲槽位，保存下一个空闲槽位的下标
    Vacant(Option<usize>),
}

pub struct Slab<K, T> {
    slots: Vec<Slot<T>>,
    /// 空闲链表头
    free_head: Option<usize>,
    len: usize,
    limit: usize,
    _key: PhantomData<K>,
}

impl<K: SlabKey, T> Slab<K, T> {
    /// 创建一个最多容纳 `limit` 个元素的 Slab
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::with_capacity(limit),
            free_head: None,
            len: 0,
            limit,
            _key: PhantomData,
        }
    }

    /// 返回当前元素数量
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 剩余可用槽位
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.len
    }

    /// 插入一个值，返回它的句柄
    pub fn insert(&mut self, value: T) -> Result<K, Errno> {
        if let Some(index) = self.free_head {
            let next_free = match self.slots[index] {
                Slot::Vacant(next) => next,
                Slot::Occupied(_) => return Err(Errno::OutOfMemory),
            };
            self.slots[index] = Slot::Occupied(value);
            self.free_head = next_free;
            self.len += 1;
            return Ok(K::from_index(index));
        }

        if self.slots.len() >= self.limit {
            return Err(Errno::OutOfMemory);
        }

        let index = self.slots.len();
        self.slots.push(Slot::Occupied(value));
        self.len += 1;
        Ok(K::from_index(index))
    }

    /// 删除并返回句柄对应的值
    pub fn remove(&mut self, key: K) -> Option<T> {
        let index = key.index();
        match self.slots.get(index) {
            Some(Slot::Occupied(_)) => {}
            _ => return None,
        }

        let slot = core::mem::replace(&mut self.slots[index], Slot::Vacant(self.free_head));
        self.free_head = Some(index);
        self.len -= 1;
        match slot {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant(_) => None,
        }
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        matches!(self.slots.get(key.index()), Some(Slot::Occupied(_)))
    }

    pub fn get(&self, key: K) -> Option<&T> {
        match self.slots.get(key.index()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        match self.slots.get_mut(key.index()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// 遍历所有存活元素
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(value) => Some((K::from_index(i), value)),
            Slot::Vacant(_) => None,
        })
    }
}

impl<K: SlabKey, T> Index<K> for Slab<K, T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        match self.get(key) {
            Some(value) => value,
            None => panic!("slab: stale handle {}", key.index()),
        }
    }
}

impl<K: SlabKey, T> IndexMut<K> for Slab<K, T> {
    fn index_mut(&mut self, key: K) -> &mut T {
        let index = key.index();
        match self.get_mut(key) {
            Some(value) => value,
            None => panic!("slab: stale handle {}", index),
        }
    }
}
