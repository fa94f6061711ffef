//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 双向链表实现
//!
//! 参考 Linux: include/linux/list.h
//!
//! 用途：
//! - 调度队列: wrr_prio_array::queue[prio]
//! - 叶子运行队列链表: rq::leaf_wrr_rq_list
//!
//! 设计特点：
//! - 节点链接 (`ListLink`) 直接嵌入数据结构中，和 list_head 一样是侵入式的
//! - 链接保存的是句柄而不是指针，节点本身存放在 `Slab` 中，
//!   不需要 container_of 反推宿主结构体
//! - 所有操作 O(1)，不分配内存

/// 嵌入在节点中的链接
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLink<K> {
    /// 前一个节点
    pub prev: Option<K>,
    /// 下一个节点
    pub next: Option<K>,
}

impl<K> ListLink<K> {
    pub const fn new() -> Self {
        Self { prev: None, next: None }
    }
}

impl<K> Default for ListLink<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// 节点存储
///
/// 链表本身只保存首尾句柄，节点的链接通过这个 trait 从存储中取出
pub trait ListNodes<K> {
    fn link(&self, key: K) -> &ListLink<K>;
    fn link_mut(&mut self, key: K) -> &mut ListLink<K>;
}

/// 链表头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHead<K> {
    first: Option<K>,
    last: Option<K>,
    len: usize,
}

impl<K> Default for ListHead<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ListHead<K> {
    /// 创建一个空链表
    pub const fn new() -> Self {
        Self {
            first: None,
            last: None,
            len: 0,
        }
    }

    /// 检查链表是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 链表中是否只有一个节点 (list_is_singular)
    #[inline]
    pub fn is_singular(&self) -> bool {
        self.len == 1
    }
}

impl<K: Copy + PartialEq> ListHead<K> {
    /// 获取第一个节点 (list_first_entry)
    #[inline]
    pub fn first(&self) -> Option<K> {
        self.first
    }

    #[inline]
    pub fn last(&self) -> Option<K> {
        self.last
    }

    /// 节点是否挂在本链表上
    ///
    /// O(1)：调用者保证一个节点同一时刻只挂在一个链表上
    pub fn is_linked<N: ListNodes<K>>(&self, nodes: &N, key: K) -> bool {
        nodes.link(key).prev.is_some() || self.first == Some(key)
    }

    /// 在链表头部插入节点 (list_add)
    pub fn add<N: ListNodes<K>>(&mut self, nodes: &mut N, key: K) {
        let old_first = self.first;
        {
            let link = nodes.link_mut(key);
            link.prev = None;
            link.next = old_first;
        }
        match old_first {
            Some(first) => nodes.link_mut(first).prev = Some(key),
            None => self.last = Some(key),
        }
        self.first = Some(key);
        self.len += 1;
    }

    /// 在链表尾部添加节点 (list_add_tail)
    pub fn add_tail<N: ListNodes<K>>(&mut self, nodes: &mut N, key: K) {
        let old_last = self.last;
        {
            let link = nodes.link_mut(key);
            link.prev = old_last;
            link.next = None;
        }
        match old_last {
            Some(last) => nodes.link_mut(last).next = Some(key),
            None => self.first = Some(key),
        }
        self.last = Some(key);
        self.len += 1;
    }

    /// 从链表中删除节点 (list_del_init)
    ///
    /// 节点不在链表上时返回 false，链表保持不变
    pub fn del<N: ListNodes<K>>(&mut self, nodes: &mut N, key: K) -> bool {
        if !self.is_linked(nodes, key) {
            return false;
        }

        let ListLink { prev, next } = *nodes.link(key);
        match prev {
            Some(p) => nodes.link_mut(p).next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => nodes.link_mut(n).prev = prev,
            None => self.last = prev,
        }

        *nodes.link_mut(key) = ListLink::new();
        self.len -= 1;
        true
    }

    /// 把节点移到链表头部 (list_move)
    pub fn move_head<N: ListNodes<K>>(&mut self, nodes: &mut N, key: K) -> bool {
        if !self.del(nodes, key) {
            return false;
        }
        self.add(nodes, key);
        true
    }

    /// 把节点移到链表尾部 (list_move_tail)
    pub fn move_tail<N: ListNodes<K>>(&mut self, nodes: &mut N, key: K) -> bool {
        if !self.del(nodes, key) {
            return false;
        }
        self.add_tail(nodes, key);
        true
    }

    /// 遍历链表
    pub fn iter<'a, N: ListNodes<K>>(&self, nodes: &'a N) -> Iter<'a, K, N> {
        Iter {
            nodes,
            pos: self.first,
            remaining: self.len,
        }
    }
}

/// 链表迭代器 (list_for_each)
pub struct Iter<'a, K, N> {
    nodes: &'a N,
    pos: Option<K>,
    /// 防止链接损坏时无限循环
    remaining: usize,
}

impl<'a, K: Copy, N: ListNodes<K>> Iterator for Iter<'a, K, N> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.pos?;
        self.remaining -= 1;
        self.pos = self.nodes.link(key).next;
        Some(key)
    }
}
