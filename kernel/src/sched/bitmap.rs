//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 优先级位图
//!
//! 对应 Linux 的 DECLARE_BITMAP(bitmap, MAX_RT_PRIO+1) 以及
//! sched_find_first_bit() (include/asm-generic/bitops/sched.h)。
//! 每个优先级一位，置位表示该优先级的队列非空。

use super::MAX_WRR_PRIO;

const BITS_PER_WORD: usize = u64::BITS as usize;
const BITMAP_WORDS: usize = MAX_WRR_PRIO.div_ceil(BITS_PER_WORD);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrioBitmap {
    words: [u64; BITMAP_WORDS],
}

impl PrioBitmap {
    pub const fn new() -> Self {
        Self {
            words: [0; BITMAP_WORDS],
        }
    }

    /// __set_bit
    #[inline]
    pub fn set(&mut self, prio: usize) {
        debug_assert!(prio < MAX_WRR_PRIO);
        self.words[prio / BITS_PER_WORD] |= 1u64 << (prio % BITS_PER_WORD);
    }

    /// __clear_bit
    #[inline]
    pub fn clear(&mut self, prio: usize) {
        debug_assert!(prio < MAX_WRR_PRIO);
        self.words[prio / BITS_PER_WORD] &= !(1u64 << (prio % BITS_PER_WORD));
    }

    /// test_bit
    #[inline]
    pub fn test(&self, prio: usize) -> bool {
        prio < MAX_WRR_PRIO && self.words[prio / BITS_PER_WORD] & (1u64 << (prio % BITS_PER_WORD)) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// 最小的置位下标，即最紧急的非空优先级 (sched_find_first_bit)
    pub fn find_first(&self) -> Option<usize> {
        for (i, &word) in self.words.iter().enumerate() {
            if word != 0 {
                return Some(i * BITS_PER_WORD + word.trailing_zeros() as usize);
            }
        }
        None
    }

    /// 最大的置位下标，即最不紧急的非空优先级 (find_last_bit)
    pub fn find_last(&self) -> Option<usize> {
        for (i, &word) in self.words.iter().enumerate().rev() {
            if word != 0 {
                let top = BITS_PER_WORD - 1 - word.leading_zeros() as usize;
                return Some(i * BITS_PER_WORD + top);
            }
        }
        None
    }

    /// 置位个数
    pub fn weight(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
