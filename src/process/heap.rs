//! Process heap: the arena-style region backing a process's term graph and
//! call stack (spec §4.A).
//!
//! The original C heap packs terms and stack frames into one flat memory
//! region with two ends growing toward each other, and a copying collector
//! that relocates boxed terms when `ensure_free` can't find room. Root
//! scanning and the relocating collector itself are explicitly out of
//! scope for this crate (spec §1 lists "garbage collector primitives
//! (heap allocation/resize, root scanning)" among the external
//! collaborators) — `Term` values here are owned Rust values
//! (`Vec`/`Box`-backed), so there is nothing for a relocating pass to fix up
//! and no stale pointer a missed root could leave dangling. What this type
//! keeps faithful to the spec is the *contract*: word-accounted capacity,
//! growth-or-fail behavior, and the stack/heap split needed by
//! `process_info(heap_size | stack_size | memory)`.
//!
//! Grounded on `ream::runtime::memory::MemoryRegion`'s bump-arena shape
//! (allocate, reset, track `allocated_bytes`), generalized from byte
//! counting to word counting and given the two-end heap/stack split this
//! spec's single-process heap needs that `ream`'s pooled regions don't.

use crate::error::{CoreError, CoreResult};
use crate::term::Term;

/// Default stack size at construction, in words — mirrors
/// `DEFAULT_STACK_SIZE` in context.c.
pub const DEFAULT_STACK_WORDS: usize = 8;

/// Tunable knobs for a process heap, generalizing `ream::types::ReamConfig`'s
/// global `gc_threshold` down to a per-process budget.
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Words reserved for the stack at construction time.
    pub stack_words: usize,
    /// Initial term-heap capacity, in words.
    pub initial_heap_words: usize,
    /// Multiplier applied to capacity each time `ensure_free` must grow.
    pub growth_factor: f64,
    /// Hard ceiling on combined heap+stack words, if any. `None` means
    /// "grow until the host allocator itself fails", which this crate
    /// cannot observe directly and so never happens in-process.
    pub max_heap_words: Option<usize>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            stack_words: DEFAULT_STACK_WORDS,
            initial_heap_words: 16,
            growth_factor: 2.0,
            max_heap_words: None,
        }
    }
}

/// Introspection counters, analogous to `ream::runtime::memory::GcStats`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapStats {
    pub collections: u64,
    pub growths: u64,
}

/// A process's private heap+stack region. Only the owning process mutates
/// this; other processes allocate into their *own* heap when constructing a
/// message to send (spec §3 invariant).
#[derive(Debug)]
pub struct ProcessHeap {
    config: HeapConfig,
    capacity_words: usize,
    used_words: usize,
    stack: Vec<Term>,
    stats: HeapStats,
}

impl ProcessHeap {
    /// `init(stack_size)` from spec §4.A, generalized to take the full
    /// config rather than just the stack size.
    pub fn init(config: HeapConfig) -> Self {
        let capacity_words = config.initial_heap_words + config.stack_words;
        ProcessHeap {
            capacity_words,
            used_words: 0,
            stack: Vec::with_capacity(config.stack_words),
            config,
            stats: HeapStats::default(),
        }
    }

    fn free_words(&self) -> usize {
        self.capacity_words.saturating_sub(self.used_words)
    }

    /// Guarantee at least `words` of free capacity, growing (and counting a
    /// simulated collection pass) if necessary. Returns `CoreError::OutOfMemory`
    /// only once `max_heap_words` would be exceeded.
    pub fn ensure_free(&mut self, words: usize) -> CoreResult<()> {
        if self.free_words() >= words {
            return Ok(());
        }
        self.stats.collections += 1;

        let needed = self.used_words + words;
        let mut candidate = self.capacity_words.max(1);
        while candidate < needed {
            candidate = ((candidate as f64) * self.config.growth_factor).ceil() as usize;
        }

        if let Some(max) = self.config.max_heap_words {
            if candidate > max {
                tracing::warn!(needed, max, "heap growth would exceed configured ceiling");
                return Err(CoreError::OutOfMemory);
            }
        }

        self.stats.growths += 1;
        self.capacity_words = candidate;
        Ok(())
    }

    /// Commit `words` of heap space without constructing a term for them
    /// yet (spec's bare `allocate(words)`).
    pub fn allocate(&mut self, words: usize) -> CoreResult<()> {
        self.ensure_free(words)?;
        self.used_words += words;
        Ok(())
    }

    /// Allocate a tuple of the given elements on this heap.
    pub fn allocate_tuple(&mut self, elems: Vec<Term>) -> CoreResult<Term> {
        let term = Term::Tuple(elems);
        self.allocate(term.word_size())?;
        Ok(term)
    }

    /// Allocate a reference term carrying the given ref-ticks.
    pub fn allocate_ref(&mut self, ticks: u64) -> CoreResult<Term> {
        self.allocate(1)?;
        Ok(Term::Ref(ticks))
    }

    /// Push a value onto the call stack (the high end of the region).
    pub fn push_stack(&mut self, term: Term) -> CoreResult<()> {
        self.allocate(1)?;
        self.stack.push(term);
        Ok(())
    }

    pub fn pop_stack(&mut self) -> Option<Term> {
        if let Some(term) = self.stack.pop() {
            self.used_words = self.used_words.saturating_sub(1);
            Some(term)
        } else {
            None
        }
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Words used by the stack half of the region.
    pub fn stack_words(&self) -> usize {
        self.stack.len()
    }

    /// Words used by the term half of the region — `size_in_words()` minus
    /// the stack, matching `heap_size` in `process_get_process_info`.
    pub fn heap_words(&self) -> usize {
        self.used_words.saturating_sub(self.stack.len())
    }

    /// `size_in_words()` from spec §4.A: combined heap+stack usage.
    pub fn size_in_words(&self) -> usize {
        self.used_words
    }

    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    /// `destroy()` from spec §4.A. Explicit for symmetry with the C API;
    /// in Rust this is just drop, but tracing the event matches the rest
    /// of the teardown path's observability.
    pub fn destroy(self) {
        tracing::debug!(words = self.used_words, "process heap destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_free_grows_capacity_without_losing_existing_usage() {
        let mut heap = ProcessHeap::init(HeapConfig {
            initial_heap_words: 2,
            stack_words: 0,
            ..Default::default()
        });
        heap.allocate(2).unwrap();
        assert_eq!(heap.size_in_words(), 2);
        heap.ensure_free(10).unwrap();
        assert!(heap.free_words() >= 10);
        assert_eq!(heap.size_in_words(), 2);
    }

    #[test]
    fn allocation_fails_past_configured_ceiling() {
        let mut heap = ProcessHeap::init(HeapConfig {
            initial_heap_words: 2,
            stack_words: 0,
            max_heap_words: Some(4),
            ..Default::default()
        });
        assert!(heap.allocate(4).is_ok());
        assert_eq!(heap.allocate(100), Err(CoreError::OutOfMemory));
    }

    /// S5 — process_size(memory) is monotonic under allocation.
    #[test]
    fn size_in_words_is_monotonic_under_allocation() {
        let mut heap = ProcessHeap::init(HeapConfig::default());
        let before = heap.size_in_words();
        heap.allocate(128).unwrap();
        let after = heap.size_in_words();
        assert!(after >= before + 128);
    }

    #[test]
    fn stack_and_heap_words_partition_total_usage() {
        let mut heap = ProcessHeap::init(HeapConfig::default());
        heap.allocate(5).unwrap();
        heap.push_stack(Term::SmallInt(1)).unwrap();
        heap.push_stack(Term::SmallInt(2)).unwrap();
        assert_eq!(heap.stack_words(), 2);
        assert_eq!(heap.heap_words(), 5);
        assert_eq!(heap.size_in_words(), heap.heap_words() + heap.stack_words());
    }

    #[test]
    fn pop_stack_reclaims_word_accounting() {
        let mut heap = ProcessHeap::init(HeapConfig::default());
        heap.push_stack(Term::SmallInt(7)).unwrap();
        assert_eq!(heap.stack_words(), 1);
        assert_eq!(heap.pop_stack(), Some(Term::SmallInt(7)));
        assert_eq!(heap.stack_words(), 0);
        assert_eq!(heap.size_in_words(), 0);
    }
}
