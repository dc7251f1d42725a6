//! latticedex: an on-disk inverted-index engine — dictionary, doclist/hitlist/skiplist
//! hit storage, a tagged slab arena for shared in-memory updates, and the kill-list/IDF
//! machinery a query layer consults at search time.
//!
//! ```text
//! core     — error, config, shared value types (DocId, WordId, WordPos, ...)
//! io       — VLB/zint codec, CRC32, throttled reader/writer, mmap reader
//! memory   — tagged slab arena (component C)
//! index    — hit builder + skiplist (component D)
//! dict     — keyword dictionary, finalizer, infix trie, exceptions trie, reader (E-I)
//! search   — kill list, global IDF (component J)
//! storage  — on-disk file-set layout, header magic, new/cur/old rotation
//! ```

pub mod core;
pub mod dict;
pub mod index;
pub mod io;
pub mod memory;
pub mod search;
pub mod storage;
