use serde::{Deserialize, Serialize};

/// 64-bit document identifier, assigned by the ingestion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u64);

/// 64-bit keyword identifier. In CRC-dict mode this is `crc32(keyword) + k` for the
/// smallest non-colliding `k`; in keyword-dict mode the keyword string is the real key
/// and the word id is only used for in-memory hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WordId(pub u64);

/// Packed field index (high bits) + in-field position (low bits) of a hit.
/// `word_pos = 0` is the empty-hit sentinel. Bit 31 is `FIELDEND_MASK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WordPos(pub u32);

impl WordPos {
    pub const FIELDEND_MASK: u32 = 0x8000_0000;
    pub const FIELD_SHIFT: u32 = 24;
    pub const FIELD_MASK: u32 = 0x7F00_0000;
    pub const POS_MASK: u32 = 0x00FF_FFFF;
    pub const EMPTY: WordPos = WordPos(0);

    pub fn pack(field: u32, in_field_pos: u32) -> WordPos {
        WordPos(((field << Self::FIELD_SHIFT) & Self::FIELD_MASK) | (in_field_pos & Self::POS_MASK))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn position(self) -> u32 {
        self.0 & !Self::FIELDEND_MASK
    }

    pub fn field_index(self) -> u32 {
        (self.0 & Self::FIELD_MASK) >> Self::FIELD_SHIFT
    }

    pub fn in_field_pos(self) -> u32 {
        self.0 & Self::POS_MASK
    }

    pub fn is_field_end(self) -> bool {
        self.0 & Self::FIELDEND_MASK != 0
    }

    pub fn with_field_end(self) -> WordPos {
        WordPos(self.0 | Self::FIELDEND_MASK)
    }
}

/// A bitmask of the fields a word occurred in within one document, used for the
/// non-inlined doclist entry format (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMask(pub u32);

impl FieldMask {
    pub fn set(&mut self, field: u32) {
        self.0 |= 1 << field;
    }
}

/// One occurrence of a keyword in a document, as produced by the (out-of-scope)
/// ingestion/tokenization layer. Hits must arrive sorted by `(word_id, doc_id, word_pos)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub word_id: WordId,
    pub doc_id: DocId,
    pub word_pos: WordPos,
    pub field_mask: FieldMask,
}

impl Hit {
    /// The stream terminator recognized by the hit builder (§4.D input contract).
    pub fn sentinel() -> Hit {
        Hit {
            word_id: WordId(0),
            doc_id: DocId(0),
            word_pos: WordPos::EMPTY,
            field_mask: FieldMask::default(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.word_id.0 == 0 && self.word_pos.is_empty()
    }
}

/// Whether the dictionary keys on a CRC-derived word id or on the keyword string itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DictMode {
    Crc,
    Keywords,
}

/// Doclist hit-inlining strategy (§4.D, §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitFormat {
    Inline,
    Plain,
}

/// Per-word hit storage policy (§4.D "Hitless modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitlessMode {
    None,
    Some,
    All,
}

pub const SKIPLIST_BLOCK: u32 = 128;
pub const DICT_CHECKPOINT: u32 = 64;
pub const INFIX_BLOCK: usize = 64;
pub const MAX_KEYWORD_BYTES: usize = 128;
