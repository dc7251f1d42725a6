use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::types::{DictMode, HitFormat, HitlessMode};

/// Tokenizer settings consumed, not owned (§6): the tokenizer itself lives outside this
/// engine's scope, but the hit builder and dictionary need to know a few of its knobs
/// (UTF-8 mode affects infix edit-coding granularity, §4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerSettings {
    pub min_word_len: usize,
    pub max_word_len: usize,
    pub utf8_mode: bool,
    pub ngram_len: usize,
    pub exceptions_file: Option<PathBuf>,
    pub blend_chars: String,
    pub boundary_chars: String,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        TokenizerSettings {
            min_word_len: 1,
            max_word_len: crate::core::types::MAX_KEYWORD_BYTES,
            utf8_mode: true,
            ngram_len: 0,
            exceptions_file: None,
            blend_chars: String::new(),
            boundary_chars: String::new(),
        }
    }
}

/// Dictionary settings consumed, not owned (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionarySettings {
    pub dict_mode: DictMode,
    pub morphology: Option<String>,
    pub stopwords_file: Option<PathBuf>,
    pub wordforms_file: Option<PathBuf>,
}

impl Default for DictionarySettings {
    fn default() -> Self {
        DictionarySettings {
            dict_mode: DictMode::Crc,
            morphology: None,
            stopwords_file: None,
            wordforms_file: None,
        }
    }
}

/// Index settings consumed, not owned (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    pub min_prefix_len: usize,
    pub min_infix_len: usize,
    pub max_substring_len: usize,
    pub hit_format: HitFormat,
    pub hitless_mode: HitlessMode,
    pub bigram_index: bool,
    pub field_length_index: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            min_prefix_len: 0,
            min_infix_len: 0,
            max_substring_len: 6,
            hit_format: HitFormat::Inline,
            hitless_mode: HitlessMode::None,
            bigram_index: false,
            field_length_index: false,
        }
    }
}

/// I/O throttle knobs (§4/§5): max IOPS and max chunk size for reads/writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThrottleSettings {
    pub max_iops: i32,
    pub max_io_size: i32,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        ThrottleSettings { max_iops: 0, max_io_size: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage_path: PathBuf,
    pub memory_limit: usize,
    pub arena_bytes: usize,
    pub tokenizer: TokenizerSettings,
    pub dictionary: DictionarySettings,
    pub index: IndexSettings,
    pub throttle: ThrottleSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            memory_limit: 100 * 1024 * 1024,
            arena_bytes: 64 * 1024 * 1024,
            tokenizer: TokenizerSettings::default(),
            dictionary: DictionarySettings::default(),
            index: IndexSettings::default(),
            throttle: ThrottleSettings::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> crate::core::error::Result<Config> {
        serde_json::from_str(s)
            .map_err(|e| crate::core::error::Error::new(crate::core::error::ErrorKind::ParseError, e.to_string()))
    }
}
