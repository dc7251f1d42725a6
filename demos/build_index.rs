//! Builds a tiny single-word-per-doc index end to end: keyword dictionary, hit builder,
//! dictionary finalizer, and file-set rotation, then looks every keyword back up.

use std::collections::HashSet;

use latticedex::core::types::{DocId, HitFormat, HitlessMode, WordId, WordPos};
use latticedex::dict::finalizer::merge;
use latticedex::dict::keyword_dict::KeywordDict;
use latticedex::dict::reader::DictReader;
use latticedex::dict::scratch::{ScratchEntry, ScratchReader, ScratchWriter};
use latticedex::index::hit_builder::{HitBuilder, WordDoc};
use latticedex::storage::layout::{Lifecycle, StorageLayout};

fn main() -> latticedex::core::error::Result<()> {
    env_logger::init();

    let docs = [
        (1u64, vec!["the", "quick", "fox"]),
        (2u64, vec!["the", "lazy", "dog"]),
        (3u64, vec!["quick", "brown", "fox"]),
    ];

    let mut dict = KeywordDict::new();
    let mut per_word: std::collections::BTreeMap<u64, Vec<WordDoc>> = Default::default();
    for (doc_id, words) in &docs {
        for (pos, word) in words.iter().enumerate() {
            let word_id = dict.lookup_or_insert(word.as_bytes());
            let entry = per_word.entry(word_id.0).or_default();
            match entry.last_mut() {
                Some(wd) if wd.doc_id.0 == *doc_id => wd.hits.push(WordPos::pack(0, pos as u32)),
                _ => entry.push(WordDoc { doc_id: DocId(*doc_id), hits: vec![WordPos::pack(0, pos as u32)] }),
            }
        }
    }

    let mut builder = HitBuilder::new(HitFormat::Inline, HitlessMode::None, HashSet::new());
    for (word_id, word_docs) in &per_word {
        builder.write_word(WordId(*word_id), word_docs)?;
    }
    let hits = builder.finish()?;
    println!("doclist bytes: {}", hits.doclist.len());
    println!("hitlist bytes: {}", hits.hitlist.len());

    let tmp = tempfile::tempdir()?;
    let scratch_path = tmp.path().join("build.scratch");
    let mut sorted_words: Vec<_> = dict.entries().map(|(kw, id)| (kw.to_vec(), id)).collect();
    sorted_words.sort_by(|a, b| a.0.cmp(&b.0));

    let mut writer = ScratchWriter::create(&scratch_path)?;
    for (keyword, word_id) in &sorted_words {
        let queued = hits.dict_queue.iter().find(|e| e.word_id == *word_id).unwrap();
        writer.write_entry(&ScratchEntry {
            keyword: keyword.clone(),
            word_id: *word_id,
            doclist_offset: queued.doclist_offset,
            doc_count: queued.doc_count,
            hit_count: queued.hit_count,
            skiplist_offset: queued.skiplist_offset,
            hint: queued.hint,
        })?;
    }
    writer.finish()?;

    let layout = StorageLayout::new(tmp.path().join("index"), "demo")?;
    let spi_path = layout.path_for(Lifecycle::New, "spi");
    let finalized = merge(vec![ScratchReader::open(&scratch_path)?], &spi_path, true, None)?;
    layout.rotate()?;

    let reader =
        DictReader::open(layout.path_for(Lifecycle::Cur, "spi"), finalized.checkpoints, finalized.dict_len)?;
    for (keyword, _) in &sorted_words {
        let entry = reader.lookup(keyword)?.expect("keyword must be found after round trip");
        println!(
            "{:>8}: doc_count={} hit_count={}",
            String::from_utf8_lossy(keyword),
            entry.doc_count,
            entry.hit_count
        );
    }

    Ok(())
}
