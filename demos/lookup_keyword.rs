//! Exercises the tagged arena, the kill list and the global IDF table in isolation —
//! no full index build, just the three read/write paths a query-time component would
//! actually call.

use latticedex::core::types::WordId;
use latticedex::memory::arena::Arena;
use latticedex::search::global_idf::GlobalIdf;
use latticedex::search::kill_list::KillList;

fn main() -> latticedex::core::error::Result<()> {
    env_logger::init();

    let arena = Arena::init(1024 * 1024)?;
    let id = arena.tagged_alloc(1, 64)?;
    {
        let slot = arena.get(id);
        println!("fresh allocation, {} u32 words, first word = {}", slot.len(), slot[0]);
    }
    arena.tagged_free_tag(1);

    let kill_list = KillList::new();
    kill_list.add(latticedex::core::types::DocId(42));
    println!("doc 42 killed: {}", kill_list.contains(latticedex::core::types::DocId(42)));
    println!("doc 43 killed: {}", kill_list.contains(latticedex::core::types::DocId(43)));

    let tmp = tempfile::tempdir()?;
    let idf_path = tmp.path().join("demo.idf");
    let entries = vec![(WordId(1), 3u64), (WordId(2), 300)];
    std::fs::write(&idf_path, GlobalIdf::write(&entries))?;
    let idf = GlobalIdf::open(&idf_path, 1000)?;
    println!("idf(rare)   = {:.4}", idf.idf(WordId(1), true));
    println!("idf(common) = {:.4}", idf.idf(WordId(2), true));

    Ok(())
}
