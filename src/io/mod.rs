pub mod crc32;
pub mod reader;
pub mod throttle;
pub mod vlb;
pub mod writer;
