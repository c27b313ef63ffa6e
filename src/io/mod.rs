mod http_reader;
mod memory_reader;
mod range_cache;
mod range_reader;

pub use http_reader::{range_header, HttpRangeReader};
pub use memory_reader::MemoryReader;
pub use range_cache::{RangeCache, DEFAULT_CHUNK_SIZE};
pub use range_reader::RangeReader;
