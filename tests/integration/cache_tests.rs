//! Chunk cache integration tests.
//!
//! Tests verify:
//! - Decoding through the cache issues only aligned chunk requests
//! - A second decode over the same cache fetches nothing
//! - The cache returns the same pixels as direct reads

use std::io::SeekFrom;
use std::sync::Arc;

use cog_stream::{cog, Cog, MemoryReader, RangeCache, RangeReader, Rect};

use super::test_utils::{
    deflate_encode, image_u8, init_tracing, split_tiles, Endian, IfdSpec, TiffBuilder,
    TrackingMockReader,
};

fn noisy(x: u32, y: u32) -> u8 {
    (x.wrapping_mul(2654435761) ^ y.wrapping_mul(40503)) as u8
}

/// A file large enough to span several 4000-byte chunks.
fn file() -> Vec<u8> {
    let image = image_u8(128, 128, noisy);
    let tiles = split_tiles(&image, 128, 128, 32, 32, 1)
        .iter()
        .map(|t| deflate_encode(t))
        .collect();
    TiffBuilder::new(Endian::Little)
        .ifd(IfdSpec::tiled(128, 128, 32, 32, 8, 8, tiles))
        .build()
}

#[tokio::test]
async fn test_requests_are_chunk_aligned() {
    init_tracing();
    let data = file();
    let total = data.len();
    let cache = RangeCache::new(TrackingMockReader::new(data));

    let raster = cog::decode(&cache).await.unwrap();
    assert_eq!(raster.bounds(), Rect::from_size(128, 128));

    let requests = cache.inner().get_requests().await;
    assert_eq!(requests.len(), cache.fetch_count());
    assert!(requests.len() <= total / 4000 + 1);
    for (offset, len) in requests {
        assert_eq!(offset % 4000, 0);
        assert_eq!(len, 4001);
    }
}

#[tokio::test]
async fn test_second_decode_hits_cache() {
    let cache = RangeCache::new(TrackingMockReader::new(file()));

    let first = cog::decode_level_window(&cache, 0, Rect::new(10, 10, 100, 70))
        .await
        .unwrap();
    let fetched = cache.fetch_count();

    let second = cog::decode_level_window(&cache, 0, Rect::new(10, 10, 100, 70))
        .await
        .unwrap();
    assert_eq!(cache.fetch_count(), fetched);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cache_matches_direct_reads() {
    let data = file();
    let direct = cog::decode(&MemoryReader::new(data.clone())).await.unwrap();
    let cached = cog::decode(&RangeCache::with_chunk_size(MemoryReader::new(data), 512))
        .await
        .unwrap();
    assert_eq!(direct, cached);
}

#[tokio::test]
async fn test_fewer_requests_than_uncached() {
    let data = file();

    let uncached = Cog::open(TrackingMockReader::new(data.clone())).await.unwrap();
    uncached.decode().await.unwrap();
    let direct_requests = uncached.reader().request_count();

    let cached = Cog::open(RangeCache::new(TrackingMockReader::new(data)))
        .await
        .unwrap();
    cached.decode().await.unwrap();

    assert!(cached.reader().fetch_count() < direct_requests);
}

#[tokio::test]
async fn test_shared_cache_across_tasks() {
    let cache = Arc::new(RangeCache::new(TrackingMockReader::new(file())));

    let mut handles = Vec::new();
    for i in 0..4u32 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let window = Rect::new(i * 32, 0, i * 32 + 32, 128);
            cog::decode_level_window(cache.as_ref(), 0, window).await
        }));
    }
    for handle in handles {
        let raster = handle.await.unwrap().unwrap();
        let buffer = raster.as_u8().unwrap();
        let b = buffer.bounds();
        assert_eq!(buffer.get(b.min_x + 5, 77), Some(noisy(b.min_x + 5, 77)));
    }

    let size = cache.size().await.unwrap() as usize;
    assert!(cache.cached_chunks().await <= size / 4000 + 1);
}

#[tokio::test]
async fn test_cursor_reads_header() {
    let mut cache = RangeCache::new(MemoryReader::new(file()));

    let mut magic = [0u8; 4];
    assert_eq!(cache.read(&mut magic).await.unwrap(), 4);
    assert_eq!(&magic, b"II\x2A\x00");

    let end = cache.seek(SeekFrom::End(-4)).await.unwrap();
    let mut tail = [0u8; 16];
    assert_eq!(cache.read(&mut tail).await.unwrap(), 4);
    assert_eq!(cache.position(), end + 4);
}
