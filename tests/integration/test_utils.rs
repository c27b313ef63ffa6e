//! Test utilities for integration tests.
//!
//! Synthesizes classic TIFF/GeoTIFF files in either byte order, encodes
//! tiles with every supported codec, and serves files over a local HTTP
//! server that honours `Range` requests.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use flate2::write::ZlibEncoder;
use tokio::sync::RwLock;

use cog_stream::error::IoError;
use cog_stream::io::RangeReader;

/// Route `tracing` output to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// An in-memory reader that records every request.
pub struct TrackingMockReader {
    data: Bytes,
    request_count: Arc<AtomicUsize>,
    requests: Arc<RwLock<Vec<(u64, usize)>>>,
}

impl TrackingMockReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<(u64, usize)> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl RangeReader for TrackingMockReader {
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push((offset, len));

        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data.slice(start..end))
    }

    async fn size(&self) -> Result<u64, IoError> {
        Ok(self.data.len() as u64)
    }

    fn identifier(&self) -> &str {
        "mock://tracking"
    }
}

// =============================================================================
// TIFF Builder
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    fn u32(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    fn f64(self, value: f64) -> [u8; 8] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }
}

/// A typed tag value, encoded in the file's byte order at build time.
#[derive(Debug, Clone)]
pub enum Value {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
    Ascii(String),
}

impl Value {
    fn field_type(&self) -> u16 {
        match self {
            Value::Short(_) => 3,
            Value::Long(_) => 4,
            Value::Double(_) => 12,
            Value::Ascii(_) => 2,
        }
    }

    fn encode(&self, endian: Endian) -> (u32, Vec<u8>) {
        match self {
            Value::Short(v) => (v.len() as u32, v.iter().flat_map(|x| endian.u16(*x)).collect()),
            Value::Long(v) => (v.len() as u32, v.iter().flat_map(|x| endian.u32(*x)).collect()),
            Value::Double(v) => (v.len() as u32, v.iter().flat_map(|x| endian.f64(*x)).collect()),
            Value::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                (bytes.len() as u32, bytes)
            }
        }
    }
}

/// One IFD: tags plus the (already encoded) tile payloads.
#[derive(Debug, Clone, Default)]
pub struct IfdSpec {
    entries: Vec<(u16, Value)>,
    tiles: Vec<Vec<u8>>,
}

impl IfdSpec {
    /// A tiled single-band IFD with the structural tags filled in.
    pub fn tiled(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        bits: u16,
        compression: u16,
        tiles: Vec<Vec<u8>>,
    ) -> Self {
        let mut ifd = Self {
            entries: Vec::new(),
            tiles,
        };
        ifd.set(256, Value::Long(vec![width]))
            .set(257, Value::Long(vec![height]))
            .set(258, Value::Short(vec![bits]))
            .set(259, Value::Short(vec![compression]))
            .set(262, Value::Short(vec![1]))
            .set(277, Value::Short(vec![1]))
            .set(322, Value::Short(vec![tile_width as u16]))
            .set(323, Value::Short(vec![tile_height as u16]));
        ifd
    }

    /// Set a tag, replacing any earlier value.
    pub fn set(&mut self, tag: u16, value: Value) -> &mut Self {
        self.remove(tag);
        self.entries.push((tag, value));
        self
    }

    pub fn remove(&mut self, tag: u16) -> &mut Self {
        self.entries.retain(|(t, _)| *t != tag);
        self
    }

    pub fn signed(&mut self) -> &mut Self {
        self.set(339, Value::Short(vec![2]))
    }

    pub fn predictor(&mut self) -> &mut Self {
        self.set(317, Value::Short(vec![2]))
    }

    /// Pixel scale, tiepoint and nodata.
    pub fn georeference(&mut self, scale: [f64; 3], tiepoint: [f64; 6], nodata: &str) -> &mut Self {
        self.set(33550, Value::Double(scale.to_vec()))
            .set(33922, Value::Double(tiepoint.to_vec()))
            .set(42113, Value::Ascii(nodata.to_string()))
    }

    /// A GeoKey directory declaring an EPSG projected CRS, plus parameter arrays.
    pub fn epsg(&mut self, code: u16) -> &mut Self {
        self.set(
            34735,
            Value::Short(vec![1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, code]),
        )
        .set(34736, Value::Double(vec![0.0]))
        .set(34737, Value::Ascii("WGS 84 / UTM|".to_string()))
    }
}

/// Assembles a classic TIFF from IFD specs.
///
/// Layout per IFD: the directory itself, then its out-of-line values, then
/// its tiles. `TileOffsets` and `TileByteCounts` are generated.
pub struct TiffBuilder {
    endian: Endian,
    ifds: Vec<IfdSpec>,
}

impl TiffBuilder {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            ifds: Vec::new(),
        }
    }

    pub fn ifd(mut self, ifd: IfdSpec) -> Self {
        self.ifds.push(ifd);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let e = self.endian;
        let mut data = Vec::new();
        data.extend_from_slice(match e {
            Endian::Little => b"II",
            Endian::Big => b"MM",
        });
        data.extend_from_slice(&e.u16(42));
        let mut next_pointer = data.len();
        data.extend_from_slice(&[0; 4]);

        for ifd in &self.ifds {
            if data.len() % 2 == 1 {
                data.push(0);
            }
            let ifd_offset = data.len() as u32;
            data[next_pointer..next_pointer + 4].copy_from_slice(&e.u32(ifd_offset));

            let mut entries = ifd.entries.clone();
            if !ifd.tiles.is_empty() {
                let counts = ifd.tiles.iter().map(|t| t.len() as u32).collect();
                entries.push((324, Value::Long(vec![0; ifd.tiles.len()])));
                entries.push((325, Value::Long(counts)));
            }
            entries.sort_by_key(|(tag, _)| *tag);

            // Place out-of-line values, then tiles, to learn every offset
            let mut cursor = ifd_offset as usize + 2 + entries.len() * 12 + 4;
            let mut value_offsets = Vec::with_capacity(entries.len());
            for (_, value) in &entries {
                let (_, bytes) = value.encode(e);
                if bytes.len() > 4 {
                    cursor += cursor % 2;
                    value_offsets.push(Some(cursor as u32));
                    cursor += bytes.len();
                } else {
                    value_offsets.push(None);
                }
            }
            let mut tile_offsets = Vec::with_capacity(ifd.tiles.len());
            for tile in &ifd.tiles {
                tile_offsets.push(cursor as u32);
                cursor += tile.len();
            }
            for (tag, value) in entries.iter_mut() {
                if *tag == 324 {
                    *value = Value::Long(tile_offsets.clone());
                }
            }

            data.extend_from_slice(&e.u16(entries.len() as u16));
            for ((tag, value), offset) in entries.iter().zip(&value_offsets) {
                let (count, bytes) = value.encode(e);
                data.extend_from_slice(&e.u16(*tag));
                data.extend_from_slice(&e.u16(value.field_type()));
                data.extend_from_slice(&e.u32(count));
                match offset {
                    Some(offset) => data.extend_from_slice(&e.u32(*offset)),
                    None => {
                        let mut field = [0u8; 4];
                        field[..bytes.len()].copy_from_slice(&bytes);
                        data.extend_from_slice(&field);
                    }
                }
            }
            next_pointer = data.len();
            data.extend_from_slice(&[0; 4]);

            for ((_, value), offset) in entries.iter().zip(&value_offsets) {
                if let Some(offset) = offset {
                    data.resize(*offset as usize, 0);
                    data.extend_from_slice(&value.encode(e).1);
                }
            }
            for (tile, offset) in ifd.tiles.iter().zip(&tile_offsets) {
                data.resize(*offset as usize, 0);
                data.extend_from_slice(tile);
            }
        }

        data
    }
}

// =============================================================================
// Pixel and Tile Helpers
// =============================================================================

/// Cut a row-major image into full-size tiles, padding edges with zeros.
pub fn split_tiles(
    image: &[u8],
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    bytes_per_sample: usize,
) -> Vec<Vec<u8>> {
    let across = width.div_ceil(tile_width);
    let down = height.div_ceil(tile_height);
    let row_bytes = tile_width as usize * bytes_per_sample;
    let mut tiles = Vec::new();

    for ty in 0..down {
        for tx in 0..across {
            let mut tile = vec![0u8; row_bytes * tile_height as usize];
            for row in 0..tile_height {
                let y = ty * tile_height + row;
                if y >= height {
                    break;
                }
                let x0 = tx * tile_width;
                let copy = (width - x0).min(tile_width) as usize * bytes_per_sample;
                let src = (y as usize * width as usize + x0 as usize) * bytes_per_sample;
                let dst = row as usize * row_bytes;
                tile[dst..dst + copy].copy_from_slice(&image[src..src + copy]);
            }
            tiles.push(tile);
        }
    }
    tiles
}

/// A `width` x `height` 8-bit image from a pixel function.
pub fn image_u8(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            out.push(f(x, y));
        }
    }
    out
}

/// A 16-bit image from a pixel function, stored in `endian`.
pub fn image_u16(width: u32, height: u32, endian: Endian, f: impl Fn(u32, u32) -> u16) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height * 2) as usize);
    for y in 0..height {
        for x in 0..width {
            out.extend_from_slice(&endian.u16(f(x, y)));
        }
    }
    out
}

/// Apply horizontal differencing to every row of an 8-bit tile.
pub fn difference_u8(tile: &mut [u8], tile_width: usize) {
    for row in tile.chunks_exact_mut(tile_width) {
        for i in (1..row.len()).rev() {
            row[i] = row[i].wrapping_sub(row[i - 1]);
        }
    }
}

/// Apply horizontal differencing to every row of a 16-bit tile.
pub fn difference_u16(tile: &mut [u8], tile_width: usize, endian: Endian) {
    let read = |b: &[u8]| match endian {
        Endian::Little => u16::from_le_bytes([b[0], b[1]]),
        Endian::Big => u16::from_be_bytes([b[0], b[1]]),
    };
    for row in tile.chunks_exact_mut(tile_width * 2) {
        for i in (1..row.len() / 2).rev() {
            let diff = read(&row[i * 2..]).wrapping_sub(read(&row[(i - 1) * 2..]));
            row[i * 2..i * 2 + 2].copy_from_slice(&endian.u16(diff));
        }
    }
}

pub fn lzw_encode(data: &[u8]) -> Vec<u8> {
    weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .encode(data)
        .unwrap()
}

pub fn deflate_encode(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// PackBits with repeat runs for three or more equal bytes, literals otherwise.
pub fn packbits_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut literal: Vec<u8> = Vec::new();
    let mut i = 0;

    let flush = |literal: &mut Vec<u8>, out: &mut Vec<u8>| {
        for chunk in literal.chunks(128) {
            out.push((chunk.len() - 1) as u8);
            out.extend_from_slice(chunk);
        }
        literal.clear();
    };

    while i < data.len() {
        let mut run = 1;
        while i + run < data.len() && data[i + run] == data[i] && run < 128 {
            run += 1;
        }
        if run >= 3 {
            flush(&mut literal, &mut out);
            out.push((1 - run as i16) as i8 as u8);
            out.push(data[i]);
            i += run;
        } else {
            literal.push(data[i]);
            i += 1;
        }
    }
    flush(&mut literal, &mut out);
    out
}

// =============================================================================
// Local Range Server
// =============================================================================

#[derive(Clone)]
struct ServedFile(Bytes);

/// Serve `data` at `/file.tif` (honours `Range`), `/full.tif` (ignores it);
/// every other path is 404. Returns the base URL.
pub async fn spawn_range_server(data: Vec<u8>) -> String {
    let app = Router::new()
        .route("/file.tif", get(ranged).head(head))
        .route("/full.tif", get(full))
        .route("/status/{code}", get(status))
        .with_state(ServedFile(Bytes::from(data)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn parse_range(headers: &HeaderMap) -> Option<(u64, u64)> {
    let value = headers.get(RANGE)?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn ranged(State(file): State<ServedFile>, headers: HeaderMap) -> Response {
    let size = file.0.len() as u64;
    let Some((start, end)) = parse_range(&headers) else {
        return (StatusCode::OK, file.0.clone()).into_response();
    };
    if start >= size {
        return StatusCode::RANGE_NOT_SATISFIABLE.into_response();
    }
    let end = end.min(size - 1);
    let body = file.0.slice(start as usize..=end as usize);
    (
        StatusCode::PARTIAL_CONTENT,
        [(CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, size))],
        body,
    )
        .into_response()
}

async fn head(State(file): State<ServedFile>) -> Response {
    (StatusCode::OK, [(CONTENT_LENGTH, file.0.len().to_string())]).into_response()
}

async fn full(State(file): State<ServedFile>) -> Response {
    (StatusCode::OK, file.0.clone()).into_response()
}

async fn status(Path(code): Path<u16>) -> Response {
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}
