//! Versioned, chunked persistence for network images.
//!
//! A saved image is `MAGIC`, a version word, then tagged chunks. Chunk
//! payloads are raw LZ4 blocks prefixed with their uncompressed length.
//! Unknown chunks are skipped on load for forward-compatibility.

use std::io::{self, Read, Write};

pub const MAGIC: &[u8; 8] = b"GRIDBN01";
pub const VERSION_V1: u32 = 1;

pub fn compress_lz4(input: &[u8]) -> Vec<u8> {
    lz4_flex::compress(input)
}

pub fn decompress_lz4(input: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
    // Strict format: raw LZ4 block with external expected size.
    lz4_flex::decompress(input, expected_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "lz4 decompression failed"))
}

pub fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_u64_le<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_f64_le<W: Write>(w: &mut W, v: f64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())
}

pub fn read_exact<const N: usize, R: Read>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    Ok(read_exact::<1, _>(r)?[0])
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact::<4, _>(r)?))
}

pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    Ok(u64::from_le_bytes(read_exact::<8, _>(r)?))
}

pub fn read_f64_le<R: Read>(r: &mut R) -> io::Result<f64> {
    Ok(f64::from_le_bytes(read_exact::<8, _>(r)?))
}

pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let n = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid utf-8 string"))
}

/// Writes a tagged, LZ4-compressed chunk.
pub fn write_chunk_lz4<W: Write>(w: &mut W, tag: [u8; 4], payload: &[u8]) -> io::Result<()> {
    let compressed = compress_lz4(payload);
    w.write_all(&tag)?;
    write_u32_le(w, (compressed.len() + 4) as u32)?;
    write_u32_le(w, payload.len() as u32)?;
    w.write_all(&compressed)
}

/// Reads the next chunk header: `(tag, body_len)`.
pub fn read_chunk_header<R: Read>(r: &mut R) -> io::Result<([u8; 4], u32)> {
    let tag = read_exact::<4, _>(r)?;
    let len = read_u32_le(r)?;
    Ok((tag, len))
}

/// Reads and decompresses one chunk body of `len` bytes.
pub fn read_chunk_body_lz4<R: Read>(r: &mut R, len: u32) -> io::Result<Vec<u8>> {
    let mut take = r.take(len as u64);
    let uncompressed_len = read_u32_le(&mut take)? as usize;
    let mut compressed = Vec::with_capacity((len as usize).saturating_sub(4));
    take.read_to_end(&mut compressed)?;
    decompress_lz4(&compressed, uncompressed_len)
}

/// Discards one chunk body, for skipping unknown tags.
pub fn skip_chunk_body<R: Read>(r: &mut R, len: u32) -> io::Result<()> {
    io::copy(&mut r.take(len as u64), &mut io::sink())?;
    Ok(())
}
