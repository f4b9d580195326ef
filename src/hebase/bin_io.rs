//! Little-endian binary helpers shared by every `save`/`load` in the crate.

use std::io::{self, Read, Write};

use crate::error::{HeError, HeResult};

/// Upper bound on any length prefix read back from a stream. Guards against
/// allocating gigabytes when a corrupt stream is loaded.
pub const MAX_LENGTH: usize = 1 << 28;

pub fn write_i32<W: Write + ?Sized>(out: &mut W, value: i32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn write_u32<W: Write + ?Sized>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn write_u64<W: Write + ?Sized>(out: &mut W, value: u64) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn write_f64<W: Write + ?Sized>(out: &mut W, value: f64) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn write_bool<W: Write + ?Sized>(out: &mut W, value: bool) -> io::Result<()> {
    out.write_all(&[u8::from(value)])
}

/// Writes an `i32` byte length followed by the UTF-8 bytes.
pub fn write_string<W: Write + ?Sized>(out: &mut W, value: &str) -> HeResult<()> {
    write_len(out, value.len())?;
    out.write_all(value.as_bytes())?;
    Ok(())
}

pub fn write_len<W: Write + ?Sized>(out: &mut W, len: usize) -> HeResult<()> {
    let len = i32::try_from(len).map_err(|_| HeError::invalid(format!("length {len} too large")))?;
    write_i32(out, len)?;
    Ok(())
}

pub fn write_u64_slice<W: Write + ?Sized>(out: &mut W, values: &[u64]) -> HeResult<()> {
    write_len(out, values.len())?;
    for &v in values {
        write_u64(out, v)?;
    }
    Ok(())
}

pub fn write_f64_slice<W: Write + ?Sized>(out: &mut W, values: &[f64]) -> HeResult<()> {
    write_len(out, values.len())?;
    for &v in values {
        write_f64(out, v)?;
    }
    Ok(())
}

fn read_array<R: Read + ?Sized, const N: usize>(input: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_i32<R: Read + ?Sized>(input: &mut R) -> io::Result<i32> {
    read_array(input).map(i32::from_le_bytes)
}

pub fn read_u32<R: Read + ?Sized>(input: &mut R) -> io::Result<u32> {
    read_array(input).map(u32::from_le_bytes)
}

pub fn read_u64<R: Read + ?Sized>(input: &mut R) -> io::Result<u64> {
    read_array(input).map(u64::from_le_bytes)
}

pub fn read_f64<R: Read + ?Sized>(input: &mut R) -> io::Result<f64> {
    read_array(input).map(f64::from_le_bytes)
}

pub fn read_bool<R: Read + ?Sized>(input: &mut R) -> HeResult<bool> {
    match read_array::<R, 1>(input)? {
        [0] => Ok(false),
        [1] => Ok(true),
        [other] => Err(HeError::corrupt(format!("invalid bool byte {other}"))),
    }
}

/// Reads a length prefix written by [`write_len`], rejecting negative or
/// oversized values.
pub fn read_len<R: Read + ?Sized>(input: &mut R) -> HeResult<usize> {
    let len = read_i32(input)?;
    usize::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_LENGTH)
        .ok_or_else(|| HeError::corrupt(format!("invalid length prefix {len}")))
}

pub fn read_string<R: Read + ?Sized>(input: &mut R) -> HeResult<String> {
    let len = read_len(input)?;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| HeError::corrupt(e.to_string()))
}

pub fn read_u64_vec<R: Read + ?Sized>(input: &mut R) -> HeResult<Vec<u64>> {
    let len = read_len(input)?;
    (0..len).map(|_| Ok(read_u64(input)?)).collect()
}

pub fn read_f64_vec<R: Read + ?Sized>(input: &mut R) -> HeResult<Vec<f64>> {
    let len = read_len(input)?;
    (0..len).map(|_| Ok(read_f64(input)?)).collect()
}

/// A writer that counts the bytes passing through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader that counts the bytes consumed from it.
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.count += read as u64;
        Ok(read)
    }
}
