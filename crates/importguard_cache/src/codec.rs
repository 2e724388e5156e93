//! Binary codec for the violation cache.
//!
//! ## File Format
//!
//! ```text
//! ┌───────────┬─────────────┬──────────────────────┐
//! │ Magic (4) │ Version (1) │ Entry count (varint) │
//! └───────────┴─────────────┴──────────────────────┘
//! Entry
//! ┌──────────────────┬────────────┬─────────────────────────┐
//! │ Path len (varint)│ Path bytes │ Violation count (varint)│
//! └──────────────────┴────────────┴─────────────────────────┘
//! Violation (four length-prefixed UTF-8 strings)
//! ┌──────────────┬────────────┬─────────────┬───────────────┐
//! │ Import       │ Rule       │ Cause       │ Details       │
//! └──────────────┴────────────┴─────────────┴───────────────┘
//! ```
//!
//! Varints are unsigned LEB128. A violation's file is the enclosing entry's
//! path and is not written again; the `cached` marker is never written.
//!
//! Decoding allocates every string a [`Violation`] owns. The entry path is
//! decoded into one `String` that becomes the entry key, and each violation
//! gets a clone of it, so a path is copied once per violation rather than
//! re-read from the buffer.

use crate::{CacheEntry, CacheError, Violation};

/// Magic bytes opening every cache file.
pub const MAGIC: [u8; 4] = *b"IGVC";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the fixed header (magic + version).
pub const HEADER_LEN: usize = MAGIC.len() + 1;

/// Largest string field accepted by the encoder, in bytes.
pub const MAX_FIELD_LEN: usize = u32::MAX as usize;

/// Longest LEB128 encoding of a u64.
const MAX_VARINT_LEN: usize = 10;

/// Smallest encoding of an entry: empty path + zero violations.
const MIN_ENTRY_LEN: usize = 2;

/// Smallest encoding of a violation: four empty strings.
const MIN_VIOLATION_LEN: usize = 4;

// =============================================================================
// Varints
// =============================================================================

/// Returns the number of bytes `value` occupies as a varint.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Appends `value` to `buf` as a varint.
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn str_len(value: &str) -> usize {
    varint_len(value.len() as u64) + value.len()
}

fn write_str(buf: &mut Vec<u8>, value: &str, field: &str) -> Result<(), CacheError> {
    if value.len() > MAX_FIELD_LEN {
        return Err(CacheError::validation(format!(
            "{} is {} bytes, exceeding the {} byte limit",
            field,
            value.len(),
            MAX_FIELD_LEN
        )));
    }
    write_varint(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

// =============================================================================
// Encoding
// =============================================================================

/// Computes the exact encoded size of `entries` without encoding them.
pub fn encoded_len<'a, I>(entries: I) -> usize
where
    I: IntoIterator<Item = &'a CacheEntry>,
    I::IntoIter: ExactSizeIterator,
{
    let entries = entries.into_iter();
    let mut len = HEADER_LEN + varint_len(entries.len() as u64);

    for entry in entries {
        len += str_len(&entry.file) + varint_len(entry.violations.len() as u64);
        for violation in &entry.violations {
            len += str_len(&violation.import)
                + str_len(&violation.rule)
                + str_len(&violation.cause)
                + str_len(&violation.details);
        }
    }

    len
}

/// Encodes entries, in iteration order, into a fresh buffer.
///
/// Fails with [`CacheError::Validation`] if a violation's file differs from
/// its entry's path or a string field exceeds [`MAX_FIELD_LEN`].
pub fn encode<'a, I>(entries: I) -> Result<Vec<u8>, CacheError>
where
    I: IntoIterator<Item = &'a CacheEntry>,
    I::IntoIter: ExactSizeIterator + Clone,
{
    let entries = entries.into_iter();
    let mut buf = Vec::with_capacity(encoded_len(entries.clone()));

    buf.extend_from_slice(&MAGIC);
    buf.push(FORMAT_VERSION);
    write_varint(&mut buf, entries.len() as u64);

    for entry in entries {
        write_str(&mut buf, &entry.file, "path")?;
        write_varint(&mut buf, entry.violations.len() as u64);

        for violation in &entry.violations {
            if violation.file != entry.file {
                return Err(CacheError::validation(format!(
                    "violation for {} stored under {}",
                    violation.file, entry.file
                )));
            }
            write_str(&mut buf, &violation.import, "import")?;
            write_str(&mut buf, &violation.rule, "rule")?;
            write_str(&mut buf, &violation.cause, "cause")?;
            write_str(&mut buf, &violation.details, "details")?;
        }
    }

    Ok(buf)
}

// =============================================================================
// Decoding
// =============================================================================

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_header(&mut self) -> Result<(), CacheError> {
        if self.buf.len() < HEADER_LEN {
            return Err(CacheError::corrupted(format!(
                "file is {} bytes, shorter than the {} byte header",
                self.buf.len(),
                HEADER_LEN
            )));
        }
        if self.buf[..MAGIC.len()] != MAGIC {
            return Err(CacheError::corrupted("bad magic, not an ImportGuard cache"));
        }
        let version = self.buf[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(CacheError::corrupted(format!(
                "unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }
        self.pos = HEADER_LEN;
        Ok(())
    }

    fn read_varint(&mut self) -> Result<u64, CacheError> {
        let start = self.pos;
        let mut value = 0u64;

        for i in 0..MAX_VARINT_LEN {
            let byte = *self.buf.get(self.pos).ok_or_else(|| {
                CacheError::corrupted(format!("truncated varint at offset {}", start))
            })?;
            self.pos += 1;

            let payload = u64::from(byte & 0x7f);
            if i == MAX_VARINT_LEN - 1 && payload > 1 {
                return Err(CacheError::corrupted(format!(
                    "varint overflows u64 at offset {}",
                    start
                )));
            }
            value |= payload << (7 * i);

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(CacheError::corrupted(format!(
            "varint longer than {} bytes at offset {}",
            MAX_VARINT_LEN, start
        )))
    }

    /// Reads a count, rejecting values the remaining bytes cannot hold.
    fn read_count(&mut self, what: &str, min_item_len: usize) -> Result<usize, CacheError> {
        let start = self.pos;
        let count = self.read_varint()?;
        let fits = usize::try_from(count)
            .ok()
            .filter(|c| c.saturating_mul(min_item_len) <= self.remaining());

        fits.ok_or_else(|| {
            CacheError::corrupted(format!(
                "{} count {} at offset {} exceeds remaining {} bytes",
                what,
                count,
                start,
                self.remaining()
            ))
        })
    }

    fn read_bytes(&mut self, what: &str) -> Result<&'a [u8], CacheError> {
        let start = self.pos;
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|l| *l <= self.remaining())
            .ok_or_else(|| {
                CacheError::corrupted(format!(
                    "{} length {} at offset {} exceeds remaining {} bytes",
                    what,
                    len,
                    start,
                    self.remaining()
                ))
            })?;

        let buf = self.buf;
        let bytes = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_str(&mut self, what: &str) -> Result<&'a str, CacheError> {
        let start = self.pos;
        let bytes = self.read_bytes(what)?;
        std::str::from_utf8(bytes).map_err(|e| {
            CacheError::corrupted(format!("{} at offset {} is not UTF-8: {}", what, start, e))
        })
    }
}

/// Walks the whole buffer checking every declared length, and returns the
/// violation count of each entry. Nothing is allocated per field.
fn scan(bytes: &[u8]) -> Result<Vec<usize>, CacheError> {
    let mut reader = Reader::new(bytes);
    reader.read_header()?;

    let entry_count = reader.read_count("entry", MIN_ENTRY_LEN)?;
    let mut layout = Vec::with_capacity(entry_count);

    for _ in 0..entry_count {
        reader.read_bytes("path")?;
        let violation_count = reader.read_count("violation", MIN_VIOLATION_LEN)?;
        for _ in 0..violation_count {
            reader.read_bytes("import")?;
            reader.read_bytes("rule")?;
            reader.read_bytes("cause")?;
            reader.read_bytes("details")?;
        }
        layout.push(violation_count);
    }

    if reader.remaining() != 0 {
        return Err(CacheError::corrupted(format!(
            "{} trailing bytes after the last entry",
            reader.remaining()
        )));
    }

    Ok(layout)
}

/// Decodes a buffer produced by [`encode`].
///
/// The buffer is validated in full before any entry is allocated, so a
/// truncated or malformed file fails fast with [`CacheError::Corrupted`].
/// Every returned violation has `cached == false`.
pub fn decode(bytes: &[u8]) -> Result<Vec<CacheEntry>, CacheError> {
    let layout = scan(bytes)?;

    let mut reader = Reader::new(bytes);
    reader.read_header()?;
    reader.read_varint()?;

    let mut entries = Vec::with_capacity(layout.len());
    for violation_count in layout {
        let file = reader.read_str("path")?.to_owned();
        reader.read_varint()?;

        let mut violations = Vec::with_capacity(violation_count);
        for _ in 0..violation_count {
            violations.push(Violation {
                file: file.clone(),
                import: reader.read_str("import")?.to_owned(),
                rule: reader.read_str("rule")?.to_owned(),
                cause: reader.read_str("cause")?.to_owned(),
                details: reader.read_str("details")?.to_owned(),
                cached: false,
            });
        }

        entries.push(CacheEntry::new(file, violations));
    }

    Ok(entries)
}
