//! Single-file persistence for [`IndexStore`].
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "TCGX" | version u32 | dimension u32 | entry_count u32 | model_id str
//! entry_count x { text str | source_id str | category u8 | offset u32 | dimension x f32 }
//! ```
//!
//! `str` is a u32 byte length followed by UTF-8. Entry ids are not stored;
//! they are reassigned in file order on load, which reproduces the saved ids.
//! Saving writes a sibling temp file, fsyncs it and renames it over the
//! destination, so readers only ever see a complete file.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use tcgrules_core::error::{Error, Result};
use tcgrules_core::types::{Category, Segment};

use crate::store::IndexStore;

pub const MAGIC: &[u8; 4] = b"TCGX";
pub const FORMAT_VERSION: u32 = 1;

pub fn save(store: &IndexStore, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(&mut tmp);
        write_store(&mut w, store)?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    info!(path = %path.display(), entries = store.len(), model_id = store.model_id(), "index saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<IndexStore> {
    if !path.is_file() {
        return Err(Error::NotFound(format!("index file {}", path.display())));
    }
    let bytes = fs::read(path)?;
    let store = decode(&bytes)?;
    info!(path = %path.display(), entries = store.len(), model_id = store.model_id(), "index loaded");
    Ok(store)
}

pub fn encode(store: &IndexStore) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_store(&mut out, store)?;
    Ok(out)
}

fn write_store<W: Write>(w: &mut W, store: &IndexStore) -> Result<()> {
    let dimension = store.dimension().unwrap_or(0);
    w.write_all(MAGIC)?;
    write_u32(w, FORMAT_VERSION)?;
    write_u32(w, len_u32(dimension, "dimension")?)?;
    write_u32(w, len_u32(store.len(), "entry count")?)?;
    write_str(w, store.model_id())?;
    for entry in store.entries() {
        write_str(w, &entry.segment.text)?;
        write_str(w, &entry.segment.source_id)?;
        w.write_all(&[entry.segment.category.tag()])?;
        write_u32(w, len_u32(entry.segment.offset, "segment offset")?)?;
        for x in &entry.vector {
            w.write_all(&x.to_le_bytes())?;
        }
    }
    Ok(())
}

fn len_u32(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::InvalidArgument(format!("{what} {n} does not fit the index format")))
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_str<W: Write>(w: &mut W, s: &str) -> Result<()> {
    write_u32(w, len_u32(s.len(), "string length")?)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub fn decode(bytes: &[u8]) -> Result<IndexStore> {
    let mut r = Reader { bytes, pos: 0 };
    if r.take(4, "magic")? != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = r.u32("format version")?;
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {version}")));
    }
    let dimension = r.u32("dimension")? as usize;
    let count = r.u32("entry count")? as usize;
    let model_id = r.string("model id")?;
    if dimension == 0 && count > 0 {
        return Err(corrupt("zero dimension with non-empty entry list"));
    }
    debug!(dimension, count, model_id = %model_id, "decoding index");

    let mut store = IndexStore::with_model(model_id);
    for i in 0..count {
        let text = r.string("segment text")?;
        let source_id = r.string("source id")?;
        let tag = r.take(1, "category")?[0];
        let category = Category::from_tag(tag).ok_or_else(|| corrupt(format!("entry {i}: unknown category {tag}")))?;
        let offset = r.u32("offset")? as usize;
        let raw = r.take(dimension * 4, "vector")?;
        let vector: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(corrupt(format!("entry {i}: non-finite vector component")));
        }
        store
            .insert(Segment { text, source_id, category, offset }, vector)
            .map_err(|e| corrupt(format!("entry {i}: {e}")))?;
    }
    if r.remaining() > 0 {
        return Err(corrupt(format!(
            "{} trailing bytes after {count} entries; entry count does not match the data",
            r.remaining()
        )));
    }
    Ok(store)
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::CorruptIndex(msg.into())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(corrupt(format!(
                "truncated while reading {what}: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let len = self.u32(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| corrupt(format!("{what} is not valid UTF-8")))
    }
}
