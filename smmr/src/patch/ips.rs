use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::PatchError;

const IPS_MAGIC: &[u8] = b"PATCH";
const IPS_EOF: &[u8] = b"EOF";
// A record at this offset would be read back as the end-of-file marker.
const EOF_OFFSET: usize = 0x454F46;
const MAX_RECORD_LEN: usize = 0xFFFF;

/// Sanity ceiling for decoded patches: the whole 24-bit offset space.
pub const MAX_IMAGE_SIZE: usize = 0x1000000;

fn malformed(msg: impl Into<String>) -> anyhow::Error {
    PatchError::MalformedPatch(msg.into()).into()
}

/// Byte runs keyed by file offset. Runs never overlap: inserting over an existing run
/// replaces the overlapped bytes, so the last write wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IpsPatch {
    records: BTreeMap<usize, Vec<u8>>,
}

impl IpsPatch {
    pub fn new() -> Self {
        IpsPatch::default()
    }

    pub fn insert(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let end = offset + data.len();
        // Runs are sorted and disjoint, so their ends are sorted too.
        let overlapping: Vec<usize> = self
            .records
            .range(..end)
            .rev()
            .take_while(|&(&start, bytes)| start + bytes.len() > offset)
            .map(|(&start, _)| start)
            .collect();
        for start in overlapping {
            let Some(bytes) = self.records.remove(&start) else {
                continue;
            };
            if start < offset {
                self.records.insert(start, bytes[..(offset - start)].to_vec());
            }
            if start + bytes.len() > end {
                self.records.insert(end, bytes[(end - start)..].to_vec());
            }
        }
        self.records.insert(offset, data.to_vec());
    }

    pub fn records(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.records.iter().map(|(&offset, bytes)| (offset, bytes.as_slice()))
    }

    pub fn get(&self, offset: usize) -> Option<&[u8]> {
        self.records.get(&offset).map(|x| x.as_slice())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One past the highest byte written by the patch.
    pub fn max_end(&self) -> usize {
        self.records
            .iter()
            .next_back()
            .map(|(&offset, bytes)| offset + bytes.len())
            .unwrap_or(0)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = IpsDecoder { data, pos: 0 };
        decoder.decode()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let patch_data = std::fs::read(path)
            .with_context(|| format!("Unable to read patch {}", path.display()))?;
        IpsPatch::decode(&patch_data)
            .with_context(|| format!("Unable to parse patch {}", path.display()))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out: Vec<u8> = Vec::new();
        out.extend(IPS_MAGIC);
        for (&offset, bytes) in &self.records {
            for (i, chunk) in bytes.chunks(MAX_RECORD_LEN).enumerate() {
                let chunk_offset = offset + i * MAX_RECORD_LEN;
                if chunk_offset + chunk.len() > MAX_IMAGE_SIZE {
                    return Err(malformed(format!(
                        "record at {chunk_offset:#x} extends past the 24-bit offset space"
                    )));
                }
                if chunk_offset == EOF_OFFSET {
                    return Err(malformed(format!(
                        "record at {chunk_offset:#x} collides with the EOF marker"
                    )));
                }
                out.extend(&(chunk_offset as u32).to_be_bytes()[1..4]);
                out.extend((chunk.len() as u16).to_be_bytes());
                out.extend(chunk);
            }
        }
        out.extend(IPS_EOF);
        Ok(out)
    }

    /// Write every record into `data`, growing it (zero-filled) when a record ends past it.
    pub fn apply_in_place(&self, data: &mut Vec<u8>) {
        let end = self.max_end();
        if end > data.len() {
            data.resize(end, 0);
        }
        for (&offset, bytes) in &self.records {
            data[offset..(offset + bytes.len())].copy_from_slice(bytes);
        }
    }

    pub fn apply(&self, base: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(base.len().max(self.max_end()));
        out.extend_from_slice(base);
        self.apply_in_place(&mut out);
        out
    }
}

impl FromIterator<(usize, Vec<u8>)> for IpsPatch {
    fn from_iter<I: IntoIterator<Item = (usize, Vec<u8>)>>(iter: I) -> Self {
        let mut patch = IpsPatch::new();
        for (offset, bytes) in iter {
            patch.insert(offset, &bytes);
        }
        patch
    }
}

struct IpsDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> IpsDecoder<'a> {
    fn decode(&mut self) -> Result<IpsPatch> {
        if self.read_n(IPS_MAGIC.len())? != IPS_MAGIC {
            return Err(malformed("missing PATCH header"));
        }
        let mut patch = IpsPatch::new();
        loop {
            let offset_bytes = self.read_n(3)?;
            if offset_bytes == IPS_EOF {
                // Anything after the marker (e.g. a truncation length) is ignored.
                break;
            }
            let offset = be_int(offset_bytes);
            let length = self.read_u16()?;
            let bytes = if length == 0 {
                let count = self.read_u16()?;
                let value = self.read_n(1)?[0];
                vec![value; count]
            } else {
                self.read_n(length)?.to_vec()
            };
            if offset + bytes.len() > MAX_IMAGE_SIZE {
                return Err(malformed(format!(
                    "record at {offset:#x} with length {:#x} exceeds maximum image size",
                    bytes.len()
                )));
            }
            patch.insert(offset, &bytes);
        }
        Ok(patch)
    }

    fn read_n(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(malformed(format!(
                "truncated record at byte {:#x}",
                self.pos
            )));
        }
        let out = &self.data[self.pos..(self.pos + n)];
        self.pos += n;
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<usize> {
        Ok(be_int(self.read_n(2)?))
    }
}

fn be_int(bytes: &[u8]) -> usize {
    bytes.iter().fold(0, |acc, &b| acc << 8 | b as usize)
}
