//! Header and buffer assembly.
//!
//! Runs after the node table and string table are complete, so every
//! section length is final before the first byte is written.
//!
//! ```text
//! header ─┬─ metadata ───────────── 0
//!         ├─ string offsets ─────── 20
//!         ├─ string data ────────── 20 + 8·N
//!         ├─ extended data ──────── string data + |source| + |other strings|
//!         └─ node table ─────────── extended data + |extended|
//! ```

use crate::error::{EncodeError, EncodeResult, Limit};
use crate::extended::ExtendedData;
use crate::format::{HEADER_SIZE, METADATA_VERSION_SHIFT, PROTOCOL_VERSION, append_u32s};
use crate::node_table::NodeTable;
use crate::string_table::StringTable;

/// The five header words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Metadata word carrying the protocol version.
    pub metadata: u32,
    /// Offset of the string offsets section.
    pub string_offsets: u32,
    /// Offset of the string data section.
    pub string_data: u32,
    /// Offset of the extended data section.
    pub extended_data: u32,
    /// Offset of the node table.
    pub nodes: u32,
}

impl Header {
    /// Lay out sections of the given byte lengths after the header.
    ///
    /// Returns the header and the total buffer length.
    pub fn layout(
        string_offsets_len: usize,
        string_data_len: usize,
        extended_len: usize,
        nodes_len: usize,
    ) -> EncodeResult<(Header, u32)> {
        let mut cursor = HEADER_SIZE;
        let mut next = |len: usize| -> EncodeResult<u32> {
            let start = to_u32(cursor)?;
            cursor = cursor
                .checked_add(len)
                .ok_or(EncodeError::capacity(Limit::BufferSize, usize::MAX))?;
            Ok(start)
        };
        let header = Header {
            metadata: u32::from(PROTOCOL_VERSION) << METADATA_VERSION_SHIFT,
            string_offsets: next(string_offsets_len)?,
            string_data: next(string_data_len)?,
            extended_data: next(extended_len)?,
            nodes: next(nodes_len)?,
        };
        Ok((header, to_u32(cursor)?))
    }

    /// Protocol version stored in the metadata word.
    pub fn version(&self) -> u8 {
        (self.metadata >> METADATA_VERSION_SHIFT) as u8
    }

    fn write(&self, out: &mut Vec<u8>) {
        append_u32s(
            out,
            &[
                self.metadata,
                self.string_offsets,
                self.string_data,
                self.extended_data,
                self.nodes,
            ],
        );
    }
}

fn to_u32(len: usize) -> EncodeResult<u32> {
    u32::try_from(len).map_err(|_| EncodeError::capacity(Limit::BufferSize, len))
}

/// Concatenate the finished sections into one buffer.
pub fn assemble(
    strings: &StringTable<'_>,
    extended: &ExtendedData,
    nodes: &NodeTable,
) -> EncodeResult<Vec<u8>> {
    let (header, total) = Header::layout(
        strings.offsets_byte_len(),
        strings.data_byte_len(),
        extended.len(),
        nodes.byte_len(),
    )?;

    let mut out = Vec::with_capacity(total as usize);
    header.write(&mut out);
    strings.write_offsets(&mut out);
    strings.write_data(&mut out);
    out.extend_from_slice(extended.as_bytes());
    nodes.write(&mut out);
    debug_assert_eq!(out.len(), total as usize);
    Ok(out)
}
