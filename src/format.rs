//! Wire layout of an encoded syntax buffer.
//!
//! All integers are little-endian `u32`. The buffer is a concatenation of
//! five sections, each locatable through the header:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ Header (20 bytes)                                                   │
//! │   0-4   metadata word (protocol version in the top byte)            │
//! │   4-8   offset of the string offsets section                        │
//! │   8-12  offset of the string data section                           │
//! │   12-16 offset of the extended data section                         │
//! │   16-20 offset of the node table                                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ String offsets: N × (start u32, end u32), relative to string data   │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ String data: source text, then auxiliary strings                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Extended data: entries of (word count u32, words...)                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Node table: M × 24-byte records                                     │
//! │   kind(4) pos(4) end(4) next(4) parent(4) data(4)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Node data field
//!
//! The top two bits of `data` select its interpretation:
//!
//! | Tag    | Meaning      | Payload                                       |
//! | ------ | ------------ | --------------------------------------------- |
//! | `0b00` | Children     | bits 0-7 child count, bits 24-29 node flags   |
//! | `0b01` | String       | bits 0-23 string index, bits 24-29 node flags |
//! | `0b10` | ExtendedData | bits 0-29 byte offset into extended data      |
//! | `0b11` | Reserved     | rejected by decoders                          |

/// Version byte written into the top byte of the metadata word.
pub const PROTOCOL_VERSION: u8 = 1;

// ============================================================================
// Header
// ============================================================================

/// Byte offset of the metadata word.
pub const HEADER_OFFSET_METADATA: usize = 0;
/// Byte offset of the string offsets section pointer.
pub const HEADER_OFFSET_STRING_OFFSETS: usize = 4;
/// Byte offset of the string data section pointer.
pub const HEADER_OFFSET_STRING_DATA: usize = 8;
/// Byte offset of the extended data section pointer.
pub const HEADER_OFFSET_EXTENDED_DATA: usize = 12;
/// Byte offset of the node table pointer.
pub const HEADER_OFFSET_NODES: usize = 16;
/// Total header length in bytes.
pub const HEADER_SIZE: usize = 20;

/// Shift of the version byte inside the metadata word.
pub const METADATA_VERSION_SHIFT: u32 = 24;

/// Byte length of one `(start, end)` string offset pair.
pub const STRING_OFFSET_PAIR_SIZE: usize = 8;

// ============================================================================
// Node records
// ============================================================================

/// Field offset of `kind` inside a node record.
pub const NODE_OFFSET_KIND: usize = 0;
/// Field offset of `pos` inside a node record.
pub const NODE_OFFSET_POS: usize = 4;
/// Field offset of `end` inside a node record.
pub const NODE_OFFSET_END: usize = 8;
/// Field offset of `next` inside a node record.
pub const NODE_OFFSET_NEXT: usize = 12;
/// Field offset of `parent` inside a node record.
pub const NODE_OFFSET_PARENT: usize = 16;
/// Field offset of `data` inside a node record.
pub const NODE_OFFSET_DATA: usize = 20;
/// Stride of one node record.
pub const NODE_SIZE: usize = 24;

/// Kind value reserved for synthetic list records.
pub const KIND_NODE_LIST: u32 = u32::MAX;

/// Range marker for nodes that have no position in the source text.
pub const DETACHED_POS: u32 = u32::MAX;

// ============================================================================
// Node data
// ============================================================================

/// Tag for a children count payload.
pub const NODE_DATA_TYPE_CHILDREN: u32 = 0b00 << 30;
/// Tag for a string index payload.
pub const NODE_DATA_TYPE_STRING: u32 = 0b01 << 30;
/// Tag for an extended data payload.
pub const NODE_DATA_TYPE_EXTENDED: u32 = 0b10 << 30;
/// Tag value no encoder produces.
pub const NODE_DATA_TYPE_RESERVED: u32 = 0b11 << 30;

/// Selects the tag bits of a data field.
pub const NODE_DATA_TYPE_MASK: u32 = 0xc0_00_00_00;
/// Selects the child count of a children payload.
pub const NODE_DATA_CHILD_MASK: u32 = 0x00_00_00_ff;
/// Selects the string index of a string payload.
pub const NODE_DATA_STRING_INDEX_MASK: u32 = 0x00_ff_ff_ff;
/// Selects the extended data offset of an extended payload.
pub const NODE_DATA_EXTENDED_MASK: u32 = 0x3f_ff_ff_ff;

/// Shift of the node flag bits in children and string payloads.
pub const NODE_FLAGS_SHIFT: u32 = 24;
/// Selects the six node flag bits once shifted down.
pub const NODE_FLAGS_MASK: u32 = 0x3f;

/// Number of distinct string indices a string payload can address.
pub const MAX_STRING_ENTRIES: usize = NODE_DATA_STRING_INDEX_MASK as usize + 1;
/// Largest child count a children payload can hold.
pub const MAX_CHILD_COUNT: usize = NODE_DATA_CHILD_MASK as usize;
/// Largest byte offset an extended payload can hold.
pub const MAX_EXTENDED_OFFSET: usize = NODE_DATA_EXTENDED_MASK as usize;

/// Read a little-endian `u32` at `offset`, if the buffer is long enough.
#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Append `values` to `buf` as little-endian `u32`s.
#[inline]
pub fn append_u32s(buf: &mut Vec<u8>, values: &[u32]) {
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields_fill_stride() {
        assert_eq!(NODE_OFFSET_DATA + 4, NODE_SIZE);
        assert_eq!(HEADER_OFFSET_NODES + 4, HEADER_SIZE);
    }

    #[test]
    fn test_data_tags_are_disjoint_from_payload_masks() {
        for tag in [
            NODE_DATA_TYPE_CHILDREN,
            NODE_DATA_TYPE_STRING,
            NODE_DATA_TYPE_EXTENDED,
            NODE_DATA_TYPE_RESERVED,
        ] {
            assert_eq!(tag & !NODE_DATA_TYPE_MASK, 0);
            assert_eq!(tag & NODE_DATA_EXTENDED_MASK, 0);
        }
        assert_eq!(NODE_DATA_STRING_INDEX_MASK & (NODE_FLAGS_MASK << NODE_FLAGS_SHIFT), 0);
    }

    #[test]
    fn test_read_u32_bounds() {
        let mut buf = Vec::new();
        append_u32s(&mut buf, &[7, 0xdead_beef]);
        assert_eq!(read_u32(&buf, 0), Some(7));
        assert_eq!(read_u32(&buf, 4), Some(0xdead_beef));
        assert_eq!(read_u32(&buf, 5), None);
        assert_eq!(read_u32(&buf, usize::MAX), None);
    }
}
