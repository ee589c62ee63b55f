//! Encoding entry points.
//!
//! One encode is a single sequential pass:
//!
//! ```text
//! tree ──► NodeTableBuilder ──► StringTable + ExtendedData ──► assemble ──► Vec<u8>
//! ```
//!
//! Independent documents share nothing, so [`encode_all`] runs them on the
//! rayon thread pool.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::assemble::assemble;
use crate::config::EncoderConfig;
use crate::decode::EncodedTree;
use crate::error::{EncodeError, EncodeResult, Limit};
use crate::extended::ExtendedData;
use crate::node::SourceNode;
use crate::node_table::NodeTableBuilder;
use crate::string_table::StringTable;
use crate::tree::TreeDocument;

/// Encode the tree rooted at `root` over `source`.
pub fn encode<N: SourceNode + ?Sized>(
    source: &str,
    root: &N,
    config: &EncoderConfig,
) -> EncodeResult<Vec<u8>> {
    config.validate()?;
    if u32::try_from(source.len()).is_err() {
        return Err(EncodeError::capacity(Limit::BufferSize, source.len()));
    }

    let mut strings = StringTable::new(source);
    let mut extended = ExtendedData::new();
    let nodes =
        NodeTableBuilder::new(config, source.len()).build(root, &mut strings, &mut extended)?;
    let buf = assemble(&strings, &extended, &nodes)?;

    log::debug!(
        "encoded {} nodes, {} strings ({} auxiliary bytes), {} extended bytes into {} bytes",
        nodes.len(),
        strings.len(),
        strings.other_strings_len(),
        extended.len(),
        buf.len()
    );

    if config.verify {
        EncodedTree::parse(&buf)
            .and_then(|tree| tree.verify())
            .map_err(EncodeError::Verification)?;
    }
    Ok(buf)
}

/// Encode a parsed document.
pub fn encode_document(document: &TreeDocument, config: &EncoderConfig) -> EncodeResult<Vec<u8>> {
    encode(&document.source, &document.root, config)
}

/// Encode independent documents in parallel.
///
/// Results are returned in input order; one failing document does not
/// affect the others.
pub fn encode_all(
    documents: &[TreeDocument],
    config: &EncoderConfig,
) -> Vec<EncodeResult<Vec<u8>>> {
    documents
        .par_iter()
        .map(|document| encode_document(document, config))
        .collect()
}

/// Write an encoded buffer to `output_path`.
pub fn write_encoded(output_path: &Path, buf: &[u8]) -> io::Result<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(buf)?;
    writer.flush()?;
    Ok(())
}
