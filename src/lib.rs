//! Syntax Buffer - flat binary encoding of parsed syntax trees
//!
//! This crate flattens a parsed syntax tree and its source text into one
//! self-contained byte buffer. A consumer in another process or language
//! can locate any node, its parent, its subtree and its literal text with
//! fixed-offset arithmetic, without deserializing the whole tree.
//!
//! # Architecture
//!
//! One encode owns all of its state and runs in a single pass:
//!
//! - [`NodeTableBuilder`] - Walks the tree in pre-order, one record per node and list run
//! - [`StringTable`] - Records text spans, reusing the source text where possible
//! - [`ExtendedData`] - Side table for payloads wider than one `data` word
//! - [`assemble`] - Writes the header and concatenates the sections
//!
//! [`EncodedTree`] is the read side: a bounds-checked view over a buffer.
//!
//! # Concurrency Model
//!
//! Encoding one tree is sequential. Independent trees share nothing but an
//! immutable [`EncoderConfig`], so [`encode_all`] spreads them over rayon:
//!
//! ```rust
//! use syntax_buffer::{EncoderConfig, SyntaxKind, TextRange, TreeDocument, TreeNode, encode_all};
//!
//! let root = TreeNode::new(SyntaxKind::new(1).unwrap(), TextRange::new(0, 2));
//! let documents = vec![TreeDocument::new("ab", root.clone()), TreeDocument::new("cd", root)];
//!
//! let buffers = encode_all(&documents, &EncoderConfig::default());
//! assert_eq!(buffers.len(), 2);
//! assert!(buffers.iter().all(|buf| buf.is_ok()));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::uninlined_format_args)]

pub mod assemble;
pub mod cli;
pub mod config;
pub mod decode;
pub mod dump;
pub mod encoder;
pub mod error;
pub mod extended;
#[allow(unsafe_code)] // FFI requires unsafe
pub mod ffi;
pub mod format;
pub mod kind;
pub mod node;
pub mod node_table;
pub mod string_table;
pub mod tree;

// Re-exports for convenience
pub use assemble::{Header, assemble};
pub use config::EncoderConfig;
pub use decode::EncodedTree;
pub use dump::dump;
pub use encoder::{encode, encode_all, encode_document, write_encoded};
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult, Limit};
pub use extended::{ExtIdx, ExtendedData};
pub use ffi::{EncodedBuffer, FfiResult, FfiStatus};
pub use kind::{RecordKind, SyntaxKind};
pub use node::{Child, ExtendedField, NodeFlags, NodePayload, SourceNode, TextRange};
pub use node_table::{NodeData, NodeIdx, NodeRecord, NodeTable, NodeTableBuilder};
pub use string_table::{StrIdx, StringTable, TextOrigin};
pub use tree::{TreeChild, TreeDocument, TreeField, TreeList, TreeNode};
