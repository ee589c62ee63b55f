//! End-to-end encoding tests.

use syntax_buffer::format::{HEADER_SIZE, NODE_SIZE, STRING_OFFSET_PAIR_SIZE};
use syntax_buffer::{
    EncodeError, EncodedTree, EncoderConfig, Limit, NodeData, NodeFlags, NodeIdx, RecordKind,
    StrIdx, SyntaxKind, TextRange, TreeChild, TreeDocument, TreeField, TreeNode, encode,
    encode_all, encode_document,
};

const SOURCE_FILE: u32 = 308;
const IDENTIFIER: u32 = 80;
const STRING_LITERAL: u32 = 11;
const IMPORT_DECLARATION: u32 = 272;
const BLOCK: u32 = 241;
const TEMPLATE_HEAD: u32 = 16;

fn kind(raw: u32) -> SyntaxKind {
    SyntaxKind::new(raw).unwrap()
}

fn node(raw: u32, pos: u32, end: u32) -> TreeNode {
    TreeNode::new(kind(raw), TextRange::new(pos, end))
}

fn header_words(buf: &[u8]) -> [u32; 5] {
    let mut words = [0; 5];
    for (i, word) in words.iter_mut().enumerate() {
        *word = u32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
    }
    words
}

/// `import { bar } from "bar";`
fn import_document() -> TreeDocument {
    let source = "import { bar } from \"bar\";";
    let specifier = node(IDENTIFIER, 8, 12).with_text("bar");
    let module = node(STRING_LITERAL, 19, 25).with_text("bar").with_closing_delimiter(1);
    let import = node(IMPORT_DECLARATION, 0, 26)
        .with_child(TreeChild::list(TextRange::new(8, 12), vec![specifier]))
        .with_child(TreeChild::Node(module));
    let root = node(SOURCE_FILE, 0, 26)
        .with_child(TreeChild::list(TextRange::new(0, 26), vec![import]));
    TreeDocument::new(source, root)
}

#[test]
fn test_empty_file() {
    let root = node(SOURCE_FILE, 0, 0);
    let buf = encode("", &root, &EncoderConfig::default()).unwrap();

    assert_eq!(buf.len(), HEADER_SIZE + STRING_OFFSET_PAIR_SIZE + NODE_SIZE);
    let tree = EncodedTree::parse(&buf).unwrap();
    tree.verify().unwrap();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.string_count(), 1);
    assert_eq!(tree.string_span(StrIdx::from_raw(0)).unwrap(), (0, 0));

    let record = tree.node(NodeIdx::ROOT).unwrap();
    assert_eq!(record.kind, RecordKind::Syntax(kind(SOURCE_FILE)));
    assert_eq!(record.parent, NodeIdx::ROOT);
    assert_eq!(record.next, NodeIdx::ROOT);
}

#[test]
fn test_literal_text_reuses_source() {
    let document = import_document();
    let buf = encode_document(&document, &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    tree.verify().unwrap();

    // No auxiliary strings: string data is exactly the source.
    let header = tree.header();
    assert_eq!((header.extended_data - header.string_data) as usize, document.source.len());

    let module = NodeIdx::from_raw(5);
    assert_eq!(tree.node(module).unwrap().kind, RecordKind::Syntax(kind(STRING_LITERAL)));
    let NodeData::String { index, .. } = tree.node(module).unwrap().data else {
        panic!("expected a string payload");
    };
    assert_eq!(tree.string_span(index).unwrap(), (21, 24));
    assert_eq!(tree.string(index).unwrap(), "bar");
}

#[test]
fn test_escaped_text_goes_to_auxiliary_buffer() {
    let source = "x = \"a\\u0062\"";
    let literal = node(STRING_LITERAL, 3, 13).with_text("ab").with_closing_delimiter(1);
    let root = node(SOURCE_FILE, 0, 13).with_child(TreeChild::Node(literal));
    let buf = encode(source, &root, &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();

    let NodeData::String { index, .. } = tree.node(NodeIdx::from_raw(1)).unwrap().data else {
        panic!("expected a string payload");
    };
    let (start, end) = tree.string_span(index).unwrap();
    assert!(start as usize >= source.len());
    assert_eq!(end - start, 2);
    assert_eq!(tree.string(index).unwrap(), "ab");
}

fn long_list(len: u32) -> (String, TreeNode) {
    let source = " ".repeat(len as usize);
    let items = (0..len).map(|i| node(IDENTIFIER, i, i + 1)).collect();
    let block = node(BLOCK, 0, len).with_child(TreeChild::list(TextRange::new(0, len), items));
    let root = node(SOURCE_FILE, 0, len).with_child(TreeChild::Node(block));
    (source, root)
}

#[test]
fn test_long_list_is_chained() {
    let (source, root) = long_list(300);
    let buf = encode(&source, &root, &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    tree.verify().unwrap();

    // root, block, two list records, 300 items
    assert_eq!(tree.node_count(), 304);
    let block = NodeIdx::from_raw(1);
    assert_eq!(
        tree.node(block).unwrap().data,
        NodeData::Children {
            count: 1,
            flags: NodeFlags::NONE
        }
    );

    let first = NodeIdx::from_raw(2);
    assert_eq!(tree.children(block).unwrap(), vec![first]);
    let children = tree.children(first).unwrap();
    assert_eq!(children.len(), 255);
    let rest = children[254];
    assert_eq!(rest, NodeIdx::from_raw(257));

    let head = tree.node(first).unwrap();
    let tail = tree.node(rest).unwrap();
    assert!(head.kind.is_list() && tail.kind.is_list());
    assert!(head.data.flags().contains(NodeFlags::LIST_CONTINUED));
    assert!(!tail.data.flags().contains(NodeFlags::LIST_CONTINUED));
    assert_eq!(head.range, TextRange::new(0, 300));
    assert_eq!(tail.range, TextRange::new(254, 300));
    assert_eq!(tail.parent, first);
    assert_eq!(tree.children(rest).unwrap().len(), 46);

    let items = tree.list_items(first).unwrap();
    assert_eq!(items.len(), 300);
    for (i, item) in items.into_iter().enumerate() {
        assert_eq!(tree.node(item).unwrap().range.pos, i as u32);
    }
}

#[test]
fn test_list_of_more_than_65025_items_encodes() {
    // More items than 255 runs of 255 can hold.
    let len = 255 * 255 + 1;
    let (source, root) = long_list(len);
    let buf = encode(&source, &root, &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    tree.verify().unwrap();

    let block = NodeIdx::from_raw(1);
    assert_eq!(tree.children(block).unwrap(), vec![NodeIdx::from_raw(2)]);
    let items = tree.list_items(NodeIdx::from_raw(2)).unwrap();
    assert_eq!(items.len(), len as usize);
    let last = tree.node(items[items.len() - 1]).unwrap();
    assert_eq!(last.range, TextRange::new(len - 1, len));
    assert!(!tree.node(last.parent).unwrap().data.flags().contains(NodeFlags::LIST_CONTINUED));
}

#[test]
fn test_encoding_is_deterministic() {
    let document = import_document();
    let config = EncoderConfig::builder().file_name("main.ts").source_id("1").build();
    let first = encode_document(&document, &config).unwrap();
    let second = encode_document(&document.clone(), &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_every_text_round_trips() {
    let source = "let s = `a${b}\\n`";
    let head = node(TEMPLATE_HEAD, 8, 12)
        .with_extended(vec![
            TreeField::Text("a".into()),
            TreeField::Text("a".into()),
            TreeField::Word(0),
        ])
        .with_closing_delimiter(2);
    let name = node(IDENTIFIER, 3, 5).with_text("s");
    let expr = node(IDENTIFIER, 12, 13).with_text("b");
    let root = node(SOURCE_FILE, 0, 17)
        .with_child(TreeChild::Node(name))
        .with_child(TreeChild::Node(head))
        .with_child(TreeChild::Node(expr));
    let buf = encode(source, &root, &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    tree.verify().unwrap();

    assert_eq!(tree.text(NodeIdx::from_raw(1)).unwrap(), Some("s"));
    assert_eq!(tree.text(NodeIdx::from_raw(3)).unwrap(), Some("b"));
    let NodeData::Extended(offset) = tree.node(NodeIdx::from_raw(2)).unwrap().data else {
        panic!("expected extended data");
    };
    let words = tree.extended(offset).unwrap();
    assert_eq!(tree.string(StrIdx::from_raw(words[0])).unwrap(), "a");
    assert_eq!(tree.string(StrIdx::from_raw(words[1])).unwrap(), "a");
    assert_eq!(tree.string_span(StrIdx::from_raw(words[0])).unwrap(), (9, 10));
    assert_eq!(words[2], 0);
}

#[test]
fn test_links_are_valid_indices() {
    let buf = encode_document(&import_document(), &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    let count = tree.node_count();
    for i in 0..count {
        let record = tree.node(NodeIdx::from_raw(i)).unwrap();
        assert!(record.parent.raw() < count);
        assert!(record.next.raw() < count);
        if i > 0 {
            assert!(record.parent.raw() < i);
            assert!(record.next == NodeIdx::ROOT || record.next.raw() > i);
        }
    }
}

#[test]
fn test_header_offsets_are_running_totals() {
    let config = EncoderConfig::builder().file_name("main.ts").build();
    let buf = encode_document(&import_document(), &config).unwrap();
    let [metadata, offsets, data, extended, nodes] = header_words(&buf);
    let tree = EncodedTree::parse(&buf).unwrap();

    assert_eq!(metadata >> 24, 1);
    assert_eq!(offsets as usize, HEADER_SIZE);
    assert_eq!(data - offsets, tree.string_count() * 8);
    // source text plus "main.ts" and an empty id
    assert_eq!((extended - data) as usize, 26 + 7);
    // one source-file entry of three words
    assert_eq!(nodes - extended, 16);
    assert_eq!(buf.len() - nodes as usize, tree.node_count() as usize * NODE_SIZE);
    assert!(offsets < data && data < extended && extended < nodes);
}

#[test]
fn test_source_info_on_root() {
    let config = EncoderConfig::builder().file_name("main.ts").source_id("42").build();
    let buf = encode_document(&import_document(), &config).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    tree.verify().unwrap();

    let NodeData::Extended(offset) = tree.node(NodeIdx::ROOT).unwrap().data else {
        panic!("expected extended data on the root");
    };
    let words = tree.extended(offset).unwrap();
    let texts: Vec<_> = words
        .iter()
        .map(|&w| tree.string(StrIdx::from_raw(w)).unwrap())
        .collect();
    assert_eq!(texts, vec!["import { bar } from \"bar\";", "main.ts", "42"]);
}

#[test]
fn test_batch_matches_sequential() {
    let documents: Vec<_> = (0..16)
        .map(|i| {
            let source = format!("n{}", i);
            let len = source.len() as u32;
            let ident = node(IDENTIFIER, 0, len).with_text(&source);
            let root = node(SOURCE_FILE, 0, len).with_child(TreeChild::Node(ident));
            TreeDocument::new(source, root)
        })
        .collect();
    let config = EncoderConfig::default();
    let batch = encode_all(&documents, &config);
    assert_eq!(batch.len(), documents.len());
    for (document, buf) in documents.iter().zip(batch) {
        assert_eq!(buf.unwrap(), encode_document(document, &config).unwrap());
    }
}

#[test]
fn test_flags_wider_than_six_bits_fail() {
    let ident = node(IDENTIFIER, 0, 1).with_flags(0x40);
    let root = node(SOURCE_FILE, 0, 1).with_child(TreeChild::Node(ident));
    let err = encode("x", &root, &EncoderConfig::default()).unwrap_err();
    assert_eq!(
        err,
        EncodeError::CapacityExceeded {
            limit: Limit::NodeFlags,
            value: 0x40
        }
    );
}

#[test]
fn test_deep_tree_does_not_recurse() {
    let depth = 50_000;
    let source = "x";
    let mut current = node(IDENTIFIER, 0, 1).with_text("x");
    for _ in 0..depth {
        current = node(BLOCK, 0, 1).with_child(TreeChild::Node(current));
    }
    let root = node(SOURCE_FILE, 0, 1).with_child(TreeChild::Node(current));
    let buf = encode(source, &root, &EncoderConfig::default()).unwrap();
    let tree = EncodedTree::parse(&buf).unwrap();
    assert_eq!(tree.node_count(), depth + 2);
    assert_eq!(tree.text(NodeIdx::from_raw(depth + 1)).unwrap(), Some("x"));
    // Dropping the nested TreeNode recurses, so leak it.
    std::mem::forget(root);
}
