// clusterconfig-core/src/codec/reader.rs

use std::cmp::Ordering;

use log::trace;

use super::buffer::{BinaryReader, BinaryWriter};
use super::format::{NodeHeader, NodeType, HEADER_SIZE, MAX_NODE_DEPTH};
use crate::common::{compare_names, SharedStr};
use crate::error::{Result, SettingsError};
use crate::intern::StringInterner;
use crate::node::{ArrayNode, DeleteNode, ObjectNode, SettingsNode, ValueNode};

/// Node-level decoder over an encoded tree.
///
/// Wraps a [`BinaryReader`] with the operations every consumer of the format
/// needs: header peeking, skipping and copying whole nodes without decoding
/// them, full decode, and path-scoped decode.
pub struct NodeReader<'a, 'i> {
    reader: BinaryReader<'a>,
    interner: Option<&'i StringInterner>,
}

impl<'a, 'i> NodeReader<'a, 'i> {
    pub fn new(buffer: &'a [u8], interner: Option<&'i StringInterner>) -> Self {
        Self {
            reader: BinaryReader::new(buffer),
            interner,
        }
    }

    pub fn position(&self) -> usize {
        self.reader.position()
    }

    pub fn is_exhausted(&self) -> bool {
        self.reader.is_exhausted()
    }

    pub fn peek_header(&mut self) -> Result<NodeHeader> {
        self.reader.peek_header()
    }

    /// Reads a header and checks that the node's content is fully present.
    pub fn read_header(&mut self) -> Result<NodeHeader> {
        let header = self.reader.read_header()?;
        self.reader.ensure(header.length)?;
        Ok(header)
    }

    /// Reads a header that must be of type `expected`.
    pub fn expect_header(&mut self, expected: NodeType) -> Result<NodeHeader> {
        let header = self.read_header()?;
        if header.node_type != expected {
            return Err(SettingsError::UnexpectedNodeType {
                expected,
                found: header.node_type,
            });
        }
        Ok(header)
    }

    /// Reads the `i32` child count that opens Object and Array content.
    pub fn read_count(&mut self) -> Result<usize> {
        self.reader.read_length()
    }

    /// Reads an Object key, borrowed from the source buffer.
    pub fn read_key(&mut self) -> Result<&'a str> {
        self.reader.read_str()
    }

    /// Advances past the next node without decoding it.
    pub fn skip_node(&mut self) -> Result<()> {
        let header = self.read_header()?;
        self.reader.skip(header.length)
    }

    /// Returns the next whole encoded node (header included) and advances past it.
    pub fn node_bytes(&mut self) -> Result<&'a [u8]> {
        let header = self.reader.peek_header()?;
        self.reader.read_slice(header.node_size())
    }

    /// Copies the next node verbatim into `writer`.
    pub fn copy_node_to(&mut self, writer: &mut BinaryWriter) -> Result<()> {
        let bytes = self.node_bytes()?;
        writer.write_bytes(bytes)
    }

    pub fn intern(&self, value: &str) -> SharedStr {
        match self.interner {
            Some(interner) => interner.intern(value),
            None => SharedStr::from(value),
        }
    }

    /// Decodes the next node, naming it `name`.
    pub fn read_node(&mut self, name: Option<SharedStr>, depth: usize) -> Result<SettingsNode> {
        if depth > MAX_NODE_DEPTH {
            return Err(SettingsError::DepthLimitExceeded(MAX_NODE_DEPTH));
        }

        let start = self.position();
        let header = self.read_header()?;

        let node = match header.node_type {
            NodeType::Value => {
                let offset = self.position();
                let bytes = self.reader.read_slice(header.length)?;
                let value = std::str::from_utf8(bytes).map_err(|e| {
                    SettingsError::Malformed(format!("invalid UTF-8 value at offset {}: {}", offset, e))
                })?;
                SettingsNode::Value(ValueNode::new(name, Some(self.intern(value))))
            }
            NodeType::Delete => {
                self.reader.skip(header.length)?;
                SettingsNode::Delete(DeleteNode::new(name))
            }
            NodeType::Array => {
                let count = self.read_count()?;
                let mut children = Vec::with_capacity(self.bounded_capacity(count));
                for index in 0..count {
                    let child_name = self.intern(&index.to_string());
                    children.push(self.read_node(Some(child_name), depth + 1)?);
                }
                SettingsNode::Array(ArrayNode::from_indexed(name, children))
            }
            NodeType::Object => {
                let count = self.read_count()?;
                let mut children = Vec::with_capacity(self.bounded_capacity(count));
                for _ in 0..count {
                    let key = self.read_key()?;
                    let key = self.intern(key);
                    children.push(self.read_node(Some(key), depth + 1)?);
                }
                SettingsNode::Object(ObjectNode::new(name, children))
            }
        };

        self.ensure_node_end(start, header)?;
        Ok(node)
    }

    /// Checks that the node that began at `start` ended exactly where its header said.
    pub fn ensure_node_end(&self, start: usize, header: NodeHeader) -> Result<()> {
        if self.position() != start + header.node_size() {
            return Err(SettingsError::Malformed(format!(
                "{:?} node at offset {} declares {} content bytes but spans {}",
                header.node_type,
                start,
                header.length,
                self.position().saturating_sub(start + HEADER_SIZE)
            )));
        }
        Ok(())
    }

    /// Fails with `Malformed` if anything follows the root node.
    pub fn ensure_exhausted(&self) -> Result<()> {
        if !self.is_exhausted() {
            return Err(SettingsError::Malformed(format!(
                "{} trailing bytes after root node",
                self.reader.remaining()
            )));
        }
        Ok(())
    }

    /// Decodes only the node found by walking `path` through Object keys.
    ///
    /// Returns `Ok(None)` when a segment is missing or the walk reaches a
    /// non-Object node with segments left. Siblings passed on the way are
    /// skipped by their content length, never decoded.
    pub fn read_node_at_path<S: AsRef<str>>(
        &mut self,
        path: &[S],
        name: Option<SharedStr>,
        depth: usize,
    ) -> Result<Option<SettingsNode>> {
        let Some((segment, rest)) = path.split_first() else {
            return self.read_node(name, depth).map(Some);
        };
        if depth > MAX_NODE_DEPTH {
            return Err(SettingsError::DepthLimitExceeded(MAX_NODE_DEPTH));
        }

        let header = self.read_header()?;
        if header.node_type != NodeType::Object {
            trace!("Path segment {:?} reached a {:?} node; nothing to descend into.", segment.as_ref(), header.node_type);
            return Ok(None);
        }

        let count = self.read_count()?;
        for _ in 0..count {
            let key = self.read_key()?;
            match compare_names(key, segment.as_ref()) {
                Ordering::Equal => {
                    let key = self.intern(key);
                    return self.read_node_at_path(rest, Some(key), depth + 1);
                }
                // Keys are sorted; once past the segment it cannot appear.
                Ordering::Greater => return Ok(None),
                Ordering::Less => self.skip_node()?,
            }
        }
        Ok(None)
    }

    // Every child takes at least a header, so a count larger than that is corrupt
    // and must not drive the allocation.
    fn bounded_capacity(&self, count: usize) -> usize {
        count.min(self.reader.remaining() / HEADER_SIZE)
    }
}
