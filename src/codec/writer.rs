// clusterconfig-core/src/codec/writer.rs

use super::buffer::{wire_length, BinaryWriter, ReservedSlot};
use super::format::{NodeType, MAX_NODE_DEPTH};
use crate::error::{Result, SettingsError};
use crate::node::SettingsNode;

/// A node opened by [`NodeWriter::begin_node`] whose content length is still unknown.
#[must_use = "an open node must be closed with end_node"]
pub struct OpenNode {
    length: ReservedSlot,
}

/// Node-level encoder.
pub struct NodeWriter {
    writer: BinaryWriter,
}

impl NodeWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writer: BinaryWriter::with_capacity(capacity),
        }
    }

    pub fn inner_mut(&mut self) -> &mut BinaryWriter {
        &mut self.writer
    }

    /// Writes the type tag and reserves the content length.
    pub fn begin_node(&mut self, node_type: NodeType) -> Result<OpenNode> {
        self.writer.write_u8(node_type.tag())?;
        let length = self.writer.reserve_i32()?;
        Ok(OpenNode { length })
    }

    /// Back-fills the content length of `node` from the current position.
    pub fn end_node(&mut self, node: OpenNode) -> Result<()> {
        let content_length = self.writer.position() - node.length.end();
        node.length.fill(&mut self.writer, wire_length(content_length)?)
    }

    pub fn reserve_count(&mut self) -> Result<ReservedSlot> {
        self.writer.reserve_i32()
    }

    pub fn fill_count(&mut self, slot: ReservedSlot, count: usize) -> Result<()> {
        slot.fill(&mut self.writer, wire_length(count)?)
    }

    pub fn write_key(&mut self, key: &str) -> Result<()> {
        self.writer.write_str(key)
    }

    /// Encodes `node` and its descendants depth-first.
    pub fn write_node(&mut self, node: &SettingsNode, depth: usize) -> Result<()> {
        if depth > MAX_NODE_DEPTH {
            return Err(SettingsError::DepthLimitExceeded(MAX_NODE_DEPTH));
        }

        let open = self.begin_node(NodeType::of(node))?;
        match node {
            SettingsNode::Value(value) => {
                self.writer.write_bytes(value.value().unwrap_or_default().as_bytes())?;
            }
            SettingsNode::Delete(_) => {}
            SettingsNode::Array(array) => {
                self.writer.write_length(array.len())?;
                for child in array.children() {
                    self.write_node(child, depth + 1)?;
                }
            }
            SettingsNode::Object(object) => {
                // Children are held in key order, which is the order the wire requires.
                self.writer.write_length(object.len())?;
                for child in object.children() {
                    let key = child
                        .name()
                        .ok_or_else(|| SettingsError::InvalidArgument("Key can't be null".to_string()))?;
                    self.write_key(key)?;
                    self.write_node(child, depth + 1)?;
                }
            }
        }
        self.end_node(open)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}
