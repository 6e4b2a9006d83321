// clusterconfig-core/src/codec/format.rs

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, SettingsError};
use crate::node::SettingsNode;

// --- Constants ---
pub const TAG_OBJECT: u8 = 0x01;
pub const TAG_ARRAY: u8 = 0x02;
pub const TAG_VALUE: u8 = 0x03;
pub const TAG_DELETE: u8 = 0x04;

/// Type tag plus content length.
pub const HEADER_SIZE: usize = 1 + 4;

/// Nesting guard for decode, patch and indexing recursion.
pub const MAX_NODE_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    Object = TAG_OBJECT,
    Array = TAG_ARRAY,
    Value = TAG_VALUE,
    Delete = TAG_DELETE,
}

impl NodeType {
    pub fn of(node: &SettingsNode) -> NodeType {
        match node {
            SettingsNode::Object(_) => NodeType::Object,
            SettingsNode::Array(_) => NodeType::Array,
            SettingsNode::Value(_) => NodeType::Value,
            SettingsNode::Delete(_) => NodeType::Delete,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for NodeType {
    type Error = SettingsError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            TAG_OBJECT => Ok(NodeType::Object),
            TAG_ARRAY => Ok(NodeType::Array),
            TAG_VALUE => Ok(NodeType::Value),
            TAG_DELETE => Ok(NodeType::Delete),
            other => Err(SettingsError::UnknownNodeType(other)),
        }
    }
}

// --- Structures ---

/// The fixed prefix of every encoded node: `[u8 type][i32 LE content length]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub node_type: NodeType,
    /// Length of the content that follows the header, in bytes.
    pub length: usize,
}

impl NodeHeader {
    pub fn new(node_type: NodeType, length: usize) -> Self {
        Self { node_type, length }
    }

    /// Total encoded size of the node this header starts.
    pub fn node_size(&self) -> usize {
        HEADER_SIZE + self.length
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let length = i32::try_from(self.length).map_err(|_| {
            SettingsError::InvalidArgument(format!("node content of {} bytes exceeds i32 range", self.length))
        })?;
        writer.write_u8(self.node_type.tag())?;
        writer.write_i32::<LittleEndian>(length)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let node_type = NodeType::try_from(reader.read_u8()?)?;
        let length = reader.read_i32::<LittleEndian>()?;
        let length = usize::try_from(length)
            .map_err(|_| SettingsError::Malformed(format!("negative node length {}", length)))?;
        Ok(Self { node_type, length })
    }

    pub fn size() -> usize {
        HEADER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_layout_is_tag_then_le_length() {
        let mut bytes = Vec::new();
        NodeHeader::new(NodeType::Array, 0x0102).write_to(&mut bytes).unwrap();
        assert_eq!(bytes, vec![TAG_ARRAY, 0x02, 0x01, 0x00, 0x00]);
        assert_eq!(bytes.len(), NodeHeader::size());

        let header = NodeHeader::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header, NodeHeader::new(NodeType::Array, 0x0102));
        assert_eq!(header.node_size(), 0x0102 + HEADER_SIZE);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let bytes = [0x09u8, 0, 0, 0, 0];
        let err = NodeHeader::read_from(&mut Cursor::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownNodeType(0x09)));
        assert!(matches!(NodeType::try_from(0), Err(SettingsError::UnknownNodeType(0))));
    }

    #[test]
    fn negative_length_is_malformed() {
        let bytes = [TAG_VALUE, 0xff, 0xff, 0xff, 0xff];
        let err = NodeHeader::read_from(&mut Cursor::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, SettingsError::Malformed(_)));
    }

    #[test]
    fn short_header_is_an_io_error() {
        let bytes = [TAG_VALUE, 0x01];
        let err = NodeHeader::read_from(&mut Cursor::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, SettingsError::IoError(_)));
    }
}
