// clusterconfig-core/src/subtree/map_builder.rs

use std::collections::HashMap;
use std::ops::Range;

use log::trace;

use crate::codec::format::{NodeType, MAX_NODE_DEPTH};
use crate::codec::reader::NodeReader;
use crate::common::NodeName;
use crate::error::{Result, SettingsError};
use crate::intern::StringInterner;

/// Index from slash-joined path to the encoded bytes of the node at that path.
///
/// Ranges cover the node's header, so every slice is itself a valid encoded
/// tree. Paths compare case-insensitively; the root is the empty path. Only
/// Object children are indexed: Array elements and Values are leaves here.
/// The map borrows the source buffer and can be shared read-only across threads.
#[derive(Debug, Clone)]
pub struct SubtreesMap<'a> {
    source: &'a [u8],
    ranges: HashMap<NodeName, Range<usize>>,
}

impl<'a> SubtreesMap<'a> {
    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    pub fn range(&self, path: &str) -> Option<Range<usize>> {
        self.ranges.get(&NodeName::from(path)).cloned()
    }

    /// Encoded bytes of the node at `path`.
    pub fn get(&self, path: &str) -> Option<&'a [u8]> {
        self.range(path).map(|range| &self.source[range])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.ranges.contains_key(&NodeName::from(path))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &'a [u8])> + '_ {
        let source = self.source;
        self.ranges
            .iter()
            .map(move |(path, range)| (path.as_str(), &source[range.clone()]))
    }
}

/// Builds a [`SubtreesMap`] in a single depth-first pass without decoding nodes.
pub struct SubtreesMapBuilder<'a, 'i> {
    reader: NodeReader<'a, 'i>,
    source: &'a [u8],
}

impl<'a, 'i> SubtreesMapBuilder<'a, 'i> {
    pub fn new(source: &'a [u8], interner: Option<&'i StringInterner>) -> Self {
        Self {
            reader: NodeReader::new(source, interner),
            source,
        }
    }

    pub fn build(mut self) -> Result<SubtreesMap<'a>> {
        let mut ranges = HashMap::new();
        if !self.source.is_empty() {
            let mut path = String::with_capacity(512);
            self.visit_node(&mut ranges, &mut path, 0)?;
        }
        trace!("Built subtrees map with {} entries.", ranges.len());
        Ok(SubtreesMap {
            source: self.source,
            ranges,
        })
    }

    fn visit_node(&mut self, ranges: &mut HashMap<NodeName, Range<usize>>, path: &mut String, depth: usize) -> Result<()> {
        if depth > MAX_NODE_DEPTH {
            return Err(SettingsError::DepthLimitExceeded(MAX_NODE_DEPTH));
        }

        let start = self.reader.position();
        let header = self.reader.peek_header()?;
        let end = start + header.node_size();
        ranges.insert(NodeName::new(self.reader.intern(path)), start..end);

        if header.node_type != NodeType::Object {
            return self.reader.skip_node();
        }

        self.reader.read_header()?;
        let count = self.reader.read_count()?;
        for _ in 0..count {
            let key = self.reader.read_key()?;
            let parent_len = path.len();
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(key);
            self.visit_node(ranges, path, depth + 1)?;
            path.truncate(parent_len);
        }

        if self.reader.position() != end {
            return Err(SettingsError::Malformed(format!(
                "object at offset {} ends at {} but declares end {}",
                start,
                self.reader.position(),
                end
            )));
        }
        Ok(())
    }
}
