// clusterconfig-core/src/node/definition.rs

use std::cmp::Ordering;
use std::fmt;

use log::warn;

use crate::common::{compare_names, compare_optional_names, optional_names_equal, SharedStr};

/// A node of a settings tree.
///
/// Nodes are immutable values: every transform (merge, patch, decode) builds a
/// new tree. `Delete` is a tombstone that only ever appears inside patches.
#[derive(Debug, Clone)]
pub enum SettingsNode {
    /// Named children, unique and ordered by case-insensitive name.
    Object(ObjectNode),
    /// Ordered children, named by their position.
    Array(ArrayNode),
    /// A string leaf.
    Value(ValueNode),
    /// Patch tombstone: removes the node with the same name.
    Delete(DeleteNode),
}

/// A string leaf. An absent value is distinct from an empty one in memory but
/// both encode as an empty string.
#[derive(Debug, Clone)]
pub struct ValueNode {
    name: Option<SharedStr>,
    value: Option<SharedStr>,
}

/// Ordered children. Each child is named after its index.
#[derive(Debug, Clone)]
pub struct ArrayNode {
    name: Option<SharedStr>,
    children: Vec<SettingsNode>,
}

/// Children keyed by name.
///
/// The children vector is kept sorted by case-insensitive ordinal name with
/// unnamed children first, and holds at most one child per name.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    name: Option<SharedStr>,
    children: Vec<SettingsNode>,
}

#[derive(Debug, Clone)]
pub struct DeleteNode {
    name: Option<SharedStr>,
}

impl ValueNode {
    pub fn new(name: Option<SharedStr>, value: Option<SharedStr>) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn shared_value(&self) -> Option<&SharedStr> {
        self.value.as_ref()
    }
}

impl ArrayNode {
    /// Builds an array, renaming every child to its index.
    pub fn new(name: Option<SharedStr>, children: Vec<SettingsNode>) -> Self {
        let children = children
            .into_iter()
            .enumerate()
            .map(|(index, child)| {
                if child.name() == Some(index.to_string().as_str()) {
                    child
                } else {
                    child.with_name(Some(SharedStr::from(index.to_string())))
                }
            })
            .collect();
        Self { name, children }
    }

    /// Builds an array from children already named by position (decoder path).
    pub(crate) fn from_indexed(name: Option<SharedStr>, children: Vec<SettingsNode>) -> Self {
        Self { name, children }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shared_name(&self) -> Option<&SharedStr> {
        self.name.as_ref()
    }

    pub fn children(&self) -> &[SettingsNode] {
        &self.children
    }

    pub fn get(&self, index: usize) -> Option<&SettingsNode> {
        self.children.get(index)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_children(self) -> Vec<SettingsNode> {
        self.children
    }
}

impl ObjectNode {
    /// Builds an object. Children are ordered by name; when two children share
    /// a name (ignoring case) the later one wins.
    pub fn new(name: Option<SharedStr>, mut children: Vec<SettingsNode>) -> Self {
        let already_canonical = children
            .windows(2)
            .all(|pair| compare_optional_names(pair[0].name(), pair[1].name()) == Ordering::Less);
        if already_canonical {
            return Self { name, children };
        }

        children.sort_by(|a, b| compare_optional_names(a.name(), b.name()));
        let mut unique: Vec<SettingsNode> = Vec::with_capacity(children.len());
        for child in children {
            if let Some(last) = unique.last_mut() {
                if compare_optional_names(last.name(), child.name()) == Ordering::Equal {
                    warn!(
                        "Duplicate object key {:?} in node {:?}; keeping the last occurrence.",
                        child.name(),
                        name
                    );
                    *last = child;
                    continue;
                }
            }
            unique.push(child);
        }
        Self { name, children: unique }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shared_name(&self) -> Option<&SharedStr> {
        self.name.as_ref()
    }

    pub fn children(&self) -> &[SettingsNode] {
        &self.children
    }

    /// Case-insensitive child lookup.
    pub fn get(&self, key: &str) -> Option<&SettingsNode> {
        self.children
            .binary_search_by(|child| match child.name() {
                None => Ordering::Less,
                Some(name) => compare_names(name, key),
            })
            .ok()
            .map(|index| &self.children[index])
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_children(self) -> Vec<SettingsNode> {
        self.children
    }
}

impl DeleteNode {
    pub fn new(name: Option<SharedStr>) -> Self {
        Self { name }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl SettingsNode {
    pub fn value(name: impl Into<SharedStr>, value: impl Into<SharedStr>) -> Self {
        SettingsNode::Value(ValueNode::new(Some(name.into()), Some(value.into())))
    }

    pub fn unnamed_value(value: impl Into<SharedStr>) -> Self {
        SettingsNode::Value(ValueNode::new(None, Some(value.into())))
    }

    pub fn array(name: impl Into<SharedStr>, children: Vec<SettingsNode>) -> Self {
        SettingsNode::Array(ArrayNode::new(Some(name.into()), children))
    }

    pub fn unnamed_array(children: Vec<SettingsNode>) -> Self {
        SettingsNode::Array(ArrayNode::new(None, children))
    }

    /// An array of value nodes.
    pub fn array_of_values<I, V>(name: Option<SharedStr>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SharedStr>,
    {
        let children = values
            .into_iter()
            .map(|v| SettingsNode::Value(ValueNode::new(None, Some(v.into()))))
            .collect();
        SettingsNode::Array(ArrayNode::new(name, children))
    }

    pub fn object(name: impl Into<SharedStr>, children: Vec<SettingsNode>) -> Self {
        SettingsNode::Object(ObjectNode::new(Some(name.into()), children))
    }

    /// An unnamed object, the usual shape of a tree root.
    pub fn root(children: Vec<SettingsNode>) -> Self {
        SettingsNode::Object(ObjectNode::new(None, children))
    }

    pub fn delete(name: impl Into<SharedStr>) -> Self {
        SettingsNode::Delete(DeleteNode::new(Some(name.into())))
    }

    pub fn unnamed_delete() -> Self {
        SettingsNode::Delete(DeleteNode::new(None))
    }

    pub fn name(&self) -> Option<&str> {
        self.shared_name().map(|name| &**name)
    }

    pub fn shared_name(&self) -> Option<&SharedStr> {
        match self {
            SettingsNode::Object(node) => node.name.as_ref(),
            SettingsNode::Array(node) => node.name.as_ref(),
            SettingsNode::Value(node) => node.name.as_ref(),
            SettingsNode::Delete(node) => node.name.as_ref(),
        }
    }

    /// The leaf value; `None` for every variant but `Value`.
    pub fn value_str(&self) -> Option<&str> {
        match self {
            SettingsNode::Value(node) => node.value(),
            _ => None,
        }
    }

    pub fn children(&self) -> &[SettingsNode] {
        match self {
            SettingsNode::Object(node) => &node.children,
            SettingsNode::Array(node) => &node.children,
            SettingsNode::Value(_) | SettingsNode::Delete(_) => &[],
        }
    }

    /// Child lookup: by name for objects, by decimal index for arrays.
    pub fn child(&self, name: &str) -> Option<&SettingsNode> {
        match self {
            SettingsNode::Object(node) => node.get(name),
            SettingsNode::Array(node) => name.parse::<usize>().ok().and_then(|i| node.get(i)),
            SettingsNode::Value(_) | SettingsNode::Delete(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    pub fn is_object(&self) -> bool {
        matches!(self, SettingsNode::Object(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, SettingsNode::Delete(_))
    }

    /// True if this node or any descendant is a `Delete` tombstone.
    pub fn contains_delete(&self) -> bool {
        self.is_delete() || self.children().iter().any(SettingsNode::contains_delete)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SettingsNode::Object(_) => "object",
            SettingsNode::Array(_) => "array",
            SettingsNode::Value(_) => "value",
            SettingsNode::Delete(_) => "delete",
        }
    }

    pub(crate) fn same_variant(&self, other: &SettingsNode) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Returns a copy of this node carrying `name`.
    pub fn with_name(self, name: Option<SharedStr>) -> SettingsNode {
        match self {
            SettingsNode::Object(node) => SettingsNode::Object(ObjectNode { name, ..node }),
            SettingsNode::Array(node) => SettingsNode::Array(ArrayNode { name, ..node }),
            SettingsNode::Value(node) => SettingsNode::Value(ValueNode { name, ..node }),
            SettingsNode::Delete(_) => SettingsNode::Delete(DeleteNode { name }),
        }
    }

    /// Walks Object children along `path`, ignoring case.
    ///
    /// Matches the codec's path decode: only Object levels can be entered, so a
    /// path continuing into an Array or Value yields `None`.
    pub fn scope_to<I, S>(&self, path: I) -> Option<&SettingsNode>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self;
        for segment in path {
            match current {
                SettingsNode::Object(node) => current = node.get(segment.as_ref())?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Depth-first iterator over this node and all descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SettingsNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SettingsNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

impl PartialEq for SettingsNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SettingsNode::Object(a), SettingsNode::Object(b)) => a == b,
            (SettingsNode::Array(a), SettingsNode::Array(b)) => a == b,
            (SettingsNode::Value(a), SettingsNode::Value(b)) => a == b,
            (SettingsNode::Delete(a), SettingsNode::Delete(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SettingsNode {}

impl PartialEq for ValueNode {
    fn eq(&self, other: &Self) -> bool {
        optional_names_equal(self.name(), other.name()) && self.value == other.value
    }
}

impl PartialEq for ArrayNode {
    fn eq(&self, other: &Self) -> bool {
        optional_names_equal(self.name(), other.name()) && self.children == other.children
    }
}

impl PartialEq for ObjectNode {
    // Both sides are sorted by name, so comparing in order compares the key sets.
    fn eq(&self, other: &Self) -> bool {
        optional_names_equal(self.name(), other.name()) && self.children == other.children
    }
}

impl PartialEq for DeleteNode {
    fn eq(&self, other: &Self) -> bool {
        optional_names_equal(self.name(), other.name())
    }
}

impl From<ObjectNode> for SettingsNode {
    fn from(node: ObjectNode) -> Self {
        SettingsNode::Object(node)
    }
}

impl From<ArrayNode> for SettingsNode {
    fn from(node: ArrayNode) -> Self {
        SettingsNode::Array(node)
    }
}

impl From<ValueNode> for SettingsNode {
    fn from(node: ValueNode) -> Self {
        SettingsNode::Value(node)
    }
}

impl From<DeleteNode> for SettingsNode {
    fn from(node: DeleteNode) -> Self {
        SettingsNode::Delete(node)
    }
}

impl fmt::Display for SettingsNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsNode::Value(node) => match node.value() {
                Some(value) => write!(f, "{:?}", value),
                None => f.write_str("null"),
            },
            SettingsNode::Array(node) => {
                f.write_str("[")?;
                for (i, child) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str("]")
            }
            SettingsNode::Object(node) => {
                f.write_str("{")?;
                for (i, child) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", child.name().unwrap_or("<unnamed>"), child)?;
                }
                f.write_str("}")
            }
            SettingsNode::Delete(_) => f.write_str("DELETE"),
        }
    }
}
