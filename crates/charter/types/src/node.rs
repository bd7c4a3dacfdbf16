use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{decode_hex, encode_hex, TypeError};

/// Hash of a single name label.
pub fn label_hash(label: &str) -> [u8; 32] {
    *blake3::hash(label.as_bytes()).as_bytes()
}

/// A node in the hierarchical naming tree.
///
/// Derivation is a pure function of `(parent, label)`:
/// `child = H(parent ‖ H(label))`. The root node is all zeroes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(pub [u8; 32]);

impl Node {
    pub const ROOT: Node = Node([0u8; 32]);

    /// The child of this node under `label`.
    pub fn child(&self, label: &str) -> Node {
        self.child_of_hash(&label_hash(label))
    }

    /// The child of this node under a pre-hashed label.
    pub fn child_of_hash(&self, label_hash: &[u8; 32]) -> Node {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.0);
        hasher.update(label_hash);
        Node(*hasher.finalize().as_bytes())
    }

    /// Node of a dotted name, e.g. `plugin.dao.eth`. The empty name is the root.
    pub fn from_name(name: &str) -> Node {
        if name.is_empty() {
            return Node::ROOT;
        }
        name.rsplit('.').fold(Node::ROOT, |node, label| node.child(label))
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", encode_hex(&self.0))
    }

    pub fn from_hex(hex: &str) -> Result<Self, TypeError> {
        let digits = hex.strip_prefix("0x").ok_or(TypeError::MissingPrefix)?;
        Ok(Self(decode_hex::<32>(digits)?))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", &self.to_hex()[..14])
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Node::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
