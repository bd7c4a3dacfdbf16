//! # charter-types
//!
//! Primitive identifiers shared by the Charter execution environment and the
//! protocol deployer:
//!
//! - [`Address`]: 20-byte account address with deterministic derivation
//! - [`Node`]: hierarchical naming node, `child = H(parent ‖ H(label))`
//! - [`Permission`]: permission identifiers of the governed components
//! - [`VersionTag`]: `(release, build)` of a published extension version

#![deny(unsafe_code)]

pub mod address;
pub mod error;
pub mod node;
pub mod permission;
pub mod version;

pub use address::Address;
pub use error::TypeError;
pub use node::{label_hash, Node};
pub use permission::Permission;
pub use version::VersionTag;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn address_hex_roundtrip(bytes in any::<[u8; 20]>()) {
            let addr = Address::from_bytes(bytes);
            prop_assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
        }

        #[test]
        fn node_derivation_is_pure(labels in prop::collection::vec("[a-z0-9-]{1,12}", 1..4)) {
            let name = labels.join(".");
            prop_assert_eq!(Node::from_name(&name), Node::from_name(&name));
        }
    }
}
