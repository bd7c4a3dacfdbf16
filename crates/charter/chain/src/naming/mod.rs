//! Hierarchical naming: the name registry, the public resolver and the
//! subdomain registrars that mint names on behalf of the registries.

mod registrar;
mod registry;
mod resolver;

pub use registrar::SubdomainRegistrar;
pub use registry::{NameRegistry, NodeRecord};
pub use resolver::PublicResolver;
