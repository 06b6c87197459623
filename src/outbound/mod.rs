//! Document layer: the routing configuration and its outbound nodes.

pub mod config;
pub mod members;
pub mod node;

pub use config::RoutingConfiguration;
pub use members::merge_unique;
pub use node::{NodeKind, OutboundNode};
