//! Node sources: resolving which collection or subscriptions to use, and
//! fetching their descriptors through a producer.

pub mod fetch;
pub mod producer;
pub mod request;

pub use fetch::{FetchedBatch, fetch_all};
pub use producer::{DirProducer, HttpProducer, NodeProducer, ProducerError};
pub use request::{SourceRef, SourceSelection};
