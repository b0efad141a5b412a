//! Node Operations
//!
//! Coordination on top of `NodeService` for callers that need stronger
//! ordering guarantees than the service gives on its own.

pub mod sibling_queue;

pub use sibling_queue::SiblingOperationQueue;
