//! Event ingestion half of the pipeline: the inbound queue, the receiver
//! that validates raw payloads, the per-check state machine, and the
//! maintenance manager that owns suppression windows.

pub mod maintenance;
pub mod processor;
pub mod queue;
pub mod receiver;


pub use processor::{Processor, ProcessorSettings};
pub use queue::EventQueue;
pub use receiver::Receiver;
