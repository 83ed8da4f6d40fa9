pub mod backpressure;
pub mod batch;
pub mod batcher;
pub mod channel;
pub mod pool;

pub use backpressure::{offer, Admission};
pub use batch::{Batch, BatchBuilder, CloseReason};
pub use batcher::{run_batcher, start_batchers, BatcherSettings};
pub use channel::{create_channel, create_shared_channel, Receiver, Sender, SharedReceiver};
pub use pool::WorkerPool;
