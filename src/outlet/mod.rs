pub mod client;
pub mod encode;
pub mod runner;

pub use client::{Deliver, DeliveryError, HttpDeliverer};
pub use encode::SyslogEncoder;
pub use runner::{deliver_with_retry, run_outlet, start_outlets, Outcome, RetryPolicy};
