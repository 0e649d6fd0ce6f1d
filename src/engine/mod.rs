// Encoding engine: preset compiler, task runner and queue - independent of the CLI

pub mod control;
pub mod core;
pub mod encoders;
pub mod probe;
pub mod queue;
pub mod runner;

pub use core::*;
pub use encoders::{EncoderEntry, EncoderTable};
pub use queue::{EncodeQueue, QueueStats};
pub use runner::TaskRunner;
