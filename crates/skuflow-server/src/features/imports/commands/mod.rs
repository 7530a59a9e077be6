pub mod enqueue;

pub use enqueue::{EnqueueImportCommand, EnqueueImportError, EnqueueImportResponse};
