//! Pin mirroring core: event filter, mirror rendering and the synchronizer

pub mod filter;
pub mod render;
pub mod sync;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use filter::{FilterDecision, PinEventFilter};
pub use sync::{PinSynchronizer, SyncReport};
pub use transport::ChatTransport;
