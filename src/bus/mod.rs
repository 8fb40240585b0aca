//! Bus adapter abstraction.
//!
//! The bus adapter owns the hardware (or a stand-in for it) and hands raw transfers
//! to the session loop. The dispatch core never touches the bus directly.

mod channel;
mod replay;

pub use channel::{ChannelBus, FrameSender};
pub use replay::{ReplayBus, format_capture, pacing_period, parse_capture};

use crate::Result;

/// Source of raw frames from the bus.
///
/// Adapters abstract over the hardware peripheral, captured traffic, and in-process
/// injection. Only one call is in flight at a time: the session awaits each
/// `next_frame()` before dispatching and asking for the next one.
#[async_trait::async_trait]
pub trait BusAdapter: Send + 'static {
    /// Prepare the bus for receiving. Called once before the first frame.
    async fn configure(&mut self) -> Result<()>;

    /// Wait for the next raw transfer.
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - Transfer received, possibly of the wrong length
    /// - `Ok(None)` - Bus closed (normal termination)
    /// - `Err(e)` - Transient bus failure
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;

    /// Release the bus. Called once when the session ends.
    async fn stop(&mut self) -> Result<()>;
}
