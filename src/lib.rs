//! Packet protocol and dispatch engine for the controller-to-host I2C bridge.
//!
//! The microcontroller driving the farm machine pushes fixed-size packets to the host
//! over I2C. Farmlink checks each transfer, decodes it by packet type, and forwards
//! printer commands to the command stream a printer-host process reads.
//!
//! # Features
//!
//! - **Fixed wire format**: 128-byte frames with a type id, a validity flag, and a
//!   text window, described by a declarative [`FrameSchema`]
//! - **Extensible registry**: each packet type maps to a decoder and a consumer
//! - **Fault tolerant**: malformed frames are counted and skipped, never fatal
//! - **Pluggable buses**: live peripherals, in-process channels and captured traffic
//!   all sit behind [`BusAdapter`]
//!
//! # Wire Format
//!
//! | Bytes     | Field                                   |
//! |-----------|-----------------------------------------|
//! | `0`       | packet type id                          |
//! | `1`       | validity flag (non-zero means valid)    |
//! | `[2, 66)` | NUL-padded UTF-8 command text (COMMAND) |
//! | rest      | unused                                  |
//!
//! ## Example (replay a capture)
//!
//! ```rust,no_run
//! use farmlink::{Bridge, BridgeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> farmlink::Result<()> {
//!     let config = BridgeConfig::load("farmlink.yaml")?;
//!     let session = Bridge::replay("session.cap", &config)?;
//!
//!     let report = session.join().await?;
//!     println!("{} frames, {} homing commands", report.counters.received, report.counters.actioned);
//!     Ok(())
//! }
//! ```

// Wire format and error handling
mod error;
pub mod types;

// Decoding and dispatch
pub mod consumer;
pub mod decoders;
pub mod dispatcher;
pub mod encoder;
pub mod registry;
pub mod sink;

// Bus and session runtime
pub mod bus;
pub mod config;
pub mod session;

#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Core exports
pub use error::*;
pub use types::*;

pub use bus::{BusAdapter, ChannelBus, FrameSender, ReplayBus};
pub use config::BridgeConfig;
pub use consumer::{Action, CommandForwarder, ErrorReporter, PacketConsumer, ReservedConsumer};
pub use decoders::{CommandDecoder, PacketDecoder, ReservedDecoder};
pub use dispatcher::{DispatchOutcome, Dispatcher, SessionCounters, standard_dispatcher};
pub use encoder::{FrameBuilder, encode_command};
pub use registry::PacketRegistry;
pub use session::{Session, SessionEnd, SessionHandle, SessionReport};
pub use sink::{ChannelCommandSink, CommandSink, ErrorSink, FileCommandSink, TracingErrorSink};

use std::path::Path;
use tracing::info;

/// Main entry point for running the bridge.
///
/// Builds the standard dispatcher from a [`BridgeConfig`] and spawns a [`Session`]
/// over the given bus. Commands are appended to the configured command path by a
/// writer task, so a stalled reader never holds up dispatch. ERROR packets are logged.
pub struct Bridge;

impl Bridge {
    /// Start a session over any bus adapter.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use farmlink::{Bridge, BridgeConfig, ChannelBus};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> farmlink::Result<()> {
    /// let (bus, frames) = ChannelBus::new(16);
    /// let session = Bridge::start(bus, &BridgeConfig::default())?;
    ///
    /// frames.send(farmlink::encode_command("G28")?.as_bytes().to_vec()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn start<B: BusAdapter>(bus: B, config: &BridgeConfig) -> Result<SessionHandle> {
        config.validate()?;
        // The writer ends on its own once the sink is dropped, including on error.
        let (commands, writer) =
            FileCommandSink::spawn(&config.sink.command_path, sink::DEFAULT_WRITER_CAPACITY);
        let dispatcher = Dispatcher::with_sinks(config, Box::new(commands), Box::new(TracingErrorSink))?;

        info!(
            address = config.bus.address,
            command_path = %config.sink.command_path.display(),
            "Starting bridge session"
        );
        Ok(Session::spawn(bus, dispatcher, config.session.clone()).attach_writer(writer))
    }

    /// Replay a capture file through the configured dispatcher.
    ///
    /// Transfers are paced at `session.replay_rate_hz` when set.
    pub fn replay<P: AsRef<Path>>(path: P, config: &BridgeConfig) -> Result<SessionHandle> {
        let bus = ReplayBus::open(path)?.with_rate(config.session.replay_rate_hz);
        Self::start(bus, config)
    }
}
