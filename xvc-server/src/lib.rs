//! # XVC Server Library
//!
//! This crate provides a foundation for implementing Xilinx Virtual Cable (XVC) servers
//! that drive a JTAG device on behalf of remote host tools.
//!
//! ## Overview
//!
//! XVC is a protocol used by Xilinx design tools to interact with FPGA devices remotely.
//! This library abstracts the protocol handling and provides a server implementation that
//! can work with any device that can be clocked with TMS and TDI vectors: a hardware
//! debug bridge or a simulated TAP controller.
//!
//! ## Architecture
//!
//! The crate is built around two main components:
//!
//! - **[`XvcBackend`] Trait**: Defines the interface that devices must implement
//!   to handle low-level JTAG operations (TCK configuration and vector shifting)
//! - **[`server::Server`]**: An async server that handles XVC protocol communication,
//!   message parsing, and client connections
//!
//! ## How It Works
//!
//! 1. A device implements the [`XvcBackend`] trait
//! 2. The device is moved into a [`server::Server`], which owns it behind a mutex
//! 3. The server accepts TCP connections and runs one task per connection
//! 4. Each message is decoded, dispatched to the device while holding the lock, and answered
//! 5. Every answer is flushed before the next message of that connection is read
//!
//! All connections share the same device. Commands from different connections are
//! serialized, but they interleave freely, so host tools should not drive the same
//! device from several connections at once.
//!
//! ## Basic Usage
//!
//! ### Implementing a Backend
//!
//! ```ignore
//! use xvc_server::XvcBackend;
//!
//! struct MyDevice {
//!     // device-specific fields
//! }
//!
//! impl XvcBackend for MyDevice {
//!     fn set_tck(&mut self, period_ns: u32) -> u32 {
//!         period_ns
//!     }
//!
//!     fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> Box<[u8]> {
//!         // Clock the device and return TDO data
//!         vec![0; num_bits.div_ceil(8) as usize].into_boxed_slice()
//!     }
//! }
//! ```
//!
//! ### Starting the Server
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use xvc_server::server::{Config, Server};
//!
//! let server = Server::new(MyDevice::new(), Config::default());
//! let shutdown = CancellationToken::new();
//! server.listen("127.0.0.1:2542", shutdown.clone()).await?;
//! ```
//!
//! ## Error Handling
//!
//! The XVC 1.0 protocol has no way to report errors. A connection that sends an unknown
//! command, or a vector longer than the configured `max_shift_bytes`, is closed without
//! an answer. A peer that disconnects,
//! even in the middle of a message, ends its connection quietly. Failing to bind or accept
//! ends [`server::Server::serve`] with an error.
//!
//! ## Configuration
//!
//! Server behavior can be customized via [`server::Config`]:
//!
//! - **max_vector_len**: Vector length advertised by GetInfo (default: 1024)
//! - **max_shift_bytes**: Longest accepted TMS/TDI vector in bytes (default: unlimited)
//! - **read_write_timeout**: Disconnect clients that stay idle this long (default: none)
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see:
//! - Client connections and disconnections
//! - Protocol messages being processed
//! - Raw TMS, TDI and TDO vectors (trace level)
pub mod server;

/// Trait that devices must implement to be driven by an XVC server.
///
/// Implementors translate the packed vectors of the protocol into TCK cycles on the
/// actual (or simulated) JTAG chain.
pub trait XvcBackend: Send + 'static {
    /// Set the TCK (Test Clock) period.
    ///
    /// # Returns
    ///
    /// The TCK period in effect afterwards (in nanoseconds). This may differ from
    /// the requested value if the device has limited frequency resolution.
    fn set_tck(&mut self, period_ns: u32) -> u32;

    /// Clock the device `num_bits` times and return the sampled TDO data.
    ///
    /// Bit `i` of `tms` and `tdi` is bit `i % 8` of byte `i / 8`; both vectors hold
    /// ⌈num_bits / 8⌉ bytes. The returned vector uses the same layout and length,
    /// since the client reads exactly that many bytes. XVC 1.0 has no way to report
    /// a failed shift.
    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> Box<[u8]>;
}
