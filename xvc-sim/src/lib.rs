//! # XVC Simulator
//!
//! A simulated JTAG device that host tools (Vivado's hw_server, openFPGALoader, ...)
//! can probe through the Xilinx Virtual Cable (XVC) protocol instead of real hardware.
//!
//! ## Overview
//!
//! - [`tap`]: the 16 state TAP controller
//! - [`instruction`]: the instruction set and the decoder for the instruction register
//! - [`chain`]: the device itself, clocked one TCK edge at a time, and its
//!   [`XvcBackend`](xvc_server::XvcBackend) implementation
//!
//! The device is served with [`xvc_server::server::Server`]:
//!
//! ```ignore
//! use xvc_server::server::{Config, Server};
//! use xvc_sim::chain::Chain;
//!
//! let server = Server::new(Chain::new(), Config::default());
//! server.listen("127.0.0.1:2542", shutdown).await?;
//! ```
//!
//! Register content does not outlive the process. By default data shifted into a
//! register is dropped on Update-DR, see [`chain::UpdatePolicy`].
pub mod chain;
pub mod instruction;
pub mod tap;
