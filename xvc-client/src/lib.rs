//! # XVC Client
//!
//! A Rust client library for connecting to Xilinx Virtual Cable (XVC) servers
//! and performing remote JTAG operations on FPGA devices.
//!
//! ## Overview
//!
//! This crate provides a high-level client interface to XVC servers, allowing applications
//! to interact with FPGA debug interfaces over network connections. It handles protocol
//! communication, message serialization, and provides convenient methods for JTAG operations.
//!
//! ## Protocol Support
//!
//! This implementation supports the XVC 1.0 protocol with the following operations:
//!
//! - **GetInfo**: Query server capabilities (version, max vector size)
//! - **SetTck**: Configure the JTAG Test Clock (TCK) period
//! - **Shift**: Perform JTAG vector shifting (TMS/TDI/TDO)
//!
//! For detailed protocol information, see the [`xvc_protocol`](https://docs.rs/xvc-protocol/) crate.
//!
//! ## Basic Usage
//!
//! ### Connecting to a Server
//!
//! ```ignore
//! use xvc_client::XvcClient;
//! use std::net::SocketAddr;
//!
//! let mut client = XvcClient::new("127.0.0.1:2542")?;
//!
//! // Query server capabilities
//! let info = client.get_info()?;
//! println!("Server version: {}", info.version());
//! println!("Max vector size: {} bytes", info.max_vector_len());
//! ```
//!
//! ### Setting Clock Frequency
//!
//! ```ignore
//! // Set TCK period to 10 nanoseconds
//! let actual_period = client.set_tck(10)?;
//! println!("Set TCK to {} ns", actual_period);
//! ```
//!
//! ### Performing JTAG Shifts
//!
//! ```ignore
//! // Perform a 8-bit JTAG shift
//! let num_bits = 8;
//! let tms = vec![0x00]; // Test Mode Select vector
//! let tdi = vec![0xA5]; // Test Data In vector
//!
//! let tdo = client.shift(num_bits, &tms, &tdi)?;
//! println!("TDO data: {:?}", tdo);
//! ```
//!
//! ### Walking the TAP State Machine
//!
//! [`XvcClient::shift_bits`] takes one `bool` per TCK cycle, which is handier for
//! short state transitions than packed vectors:
//!
//! ```ignore
//! // Test-Logic-Reset, then Run-Test/Idle
//! client.shift_bits(&[true, true, true, true, true, false], &[false; 6])?;
//! ```
//!
//! ## Related Crates
//!
//! - [`xvc_server`](https://docs.rs/xvc-server/) - Server implementation
//! - [`xvc_protocol`](https://docs.rs/xvc-protocol/) - Protocol encoding/decoding
//! - [`xvc_sim`](https://docs.rs/xvc-sim/) - Simulated JTAG device to test against
use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
};

use xvc_protocol::{Message, XvcInfo, bits, error::ReadError};

/// XVC client for remote JTAG operations.
///
/// Connects to an XVC server and provides methods for JTAG operations.
pub struct XvcClient {
    tcp: TcpStream,
}

impl XvcClient {
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<XvcClient> {
        let tcp = TcpStream::connect(addr)?;
        // Every command waits for its answer
        tcp.set_nodelay(true)?;
        Ok(XvcClient { tcp })
    }

    /// Query server capabilities and version information.
    pub fn get_info(&mut self) -> Result<XvcInfo, ReadError> {
        self.send(Message::GetInfo)?;
        XvcInfo::from_reader(&mut self.tcp)
    }

    /// Set the JTAG Test Clock (TCK) period.
    /// # Returns
    ///
    /// The actual TCK period set by the server.
    // May differ from requested, if the server does not support the requested rate.
    pub fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        self.send(Message::SetTck { period_ns })?;
        let mut buf = [0u8; 4];
        self.tcp.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Perform a JTAG shift operation.
    ///
    /// # Arguments
    ///
    /// * `num_bits` - Number of bits to shift
    /// * `tms` - Test Mode Select vector (length must be ⌈num_bits / 8⌉)
    /// * `tdi` - Test Data In vector (length must be ⌈num_bits / 8⌉)
    ///
    /// # Returns
    ///
    /// Test Data Out vector from the JTAG chain of the same length as `tms` and `tdi`.
    pub fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Box<[u8]>> {
        self.send(Message::Shift {
            num_bits,
            tms: tms.into(),
            tdi: tdi.into(),
        })?;
        let mut buf = vec![0; bits::byte_len(num_bits as usize)];
        self.tcp.read_exact(&mut buf)?;
        Ok(buf.into_boxed_slice())
    }

    /// Perform a JTAG shift operation with one TMS and TDI value per TCK cycle.
    ///
    /// # Returns
    ///
    /// The TDO value sampled in each cycle.
    pub fn shift_bits(&mut self, tms: &[bool], tdi: &[bool]) -> io::Result<Vec<bool>> {
        if tms.len() != tdi.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} TMS bits but {} TDI bits", tms.len(), tdi.len()),
            ));
        }
        let num_bits = u32::try_from(tms.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let tdo = self.shift(num_bits, &bits::pack(tms), &bits::pack(tdi))?;
        Ok(bits::unpack(tms.len(), &tdo))
    }

    fn send(&mut self, message: Message) -> io::Result<()> {
        message.write_to(&mut self.tcp)?;
        self.tcp.flush()
    }
}
