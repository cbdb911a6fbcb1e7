//! # Hexabus
//!
//! Wire protocol, device model and UDP transports for the Hexabus home-automation
//! bus.
//!
//! ## Layers
//! - [`core`]: packet codec, checksum and typed values; pure, no I/O
//! - [`protocol`]: [`Device`] and [`Endpoint`], discovery and typed read/write
//! - [`transport`]: [`Hexabus`], a correlating request/response transport
//! - [`service`]: [`HexabusServer`], a broadcast listener with per-listener threads
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and counters
//!
//! ## Quick Start
//! ```rust,no_run
//! use hexabus::{Device, Hexabus, HexabusServer, ReceivedPacket};
//! use std::sync::Arc;
//!
//! # fn main() -> hexabus::Result<()> {
//! // Poll a device
//! let bus = Arc::new(Hexabus::new()?);
//! let mut plug = Device::new(Arc::clone(&bus), "192.168.1.20:61616".parse().unwrap());
//! plug.fetch_endpoints()?;
//! for endpoint in plug.endpoints() {
//!     println!("{endpoint}");
//! }
//! let on: bool = plug.query(1)?;
//! plug.write(1, !on)?;
//!
//! // Watch broadcasts
//! let server = HexabusServer::new()?;
//! server.register(|packet: ReceivedPacket| println!("{packet}"))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::core::packet::{Packet, ReceivedPacket};
pub use crate::core::types::{DataType, ErrorCode, PacketType};
pub use crate::core::value::{DateTime, HexabusValue, Timestamp, Value};
pub use config::HexabusConfig;
pub use error::{HexabusError, MalformedPacket, Result};
pub use protocol::{Device, Endpoint};
pub use service::{HexabusListener, HexabusServer, ListenerId, OverflowPolicy};
pub use transport::{Hexabus, Transport};
