//! # Core Protocol Components
//!
//! Pure packet handling: no sockets, no threads.
//!
//! ## Components
//! - **crc**: the 16-bit checksum closing every packet
//! - **types**: packet types, data types and error codes
//! - **value**: typed endpoint values and their fixed-width payloads
//! - **packet**: the six packet variants and their codec
//!
//! ## Wire Format
//! ```text
//! [Header 0x48583042(4)] [Type(1)] [Flags(1)] [Body(N)] [CRC16(2)]
//! ```
//!
//! ## Limits
//! - Largest packet: 138 bytes (an `EndpointInfo` or a `STRING` value)
//! - Smallest packet: 9 bytes (`Error`, `Query`, `EndpointQuery`)

pub mod crc;
pub mod packet;
pub mod types;
pub mod value;
