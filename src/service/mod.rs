//! # Service Layer
//!
//! Long-running receivers built on the core codec.
//!
//! ## Components
//! - **HexabusServer**: listens on the well-known port and fans broadcasts out to
//!   registered [`HexabusListener`]s

pub mod server;

pub use server::{HexabusListener, HexabusServer, ListenerId, OverflowPolicy};
