//! # Device Protocol
//!
//! Client-side view of Hexabus devices built on top of a [`Transport`](crate::transport::Transport).
//!
//! ## Components
//! - **Device**: endpoint registry, discovery, typed query and write
//! - **Endpoint**: one addressable value of a device

pub mod device;
pub mod endpoint;

pub use device::Device;
pub use endpoint::Endpoint;
