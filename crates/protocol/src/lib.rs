//! Wire types for the BI engine protocol.
//!
//! This crate contains the serde-serializable types exchanged with the engine
//! over its JSON-RPC WebSocket session. These types represent the "protocol
//! layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with the wire: Field names follow the engine's `q`-prefixed schema
//! * Stable: Changes only when the wire protocol changes
//!
//! Session handling and result decoding are built on top of these types in
//! `dashtap-runtime` and `dashtap`.

pub mod envelope;
pub mod hypercube;
pub mod rpc;

pub use envelope::*;
pub use hypercube::*;
pub use rpc::*;
