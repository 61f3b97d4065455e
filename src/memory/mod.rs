//! Memory model for the stack machine
//!
//! This module provides the core memory abstractions:
//! - [`address_space`]: the unified code/stack array with checked access
//! - [`frame`]: activation-record headers and static-chain resolution
//!
//! # Word Size
//!
//! Every cell holds one signed 32-bit machine word. Addresses, links and
//! instruction fields are all stored as words, so a register value can be
//! written to memory and read back unchanged.

pub mod address_space;
pub mod frame;

pub use address_space::{AddressSpace, MemoryError, StackCell};
pub use frame::{activation_records, resolve_base, ActivationRecord, FrameHeader};
