//! # Single socket TCP/UDP over ESP-AT
//!
//! [Device](device::Device) exposes TCP and UDP sockets of an ESP-AT modem. The modem supports just a single
//! socket in this mode, so every dial or listen replaces the previous socket.
//!
//! The AT command transport is abstracted by [Transport](transport::Transport).
//! [Adapter](adapter::Adapter) implements it using an ATAT client.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

extern crate alloc;

pub mod adapter;
pub mod address;
pub(crate) mod commands;
pub mod connection;
pub mod device;
#[cfg(feature = "examples")]
pub mod example;
pub(crate) mod responses;
pub mod transport;
pub mod urc;

#[cfg(test)]
mod tests;
