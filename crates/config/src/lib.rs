//! Process configuration.
//!
//! Everything is read from the environment. The binary loads a `.env` file
//! into the environment first, so both sources work the same way.

pub mod error;
pub mod relay;

pub use {
    error::{Error, Result},
    relay::{
        DEFAULT_LINK_CAPACITY, DEFAULT_LINK_TTL, DEFAULT_ROUTING_FILE, DEFAULT_SESSION_TTL,
        RelayConfig, vars,
    },
};
