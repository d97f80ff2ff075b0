//! Routing table: which chats are relayed from, which chats receive.
//!
//! The table is a flat record of source and destination routes. It is loaded
//! once at startup through a [`RoutingBackend`], kept in memory by
//! [`RoutingStore`], and written back after every mutation.

pub mod backend;
pub mod backend_file;
pub mod backend_memory;
pub mod error;
pub mod render;
pub mod route;
pub mod store;

pub use {
    backend::RoutingBackend,
    backend_file::JsonFileBackend,
    backend_memory::MemoryBackend,
    error::{Error, Result},
    render::render_table,
    route::{Route, RoutingTable, normalize_chat_id},
    store::RoutingStore,
};
