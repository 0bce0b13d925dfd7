//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room membership, relay fan-out and persistence so the
//! route handler can stay focused on protocol translation.

pub mod chat;
pub mod relay;
pub mod room;
pub mod store;
