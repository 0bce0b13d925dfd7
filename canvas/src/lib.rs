//! Client-side canvas model for the collaborative whiteboard.
//!
//! Every client keeps its own replica of the room's object list. Local edits
//! are applied here first and handed back to the host as [`engine::Action`]s
//! for relaying; edits received from peers come back in as
//! [`store::RemoteChange`]s and flow through the same store operations. The
//! crate has no network or UI dependencies.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::EngineCore`]: tools, gestures, shortcuts, actions |
//! | [`store`] | Object list replica, selection, remote application, snapshots |
//! | [`history`] | Undo/redo stacks of whole object-list snapshots |
//! | [`doc`] | Canvas object types and sparse patches |
//! | [`gesture`] | In-progress object between pointer-down and pointer-up |
//! | [`input`] | Points, tools, modifier keys and keyboard shortcuts |
//! | [`style`] | Per-client tool styles applied to new objects |
//! | [`consts`] | Default sizes and colors |

pub mod consts;
pub mod doc;
pub mod engine;
pub mod gesture;
pub mod history;
pub mod input;
pub mod store;
pub mod style;
