//! Stdio tool invocation.
//!
//! One request/response exchange with an independently launched stage
//! process, over newline-delimited JSON-RPC with an MCP-style handshake.
//! `channel` is the calling half, `server` the serving half; both speak the
//! wire shapes in `protocol`.

pub mod channel;
pub mod protocol;
pub mod server;

pub use channel::{ServerSpec, ToolChannel};
pub use protocol::{ContentItem, ToolInfo};
pub use server::{ParamKind, ParamSpec, ToolDef, ToolRegistry};
