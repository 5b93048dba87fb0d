pub mod handler;
pub mod params;
pub mod serve;
pub mod tools;

pub use handler::ToolServerHandler;
pub use serve::{serve_sse_until, serve_stdio, SseEndpoint};
