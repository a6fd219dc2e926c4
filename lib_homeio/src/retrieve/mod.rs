//! Backend retrieval: the HTTP transport and the server-push change-stream
//! framing it consumes.

pub mod http_io;
pub mod sse;
