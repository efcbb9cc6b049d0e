/// Game API client
///
/// This module groups everything that talks to the remote game:
/// - transport: HTTP GET with bounded retry on timeouts
/// - decode:    envelope parsing and the embedded server error check
/// - session:   the four read operations of one authenticated account
/// - error:     transport / decode / server error taxonomy
///
/// Design notes:
/// - Read-only: no operation mutates remote state
/// - No retry above the transport; decode and server errors fail at once
pub mod decode;
pub mod error;
pub mod session;
pub mod transport;

pub use session::{Endpoints, Session};
pub use transport::{ReqwestClient, RetryPolicy, RetryingTransport, Transport};
