//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID, path normalization, session cookie)
//!     → middleware/access_control.rs (policy decision)
//!         → redirect: response.rs (307 to login / landing page)
//!         → allow: server.rs forwards to the upstream application
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{GateContext, GatePolicy, PolicyHandle};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::GatewayServer;
