//! HTTP Mock Server
//!
//! A configurable HTTP responder: given a declarative set of rules, it
//! inspects incoming requests and returns a pre-defined response for the
//! first matching rule, or 404 when nothing matches. Useful as a drop-in
//! stand-in for a real backend during integration testing and local
//! development.
//!
//! # Features
//!
//! - **Request Matching**: exact path and method, plus regex patterns for
//!   headers, query parameters, and the raw body
//! - **First Match Wins**: rules are evaluated in declaration order
//! - **Static Responses**: status code, headers, and a literal or JSON body
//! - **Latency Simulation**: fixed or randomized response delays
//! - **Traffic Logging**: every request/response pair is logged in full
//!
//! # Example Configuration
//!
//! ```yaml
//! server:
//!   port: 8080
//!
//! requests:
//!   - path: /ping
//!     method: GET
//!     response:
//!       status-code: 200
//!       body: pong
//!
//!   - path: /api/users
//!     method: POST
//!     headers:
//!       Content-Type: application/json
//!     responseDelay:
//!       min: 50
//!       max: 150
//!     response:
//!       status-code: 201
//!       body:
//!         id: 1
//!         name: John
//! ```

pub mod config;
pub mod delay;
pub mod handler;
pub mod logging;
pub mod matcher;
pub mod server;

pub use config::{Config, ConfigError};
pub use delay::DelaySampler;
pub use handler::AppState;
