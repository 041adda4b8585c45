//! # frunch-server
//!
//! Viewer-facing HTTP server for frunch-room.
//!
//! Wires the catalog synchronizer, geocode worker, and rotation loop
//! together and exposes the current picture to viewers over a WebSocket.
//!
//! ## Endpoints
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /ws` | Viewer socket, JSON `new_picture` events |
//! | `GET /api/v1/picture` | Current picture, or 404 |
//! | `GET /images/*` | Cached picture files |
//! | `GET /*` | Static viewer assets |

pub mod config;
pub mod engine;
pub mod routes;

pub use config::AppConfig;
pub use engine::Engine;
pub use routes::{router, AppState};
