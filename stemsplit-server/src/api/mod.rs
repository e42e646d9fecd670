//! HTTP API handlers for stemsplit-server

pub mod download;
pub mod frontend;
pub mod health;
pub mod upload;

pub use download::download_routes;
pub use frontend::frontend_fallback;
pub use health::health_routes;
pub use upload::upload_routes;
