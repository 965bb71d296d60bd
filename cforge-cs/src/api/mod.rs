//! HTTP API handlers for cforge-cs

pub mod admin;
pub mod content;
pub mod health;
pub mod recommend;
pub mod refine;

pub use admin::admin_routes;
pub use content::content_routes;
pub use health::health_routes;
pub use recommend::recommendation_routes;
pub use refine::refine_routes;
