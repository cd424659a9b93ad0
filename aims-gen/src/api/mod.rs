//! HTTP API handlers for aims-gen

pub mod buildinfo;
pub mod download;
pub mod generate;
pub mod health;
pub mod image;

pub use buildinfo::buildinfo_routes;
pub use download::download_routes;
pub use generate::generate_routes;
pub use health::health_routes;
pub use image::image_routes;
