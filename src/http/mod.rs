//! HTTP layer - router and error responses

pub mod routes;

pub use routes::build_router;
