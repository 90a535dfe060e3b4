pub mod auth_extract;
pub mod handlers;
pub mod response;
pub mod routes;
