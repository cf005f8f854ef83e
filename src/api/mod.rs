pub mod extract;
mod handlers;
pub mod response;
mod routes;

pub use routes::create_router;
