pub mod server;
pub mod token_route;
