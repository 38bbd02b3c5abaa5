pub mod builder;
pub mod token_client;
