pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod recovery;
pub mod routes;
pub mod scoring;
pub mod state;

#[cfg(test)]
mod test_support;
