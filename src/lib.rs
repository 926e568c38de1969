pub mod api;
pub mod config;
pub mod prompts;
pub mod relay;
pub mod render;
pub mod turn;
pub mod types;
pub mod util;

#[cfg(test)]
pub mod test_support;
