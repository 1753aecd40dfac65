pub mod anthropic;
pub mod base;
pub mod configs;
pub mod factory;
pub mod openai;
pub mod sse;
pub mod together;

#[cfg(test)]
pub mod mock;
