pub mod baseline;
pub mod engine;
