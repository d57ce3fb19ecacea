pub mod collector;
pub mod feed;
pub mod parser;
pub mod sentiment;
pub mod types;
