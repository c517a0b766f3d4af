pub mod config;
pub mod describe;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod table;
