pub mod chop;
pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod storage;
