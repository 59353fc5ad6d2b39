pub mod analysis;
pub mod cli;
pub mod config;
pub mod report;
pub mod storage;
