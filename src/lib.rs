pub mod config;
pub mod error;
pub mod github;
pub mod output;
pub mod publish;
pub mod runner;
pub mod version;
