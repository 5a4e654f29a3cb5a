pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod gitlab;
pub mod logging;
pub mod output;
pub mod run;
