pub mod app;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod policy;
pub mod resolve;
pub mod runtime;
pub mod synthesize;
