pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod health;
pub mod output;
pub mod reset;
pub mod resolve;
pub mod run;
pub mod runtime;
