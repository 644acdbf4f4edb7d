mod bootstrap;
mod commands;
mod config;
mod loop_runner;
mod save;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
