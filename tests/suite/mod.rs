mod cli;
mod config;
mod dispatch;
