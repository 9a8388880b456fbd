pub mod ai;
pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod email;
pub mod error;
pub mod handlers;
pub mod keep_alive;
pub mod middleware;
pub mod retry;
pub mod services;
pub mod storage;

#[cfg(test)]
pub mod testing;
