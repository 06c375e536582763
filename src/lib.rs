pub mod cache;
pub mod classify;
pub mod config;
pub mod controller;
pub mod event;
pub mod export;
pub mod filter;
pub mod format;
pub mod queue;
pub mod shutdown;
pub mod sink;
