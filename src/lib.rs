pub mod api;
pub mod app;
pub mod classifier;
pub mod config;
pub mod db;
pub mod fetch_error;
pub mod fetcher;
pub mod notifier;
pub mod scheduler;
pub mod services;
pub mod stations;
pub mod units;
