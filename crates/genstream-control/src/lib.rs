pub mod config;
pub mod controller;
pub mod mutes;
pub mod params;
pub mod prompts;
pub mod scheduler;
pub mod segment;
pub mod service;
pub mod session;
