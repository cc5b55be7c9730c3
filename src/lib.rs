// ABOUTME: Library root for dockwright - typed docker CLI execution and session lifecycle tracking.
// ABOUTME: The dockwright binary is in main.rs.

pub mod command;
pub mod config;
pub mod error;
pub mod platform;
pub mod process;
pub mod retry;
pub mod session;
pub mod types;
pub mod wait;
