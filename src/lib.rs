pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod registry;
pub mod rooms;
pub mod signaling;
pub mod websocket;
