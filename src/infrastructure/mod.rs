//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Persistence: SQLite stores, the encrypted guardrail file, static content
//! - HTTP: REST API routes for the control panel
//! - WebSocket: Notification push to control panels
//! - Backend: OpenAI-compatible text and image generation
//! - World: In-process world model
//! - Config: Application configuration
//! - State: Shared application state

pub mod backend;
pub mod config;
pub mod crypto;
pub mod http;
pub mod persistence;
pub mod state;
pub mod websocket;
pub mod workers;
pub mod world;
