//! vidroom - session state management for multi-party video rooms
//!
//! This crate keeps the render surface, the published local tracks and the
//! remote participants' tracks consistent as asynchronous room events
//! arrive. Media transport itself is delegated to an external video service
//! behind the traits in [`service`].

pub mod config;
pub mod controls;
pub mod devices;
pub mod error;
pub mod events;
pub mod render;
pub mod room;
pub mod service;
pub mod session;
pub mod token;

pub use error::{AppError, Result};
pub use session::{Session, SessionManager};
