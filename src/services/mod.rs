//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence so route handlers can
//! stay focused on request translation and role checks. Each module exposes
//! its own error enum; routes map those onto status codes.

pub mod auth;
pub mod customer;
pub mod history;
pub mod menu;
pub mod order;
pub mod page;
pub mod seed;
pub mod session;
pub mod staff;
pub mod stats;
pub mod stock;
pub mod worklog;
