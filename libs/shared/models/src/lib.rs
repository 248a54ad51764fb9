pub mod appointment;
pub mod auth;
pub mod capability;
pub mod error;
pub mod notification;
pub mod user;
