//! Operator-side controllers for the recording appliance.
//!
//! The controllers are plain state machines over the [`api::BoothApi`]
//! trait; they publish their state on `tokio::sync::watch` channels and
//! know nothing about how it is displayed ([`render`] handles that).

pub mod api;
pub mod discovery;
pub mod lifecycle;
pub mod render;
pub mod settings;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;
