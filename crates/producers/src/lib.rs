//! Turn producers for ArenaGuard.
//!
//! A producer is whatever decides the next move. This crate ships the
//! webhook producer, which forwards each turn to an external agent over
//! signed HTTP.

pub mod signing;
pub mod webhook;

pub use signing::{sign_payload, verify_signature};
pub use webhook::WebhookTurnProducer;
