//! Fitting Room Core - Shared types library.
//!
//! This crate provides the types and pure rules used by the fitting room
//! widget:
//! - `widget` - HTTP-served widget, remote gateway, and session controller
//! - `integration-tests` - end-to-end flows against a mock fitting room API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Everything here can be evaluated synchronously on every
//! UI event.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product ids, lookup keys, emails, and tokens
//! - [`visibility`] - Toggle configuration reducer and the CTA visibility policy
//! - [`cart`] - Server-reported fitting room membership

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;
pub mod visibility;

pub use cart::CartState;
pub use types::*;
pub use visibility::{
    CreditGate, Toggle, VisibilityConfig, VisibleActions, resolve_visible_actions,
};
