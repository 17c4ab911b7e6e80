//! Ready-made policies for known token issuers
//!
//! Each provider module exposes:
//!
//! - **Constants**: discovery URLs and issuers of the provider
//! - **Policies**: [`ValidationPolicy`](crate::ValidationPolicy) constructors
//! - **Predicates**: endorsement validators, where the provider publishes endorsements
//!
//! ## Available Providers
//!
//! - [`bot_framework`]: connector service and emulator tokens

pub mod bot_framework;
