//! Auth-domain model: identifiers, scopes, clients, requests, sessions, and tokens.

pub mod client;
pub mod device;
pub mod id;
pub mod pkce;
pub mod request;
pub mod scope;
pub mod token;

pub use client::*;
pub use device::*;
pub use id::*;
pub use request::*;
pub use scope::*;
pub use token::{record::*, secret::*};

// self
use crate::_prelude::*;

/// Raised when a lifecycle state machine is asked to move backwards or sideways.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Illegal {entity} transition from {from} to {to}.")]
pub struct TransitionError {
	/// State machine label.
	pub entity: &'static str,
	/// Current state.
	pub from: &'static str,
	/// Requested state.
	pub to: &'static str,
}
