//! Transport-agnostic OAuth 2.0 / OIDC authorization-server engine: authorization code + PKCE,
//! client credentials, device code, refresh rotation, token exchange, DPoP, JAR/JARM, and
//! `private_key_jwt`, wired to storage and key material through narrow capability traits.

#![deny(clippy::all, unused_crate_dependencies)]
#![warn(missing_docs)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod flows;
pub mod keys;
pub mod obs;
pub mod proof;
pub mod reactor;
pub mod rfc;
pub mod store;

#[cfg(test)] pub(crate) mod testkit;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::{
		error::{Error, Rejection, Result},
		rfc::{ErrorKind, OAuthError},
	};
}

pub use jsonwebtoken;
pub use url;
