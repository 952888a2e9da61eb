//! Issued token records and the secret wrapper that keeps their values out of logs.

pub mod record;
pub mod secret;
