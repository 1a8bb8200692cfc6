//! Network-facing servers. Currently only the HTTP tracker; each is a thin
//! binding that turns a transport-specific request into the parameter
//! mapping [`crate::core::protocol`] expects and nothing more.
pub mod http;
