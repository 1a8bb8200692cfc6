//! Wires configuration and logging together for the binary entry point.
//!
//! There is no shared "application" object to build here the way the
//! reference tracker's `bootstrap::app` assembles one: the core is already
//! stateless apart from the persistence port, so bootstrapping just means
//! installing the tracing subscriber and handing the loaded [`Configuration`]
//! to whichever binary command runs next.
pub mod logging;
