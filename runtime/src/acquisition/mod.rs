//! HTTP acquisition: the primed session and API payload handling.
//!
//! Both HTTP tiers go through one [`http_client::Session`] per call. The
//! browser tier lives in `live` and never touches this module.

pub mod api_probe;
pub mod http_client;
