//! Remote venue clients.

pub mod http;

pub use http::HttpRemoteProver;
