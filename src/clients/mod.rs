pub mod http_client;
pub mod remote_service;

#[cfg(test)]
pub(crate) mod fake;

pub use http_client::HttpRemoteClient;
pub use remote_service::{LocalFile, RemoteService};
