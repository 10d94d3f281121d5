//! Network clients for the directory service.
//!
//! Both clients share one [`HttpTransport`], whose semaphore is the global
//! ceiling on simultaneous outbound connections.

pub mod http;

pub use http::{HttpDirectory, HttpProfileResolver, HttpTransport};
