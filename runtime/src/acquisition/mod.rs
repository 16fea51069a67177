//! Raw page acquisition over HTTP.
//!
//! One fetch feeds both the SPA detector and the lite renderer, so a render
//! call never downloads the same document twice.

pub mod http_client;

pub use http_client::{FetchedPage, HttpClient};
