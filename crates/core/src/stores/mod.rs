pub mod http;

pub use http::VectorServiceStore;
