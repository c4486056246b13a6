//! Exam client crate - REST access to the remote paper/answer store.
//!
//! Provides the `ExamApi` trait consumed by the session controller and an
//! HTTP implementation speaking the store's `/api/papers` and `/api/answers`
//! endpoints with a bearer token.

pub mod api;
pub mod error;
pub mod http;
mod wire;

pub use api::ExamApi;
pub use error::{ClientError, Endpoint};
pub use http::HttpExamApi;
