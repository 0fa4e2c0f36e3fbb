//! # Rampart Test
//!
//! In-memory testing for Rampart handlers and servers. Requests go through
//! the handler exactly as the transport would send them, without binding a
//! port, and responses come back buffered with assertion helpers,
//! including decoding of problem documents.
//!
//! ## Example
//!
//! ```ignore
//! use http::StatusCode;
//! use rampart_test::TestClient;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn rejects_empty_names() {
//!     let client = TestClient::new(app());
//!
//!     let response = client
//!         .post("/users")
//!         .json(&json!({ "name": "" }))
//!         .send()
//!         .await;
//!
//!     let problem = response.assert_problem(
//!         StatusCode::UNPROCESSABLE_ENTITY,
//!         "https://docs.rampart.dev/errors/constraint-violation.md",
//!     );
//!     assert_eq!(problem.instance(), "/users");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/rampart-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
