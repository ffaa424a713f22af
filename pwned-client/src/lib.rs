//! Client side of the k-anonymity password breach check.
//!
//! [`PasswordChecker`] hashes the password locally, asks the server for every
//! hash under the first five hex characters of the digest, and compares each
//! returned record in constant time. The server never sees the password or
//! the full digest, and the client always drains the whole response, so
//! neither the server nor an observer of the connection learns whether or
//! where a match occurred.
//!
//! ```no_run
//! use pwned_client::{HttpTransport, PasswordChecker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = PasswordChecker::new(HttpTransport::new("127.0.0.1:8080")?);
//! if checker.is_password_pwned("password123").await? {
//!     println!("pick another password");
//! }
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod compare;
pub mod http;

pub use checker::{CheckError, PasswordChecker, Stage, Verdict, drain};
pub use compare::constant_time_eq;
pub use http::{HttpHashStream, HttpTransport};
