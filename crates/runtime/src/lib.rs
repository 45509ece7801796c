//! WAMP Runtime - errors, application error capability, transport boundary
//!
//! This crate provides the low-level infrastructure the session engine in
//! `wamp` is built on:
//!
//! - **Errors**: The [`Error`] taxonomy shared by every layer
//! - **Application errors**: The [`WampError`] capability implemented by user
//!   error types and by the generic [`ApplicationError`]
//! - **Transport**: The [`Transport`] trait the engine sends messages through,
//!   plus an in-memory implementation
//! - **Ids**: Request id allocation within the WAMP id space
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐
//! │     wamp      │  Session engine (ledger, state, error translation)
//! └───────┬───────┘
//!         │ sends through Transport, rejects with Error
//! ┌───────▼───────┐
//! │ wamp-runtime  │  This crate
//! └───────┬───────┘
//!         │ Message, Payload, options
//! ┌───────▼───────┐
//! │ wamp-protocol │  Wire types
//! └───────────────┘
//! ```

pub mod application;
pub mod error;
pub mod id;
pub mod transport;

pub use application::{
	ApplicationError, FromPayload, PayloadError, RUNTIME_ERROR_URI, RaisedError, WampError,
	decode_args,
};
pub use error::{Error, Result};
pub use id::IdGenerator;
pub use transport::{MemoryTransport, SendFuture, Transport};
