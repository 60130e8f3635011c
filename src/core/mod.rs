//! Core types for the observer: builder and error handling.

pub mod builder;
pub mod error;

pub use builder::ObserverBuilder;
pub use error::{Error, Result, SinkError};
