//! Response handlers
//!
//! A handler is the piece a task calls once its response body is available.
//!
//! ## Key Components
//!
//! - [`ResponseHandler`] - single-method trait every handler implements;
//!   plain closures returning `Result<(), DecodeError>` implement it too
//! - [`DecodingHandler`] - adapter built by [`wrap`] that runs a
//!   [`ContentDecoder`](crate::decoders::ContentDecoder) and hands the value
//!   to a dispatch queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use fetchtask::decoders::JsonDecoder;
//! use fetchtask::handlers::{wrap, ResponseHandler};
//!
//! let handler = wrap(JsonDecoder, queue.downgrade(), |value, meta| {
//!     println!("{} -> {value}", meta.url);
//! });
//! Box::new(handler).handle(content, meta)?;
//! ```

mod decoding;
mod traits;

pub use decoding::{DecodingHandler, wrap};
pub use traits::ResponseHandler;
