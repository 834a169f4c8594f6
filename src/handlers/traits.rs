use crate::content::{Content, ResponseMeta};
use crate::decoders::DecodeError;

/// Consumes one completed response
///
/// A handler either delivers a typed value somewhere or returns a
/// [`DecodeError`]; the owning task reports that error on its failure channel.
/// `handle` takes the boxed handler by value, so a handler can run at most
/// once.
pub trait ResponseHandler: Send + 'static {
    fn handle(self: Box<Self>, content: Content, meta: ResponseMeta) -> Result<(), DecodeError>;
}

impl<F> ResponseHandler for F
where
    F: FnOnce(Content, ResponseMeta) -> Result<(), DecodeError> + Send + 'static,
{
    fn handle(self: Box<Self>, content: Content, meta: ResponseMeta) -> Result<(), DecodeError> {
        (*self)(content, meta)
    }
}
