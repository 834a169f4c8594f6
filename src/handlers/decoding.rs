use tracing::debug;

use super::traits::ResponseHandler;
use crate::content::{Content, ResponseMeta};
use crate::decoders::{ContentDecoder, DecodeError};
use crate::dispatch::WeakDispatcher;

/// Handler that decodes content and delivers the value on a dispatch queue
///
/// Decoding runs inline inside [`ResponseHandler::handle`]. Only the call to
/// `deliver` is deferred to the queue.
pub struct DecodingHandler<D, F> {
    decoder: D,
    dispatcher: WeakDispatcher,
    deliver: F,
}

/// Wrap a decoder and a typed callback into a [`ResponseHandler`]
pub fn wrap<D, F>(decoder: D, dispatcher: WeakDispatcher, deliver: F) -> DecodingHandler<D, F>
where
    D: ContentDecoder,
    F: FnOnce(D::Output, ResponseMeta) + Send + 'static,
{
    DecodingHandler {
        decoder,
        dispatcher,
        deliver,
    }
}

impl<D, F> ResponseHandler for DecodingHandler<D, F>
where
    D: ContentDecoder,
    F: FnOnce(D::Output, ResponseMeta) + Send + 'static,
{
    fn handle(self: Box<Self>, content: Content, meta: ResponseMeta) -> Result<(), DecodeError> {
        let DecodingHandler {
            decoder,
            dispatcher,
            deliver,
        } = *self;

        let kind = content.kind();
        let value = decoder.decode(content, &meta)?;
        debug!(%kind, url = %meta.url, "Content decoded, scheduling delivery");

        dispatcher.submit(move || deliver(value, meta));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::{BytesDecoder, FileDecoder, JsonDecoder};
    use crate::dispatch::DispatchQueue;
    use bytes::Bytes;
    use reqwest::Url;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn meta() -> ResponseMeta {
        ResponseMeta::new(Url::parse("https://example.com/data").unwrap())
    }

    #[tokio::test]
    async fn test_delivers_on_queue() {
        let queue = DispatchQueue::spawn("test.wrap");
        let received = Arc::new(Mutex::new(None));

        let slot = received.clone();
        let handler = wrap(BytesDecoder, queue.downgrade(), move |bytes: Bytes, meta| {
            *slot.lock().unwrap() = Some((bytes, meta.url.to_string()));
        });

        Box::new(handler).handle(Content::from("body"), meta()).unwrap();
        assert!(queue.barrier().await);

        let received = received.lock().unwrap().take().unwrap();
        assert_eq!(received.0, Bytes::from_static(b"body"));
        assert_eq!(received.1, "https://example.com/data");
    }

    #[tokio::test]
    async fn test_decode_error_skips_delivery() {
        let queue = DispatchQueue::spawn("test.wrap.error");
        let handler = wrap(FileDecoder, queue.downgrade(), |_path: PathBuf, _meta| {
            panic!("must not deliver");
        });

        let err = Box::new(handler)
            .handle(Content::from("not a file"), meta())
            .unwrap_err();
        assert!(err.is_shape_mismatch());

        assert!(queue.barrier().await);
        assert_eq!(queue.metrics().snapshot().jobs_submitted, 0);
    }

    #[tokio::test]
    async fn test_malformed_content_is_reported() {
        let queue = DispatchQueue::spawn("test.wrap.json");
        let handler = wrap(JsonDecoder, queue.downgrade(), |_value, _meta| {
            panic!("must not deliver");
        });

        let err = Box::new(handler)
            .handle(Content::from("{oops"), meta())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[tokio::test]
    async fn test_released_queue_makes_handler_inert() {
        let queue = DispatchQueue::spawn("test.wrap.released");
        let handler = wrap(BytesDecoder, queue.downgrade(), |_bytes, _meta| {
            panic!("must not deliver");
        });
        drop(queue);

        // Decoding still succeeds; only the delivery is discarded
        assert!(Box::new(handler).handle(Content::from("x"), meta()).is_ok());
    }

    #[test]
    fn test_closure_handler() {
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let handler: Box<dyn ResponseHandler> =
            Box::new(move |content: Content, _meta: ResponseMeta| -> Result<(), DecodeError> {
                *slot.lock().unwrap() = Some(content.kind());
                Ok(())
            });

        handler.handle(Content::from("x"), meta()).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(crate::content::ContentKind::Data));
    }
}
