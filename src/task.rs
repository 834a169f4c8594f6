//! Service task: declares the expected response shape and routes the outcome
//!
//! A [`ServiceTask`] carries exactly one response handler and, optionally, one
//! error callback. Builder methods install them and return the task for
//! chaining; installing again replaces the previous one without notice.
//!
//! ```rust,ignore
//! let mut task = ServiceTask::new(queue.clone());
//! task.json(|value, meta| println!("{} -> {value}", meta.url))
//!     .error(|err| eprintln!("request failed: {err}"));
//! task.perform(&transport, &url).await;
//! ```

use bytes::Bytes;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::content::{Content, ResponseMeta};
use crate::decoders::{
    BytesDecoder, Charset, ContentDecoder, DecodeError, FileDecoder, FormMap, JsonDecoder,
    RawDecoder, SharedCharset, TextDecoder, TypedDecoder, UrlEncodedDecoder,
};
use crate::dispatch::DispatchQueue;
use crate::handlers::{ResponseHandler, wrap};
use crate::transport::{Transport, TransportError};

/// Terminal failure reported on a task's error callback
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

type ErrorCallback = Box<dyn FnOnce(TaskError) + Send + 'static>;

pub struct ServiceTask {
    id: Uuid,
    queue: DispatchQueue,
    response_handler: Option<Box<dyn ResponseHandler>>,
    error_handler: Option<ErrorCallback>,
    default_charset: SharedCharset,
    state: TaskState,
}

impl ServiceTask {
    /// Create a task whose callbacks run on `queue`
    pub fn new(queue: DispatchQueue) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue,
            response_handler: None,
            error_handler: None,
            default_charset: SharedCharset::default(),
            state: TaskState::Pending,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn has_response_handler(&self) -> bool {
        self.response_handler.is_some()
    }

    /// Charset for text responses that do not declare a supported one
    ///
    /// Read when the response is decoded, so it applies to the `text`
    /// handler whether it was installed before or after this call.
    pub fn default_charset(&mut self, charset: Charset) -> &mut Self {
        self.default_charset.set(charset);
        self
    }

    /// Install a pre-built handler
    pub fn response(&mut self, handler: impl ResponseHandler) -> &mut Self {
        self.install(Box::new(handler));
        self
    }

    /// Deliver the raw content, whatever its kind
    pub fn content<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(Content, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(RawDecoder, handler)
    }

    /// Deliver an in-memory body. A file body fails the task.
    pub fn data<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(Bytes, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(BytesDecoder, handler)
    }

    /// Deliver the path of a downloaded body. An in-memory body fails the task.
    pub fn file<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(PathBuf, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(FileDecoder, handler)
    }

    pub fn text<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(String, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(TextDecoder::shared(self.default_charset.clone()), handler)
    }

    pub fn json<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(Value, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(JsonDecoder, handler)
    }

    pub fn urlencoded<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(FormMap, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(UrlEncodedDecoder, handler)
    }

    /// Deliver the JSON body deserialized into `T`
    pub fn codable<T, F>(&mut self, handler: F) -> &mut Self
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(T, ResponseMeta) + Send + 'static,
    {
        self.install_decoding(TypedDecoder::<T>::new(), handler)
    }

    /// Install the failure callback, replacing any previous one
    pub fn error<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(TaskError) + Send + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Hand the completed response to the installed handler
    ///
    /// Runs decoding inline. On success the handler queues its callback; on
    /// failure the error callback is queued instead. Only the first
    /// completion of a pending task has any effect.
    pub fn complete(&mut self, content: Content, meta: ResponseMeta) {
        if self.state != TaskState::Pending {
            warn!(task_id = %self.id, state = ?self.state, "Completion ignored, task already finished");
            return;
        }

        let Some(handler) = self.response_handler.take() else {
            debug!(task_id = %self.id, "Response completed with no handler installed");
            self.finish(TaskState::Completed);
            return;
        };

        match handler.handle(content, meta) {
            Ok(()) => self.finish(TaskState::Completed),
            Err(e) => {
                self.queue.metrics().decode_failed();
                self.report_failure(e.into());
            }
        }
    }

    /// Report a terminal failure, e.g. from the transport
    pub fn fail(&mut self, error: impl Into<TaskError>) {
        if self.state != TaskState::Pending {
            warn!(task_id = %self.id, state = ?self.state, "Failure ignored, task already finished");
            return;
        }
        self.response_handler = None;
        self.report_failure(error.into());
    }

    /// Drop both callbacks without running either
    pub fn cancel(&mut self) {
        if self.state == TaskState::Pending {
            debug!(task_id = %self.id, "Task cancelled");
            self.finish(TaskState::Cancelled);
        }
    }

    /// Fetch `url` once and route the result through the task
    pub async fn perform<T>(&mut self, transport: &T, url: &Url)
    where
        T: Transport + ?Sized,
    {
        if self.state != TaskState::Pending {
            warn!(task_id = %self.id, state = ?self.state, "Perform skipped, task already finished");
            return;
        }

        match transport.fetch(url).await {
            Ok((content, meta)) => self.complete(content, meta),
            Err(e) => self.fail(e),
        }
    }

    fn install(&mut self, handler: Box<dyn ResponseHandler>) {
        if self.response_handler.replace(handler).is_some() {
            debug!(task_id = %self.id, "Response handler replaced");
        }
    }

    fn install_decoding<D, F>(&mut self, decoder: D, deliver: F) -> &mut Self
    where
        D: ContentDecoder,
        F: FnOnce(D::Output, ResponseMeta) + Send + 'static,
    {
        let handler = wrap(decoder, self.queue.downgrade(), deliver);
        self.install(Box::new(handler));
        self
    }

    fn report_failure(&mut self, error: TaskError) {
        self.state = TaskState::Failed;

        match self.error_handler.take() {
            Some(callback) => {
                debug!(task_id = %self.id, error = %error, "Task failed, scheduling error callback");
                self.queue.submit(move || callback(error));
            }
            None => {
                warn!(task_id = %self.id, error = %error, "Task failed with no error handler installed");
            }
        }
    }

    fn finish(&mut self, state: TaskState) {
        self.state = state;
        self.response_handler = None;
        self.error_handler = None;
    }
}

impl std::fmt::Debug for ServiceTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTask")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("queue", &self.queue)
            .field("has_response_handler", &self.response_handler.is_some())
            .field("has_error_handler", &self.error_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_TYPE, HeaderValue};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn meta() -> ResponseMeta {
        ResponseMeta::new(Url::parse("https://example.com/api").unwrap())
    }

    /// Slot the callbacks write into, checked after a queue barrier
    fn slot<T>() -> (Arc<Mutex<Option<T>>>, Arc<Mutex<Option<T>>>) {
        let slot = Arc::new(Mutex::new(None));
        (slot.clone(), slot)
    }

    #[tokio::test]
    async fn test_data_delivery() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let (writer, reader) = slot();

        task.data(move |bytes, meta| {
            *writer.lock().unwrap() = Some((bytes, meta.status));
        });
        task.complete(Content::from("payload"), meta());
        assert!(task.queue().barrier().await);

        let (bytes, status) = reader.lock().unwrap().take().unwrap();
        assert_eq!(bytes, Bytes::from_static(b"payload"));
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[tokio::test]
    async fn test_shape_mismatch_reports_error() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let (writer, reader) = slot();

        task.file(|_path, _meta| panic!("must not deliver"))
            .error(move |err| {
                *writer.lock().unwrap() = Some(err);
            });
        task.complete(Content::from("in memory"), meta());
        assert!(task.queue().barrier().await);

        let err = reader.lock().unwrap().take().unwrap();
        assert!(matches!(err, TaskError::Decode(DecodeError::InvalidResponse)));
        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(task.queue().metrics().snapshot().decode_failures, 1);
    }

    #[tokio::test]
    async fn test_last_installed_handler_wins() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        task.text(move |_text, _meta| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        task.json(move |_value, _meta| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Replaced handler's captured state is released right away
        assert_eq!(Arc::strong_count(&first), 1);

        task.complete(Content::from("{}"), meta());
        assert!(task.queue().barrier().await);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_completion_is_ignored() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        task.content(move |_content, _meta| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.complete(Content::from("one"), meta());
        task.complete(Content::from("two"), meta());
        assert!(task.queue().barrier().await);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_prevents_delivery() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        task.data(|_bytes, _meta| panic!("must not deliver"))
            .error(|_err| panic!("must not report"));

        task.cancel();
        task.complete(Content::from("late"), meta());
        assert!(task.queue().barrier().await);

        assert_eq!(task.state(), TaskState::Cancelled);
        assert!(!task.has_response_handler());
        assert_eq!(task.queue().metrics().snapshot().jobs_submitted, 0);
    }

    #[tokio::test]
    async fn test_text_uses_task_default_charset() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let (writer, reader) = slot();

        task.default_charset(Charset::Latin1).text(move |text, _meta| {
            *writer.lock().unwrap() = Some(text);
        });
        task.complete(Content::Data(Bytes::from_static(&[0x6E, 0xE9])), meta());
        assert!(task.queue().barrier().await);

        assert_eq!(reader.lock().unwrap().take().unwrap(), "né");
    }

    #[tokio::test]
    async fn test_default_charset_set_after_text_handler() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let (writer, reader) = slot();

        task.text(move |text, _meta| {
            *writer.lock().unwrap() = Some(text);
        })
        .default_charset(Charset::Latin1);
        task.complete(Content::Data(Bytes::from_static(&[0x6E, 0xE9])), meta());
        assert!(task.queue().barrier().await);

        assert_eq!(reader.lock().unwrap().take().unwrap(), "né");
    }

    #[tokio::test]
    async fn test_header_charset_overrides_default() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let (writer, reader) = slot();

        task.default_charset(Charset::Latin1).text(move |text, _meta| {
            *writer.lock().unwrap() = Some(text);
        });
        let meta = meta().with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        task.complete(Content::from("né"), meta);
        assert!(task.queue().barrier().await);

        assert_eq!(reader.lock().unwrap().take().unwrap(), "né");
    }

    #[tokio::test]
    async fn test_codable_and_urlencoded() {
        #[derive(Debug, Deserialize)]
        struct Token {
            access_token: String,
            expires_in: u32,
        }

        let queue = DispatchQueue::spawn("test.task");
        let (token_writer, token_reader) = slot();
        let (form_writer, form_reader) = slot();

        let mut typed = ServiceTask::new(queue.clone());
        typed.codable(move |token: Token, _meta| {
            *token_writer.lock().unwrap() = Some(token);
        });
        typed.complete(
            Content::from(r#"{"access_token":"abc","expires_in":3600}"#),
            meta(),
        );

        let mut form = ServiceTask::new(queue.clone());
        form.urlencoded(move |pairs, _meta| {
            *form_writer.lock().unwrap() = Some(pairs);
        });
        form.complete(Content::from("access_token=abc&expires_in=3600"), meta());

        assert!(queue.barrier().await);

        let token = token_reader.lock().unwrap().take().unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 3600);

        let pairs = form_reader.lock().unwrap().take().unwrap();
        assert_eq!(pairs["access_token"], "abc");
        assert_eq!(pairs["expires_in"], "3600");
    }

    #[tokio::test]
    async fn test_failure_without_error_handler_is_logged_only() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        task.json(|_value, _meta| panic!("must not deliver"));
        task.complete(Content::from("nope"), meta());
        assert!(task.queue().barrier().await);

        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(task.queue().metrics().snapshot().jobs_submitted, 0);
    }

    #[tokio::test]
    async fn test_prebuilt_handler() {
        let mut task = ServiceTask::new(DispatchQueue::spawn("test.task"));
        let (writer, reader) = slot();

        task.response(move |content: Content, _meta: ResponseMeta| -> Result<(), DecodeError> {
            *writer.lock().unwrap() = Some(content.kind());
            Ok(())
        });
        task.complete(Content::File(PathBuf::from("/tmp/body")), meta());

        assert_eq!(
            reader.lock().unwrap().take(),
            Some(crate::content::ContentKind::File)
        );
        assert_eq!(task.state(), TaskState::Completed);
    }
}
