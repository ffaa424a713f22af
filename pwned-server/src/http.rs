//! HTTP/1.1 binding of the lookup call. The wire format is described in
//! [`pwned_protocol::wire`].

use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use pwned_protocol::wire::{self, RANGE_PATH, SHAPE_HEADER};
use pwned_protocol::{Code, ResponseShape, Status};
use pwned_store::Storage;
use tokio::sync::mpsc;
use tokio_util::codec::Encoder;

use crate::channel::{Event, spawn_lookup};
use crate::service::LookupService;

pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Handles one HTTP request.
///
/// The response head waits for the first event of the lookup, so failures
/// that happen before any record is sent get a proper status code.
pub async fn handle<S, B>(
    service: Arc<LookupService<S>>,
    req: Request<B>,
) -> Result<Response<ResponseBody>, Infallible>
where
    S: Storage + 'static,
{
    let Some(prefix) = req.uri().path().strip_prefix(RANGE_PATH) else {
        return Ok(status_response(&Status::new(Code::NotFound, "no such route")));
    };

    if req.method() != Method::GET {
        let mut response = status_response(&Status::new(Code::NotFound, "method not allowed"));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET"));
        return Ok(response);
    }

    let shape = service.shape();
    let mut events = spawn_lookup(service, prefix.to_owned());

    let response = match events.recv().await {
        Some(Event::Failed(status)) => status_response(&status),
        Some(first) => stream_response(shape, frames(first, events)),
        None => status_response(&Status::internal()),
    };

    Ok(response)
}

fn status_response(status: &Status) -> Response<ResponseBody> {
    let body = Full::new(Bytes::from(status.message().to_owned()))
        .map_err(|never| match never {})
        .boxed_unsync();

    let mut response = Response::new(body);
    *response.status_mut() = status.code().http_status();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

fn stream_response<S>(shape: ResponseShape, frames: S) -> Response<ResponseBody>
where
    S: Stream<Item = Result<Frame<Bytes>, io::Error>> + Send + 'static,
{
    let mut response = Response::new(StreamBody::new(frames).boxed_unsync());
    let headers = response.headers_mut();
    headers.insert(SHAPE_HEADER, HeaderValue::from_static(shape.as_str()));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    response
}

/// Encodes lookup events as body frames, one frame per message.
fn frames(
    first: Event,
    mut events: mpsc::Receiver<Event>,
) -> impl Stream<Item = Result<Frame<Bytes>, io::Error>> + Send + 'static {
    async_stream::stream! {
        let mut codec = wire::frame_codec();
        let mut pending = Some(first);

        loop {
            let event = match pending.take() {
                Some(event) => Some(event),
                None => events.recv().await,
            };

            match event {
                Some(Event::Message(message)) => {
                    let mut buf = BytesMut::with_capacity(message.len() + 4);
                    if let Err(err) = codec.encode(message, &mut buf) {
                        yield Err(err);
                        break;
                    }
                    yield Ok(Frame::data(buf.freeze()));
                }
                Some(Event::Done) => break,
                Some(Event::Failed(status)) => {
                    tracing::warn!(%status, "lookup failed after streaming started");
                    yield Err(io::Error::other(status));
                    break;
                }
                None => {
                    yield Err(io::Error::other("lookup ended without completing the stream"));
                    break;
                }
            }
        }
    }
}
