//! HTTP/1.1 transport for [`PasswordChecker`](crate::PasswordChecker).
//!
//! The wire format is described in [`pwned_protocol::wire`].

use std::fmt;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, TryStreamExt};
use http::uri::{Authority, InvalidUri};
use http::{Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use pwned_protocol::wire::{SHAPE_HEADER, frame_codec, range_path};
use pwned_protocol::{CallError, Code, HashStream, LookupTransport, ResponseShape, Status};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

type Frames = Pin<Box<dyn Stream<Item = io::Result<BytesMut>> + Send>>;

/// Opens lookups against one server over plain HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Empty<Bytes>>,
    authority: Authority,
}

impl HttpTransport {
    /// `addr` is `host:port`, optionally prefixed with `http://`.
    pub fn new(addr: &str) -> Result<Self, InvalidUri> {
        let authority = addr.strip_prefix("http://").unwrap_or(addr).parse()?;
        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn uri_for(&self, prefix: &str) -> Result<Uri, http::Error> {
        Uri::builder()
            .scheme("http")
            .authority(self.authority.clone())
            .path_and_query(range_path(prefix))
            .build()
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").field("authority", &self.authority).finish()
    }
}

#[async_trait]
impl LookupTransport for HttpTransport {
    type Stream = HttpHashStream;

    #[tracing::instrument(name = "HttpTransport::list_hashes_for_prefix", skip(self), err)]
    async fn list_hashes_for_prefix(&self, prefix: &str) -> Result<HttpHashStream, CallError> {
        let request = Request::get(self.uri_for(prefix).map_err(CallError::transport)?)
            .body(Empty::new())
            .map_err(CallError::transport)?;

        let response = self.client.request(request).await.map_err(CallError::transport)?;

        if !response.status().is_success() {
            let code = Code::from_http(response.status());
            let body = response.into_body().collect().await.map_err(CallError::transport)?;
            let message = String::from_utf8_lossy(&body.to_bytes()).into_owned();
            return Err(Status::new(code, message).into());
        }

        let shape = response
            .headers()
            .get(SHAPE_HEADER)
            .ok_or(CallError::MissingShape)?
            .to_str()
            .map_err(CallError::transport)?
            .parse::<ResponseShape>()
            .map_err(CallError::transport)?;

        let body = response.into_body().into_data_stream().map_err(io::Error::other);
        let frames = FramedRead::new(StreamReader::new(body), frame_codec());

        Ok(HttpHashStream { frames: Box::pin(frames), shape })
    }
}

/// Messages of one lookup response. Dropping it closes the connection.
pub struct HttpHashStream {
    frames: Frames,
    shape: ResponseShape,
}

#[async_trait]
impl HashStream for HttpHashStream {
    fn shape(&self) -> ResponseShape {
        self.shape
    }

    async fn message(&mut self) -> Result<Option<Bytes>, CallError> {
        match self.frames.next().await {
            Some(Ok(frame)) => Ok(Some(frame.freeze())),
            Some(Err(err)) => Err(CallError::transport(err)),
            None => Ok(None),
        }
    }
}
