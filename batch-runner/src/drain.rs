use crate::error::TaskError;
use bytes::Buf;
use hyper::body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Collects an incoming response body into one contiguous buffer.
    ///
    /// The buffer is pre-sized from the content-length header so a
    /// well-behaved delay endpoint costs a single allocation per call.
    pub struct DrainBodyFuture<B: Body> {
        #[pin]
        body: B,
        buf: Vec<u8>,
    }
}

impl<B> DrainBodyFuture<B>
where
    B: Body,
{
    #[inline]
    #[must_use]
    pub fn new_trusted_length(body: B, content_length: usize) -> Self {
        Self {
            body,
            buf: Vec::with_capacity(content_length),
        }
    }
}

impl<B> Future for DrainBodyFuture<B>
where
    B: Body,
{
    type Output = Result<Vec<u8>, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slf = self.project();
        loop {
            match slf.body.as_mut().poll_frame(cx) {
                Poll::Ready(next) => {
                    let Some(next_res) = next else {
                        return Poll::Ready(Ok(std::mem::take(slf.buf)));
                    };
                    let frame = match next_res {
                        Ok(frame) => frame,
                        Err(_e) => {
                            return Poll::Ready(Err(TaskError::Body(
                                "failed to poll next frame".to_string(),
                            )));
                        }
                    };
                    let Ok(data) = frame.into_data() else {
                        return Poll::Ready(Err(TaskError::Body(
                            "unexpected non-data frame in response".to_string(),
                        )));
                    };
                    slf.buf.extend_from_slice(data.chunk());
                    if slf.body.is_end_stream() {
                        return Poll::Ready(Ok(std::mem::take(slf.buf)));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
