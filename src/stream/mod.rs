pub mod decoder;
pub mod utf8;

pub use decoder::{SseDecoder, DEFAULT_MAX_PENDING_BYTES};
pub use utf8::Utf8Decoder;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

use crate::core::GenerationError;

pub type ByteStream = BoxStream<'static, Result<Bytes, GenerationError>>;
pub type DeltaStream = BoxStream<'static, Result<String, GenerationError>>;

struct DeltaState {
    bytes: ByteStream,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    cancel: CancellationToken,
    finished: bool,
    failure: Option<GenerationError>,
}

/// Lazily turns a response body into text deltas.
///
/// Ends on `[DONE]`, when the body closes, on the first error, or as soon as
/// `cancel` fires. After cancellation nothing more is yielded, even deltas
/// that were already decoded.
pub fn delta_stream(bytes: ByteStream, cancel: CancellationToken, max_pending: usize) -> DeltaStream {
    let state = DeltaState {
        bytes,
        decoder: SseDecoder::with_limit(max_pending),
        ready: VecDeque::new(),
        cancel,
        finished: false,
        failure: None,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if st.cancel.is_cancelled() {
                return None;
            }
            if let Some(delta) = st.ready.pop_front() {
                return Some((Ok(delta), st));
            }
            if st.finished {
                let failure = st.failure.take()?;
                return Some((Err(failure), st));
            }

            let next = tokio::select! {
                biased;
                _ = st.cancel.cancelled() => return None,
                next = st.bytes.next() => next,
            };

            let decoded = match next {
                Some(Ok(chunk)) => st.decoder.push(&chunk),
                Some(Err(e)) => Err(e),
                None => {
                    st.finished = true;
                    st.decoder.finish()
                }
            };

            match decoded {
                Ok(deltas) => {
                    st.ready.extend(deltas);
                    if st.decoder.is_done() {
                        st.finished = true;
                    }
                    if let Some(err) = st.decoder.overflow() {
                        st.failure = Some(err.clone());
                        st.finished = true;
                    }
                }
                Err(e) => {
                    st.finished = true;
                    st.ready.clear();
                    return Some((Err(e), st));
                }
            }
        }
    })
    .boxed()
}
