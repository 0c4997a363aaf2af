//! Server-sent events framing for streamed chat responses.

use std::collections::VecDeque;
use std::fmt::Display;

use futures_util::stream::{self, Stream, StreamExt};

use crate::domain::DomainError;

struct FrameState<S> {
    bytes: S,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

/// Payloads of the `data:` lines in a server-sent event body, in order.
///
/// Network chunks may split a line anywhere; lines are only emitted once
/// complete. Event names, ids, comments and blank separators are dropped.
/// A transport error ends the stream with
/// [`DomainError::ProviderUnavailable`].
pub(crate) fn data_payloads<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, DomainError>> + Send
where
    S: Stream<Item = Result<B, E>> + Unpin + Send,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = FrameState {
        bytes,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(end) = state.buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = state.buffer.drain(..=end).collect();
                        if let Some(payload) = data_payload(&line[..end]) {
                            state.pending.push_back(payload);
                        }
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((
                        Err(DomainError::provider_unavailable(format!(
                            "response stream interrupted: {e}"
                        ))),
                        state,
                    ));
                }
                None => {
                    state.done = true;
                    let rest = std::mem::take(&mut state.buffer);
                    if let Some(payload) = data_payload(&rest) {
                        state.pending.push_back(payload);
                    }
                }
            }
        }
    })
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let payload = line.strip_prefix(b"data:")?;
    let payload = payload.strip_prefix(b" ").unwrap_or(payload);
    Some(String::from_utf8_lossy(payload).into_owned())
}
