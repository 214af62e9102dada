//! Turns a provider's streaming response into a stream of plain text deltas.
//!
//! The upstream body is a sequence of newline-delimited framing units
//! (server-sent event lines carrying JSON chunks). Each unit either yields a
//! text delta or is skipped; a unit that fails to parse never ends the relay.

use std::{collections::VecDeque, fmt::Display, io, pin::Pin};

use axum::body::Bytes;
use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

const DONE_MARKER: &str = "[DONE]";

/// Longest partial line held while waiting for its newline.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Splits raw bytes into complete lines, holding a partial trailing line
/// until the next chunk arrives.
///
/// A partial line that grows past the limit is discarded along with the rest
/// of that line; the count of such lines is kept in `oversized`.
#[derive(Debug)]
pub struct FrameSplitter {
    partial: Vec<u8>,
    limit: usize,
    discarding: bool,
    oversized: usize,
}

impl Default for FrameSplitter {
    fn default() -> Self {
        Self::with_limit(MAX_FRAME_BYTES)
    }
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            partial: Vec::new(),
            limit,
            discarding: false,
            oversized: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let line = &rest[..pos];
            if self.discarding {
                self.discarding = false;
            } else {
                self.partial.extend_from_slice(line);
                frames.push(std::mem::take(&mut self.partial));
            }
            rest = &rest[pos + 1..];
        }

        if !self.discarding {
            self.partial.extend_from_slice(rest);
            if self.partial.len() > self.limit {
                warn!(held = self.partial.len(), limit = self.limit, "dropping oversized frame");
                self.partial = Vec::new();
                self.discarding = true;
                self.oversized += 1;
            }
        }
        frames
    }

    /// Remaining bytes once the upstream has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.discarding = false;
        if self.partial.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.partial))
        }
    }

    /// Lines dropped for exceeding the limit.
    pub fn oversized(&self) -> usize {
        self.oversized
    }
}

/// Extracts the text delta from one framing unit, if it carries one.
pub fn parse_delta(frame: &[u8]) -> Option<String> {
    let line = std::str::from_utf8(frame).ok()?.trim_end_matches('\r');
    if line.starts_with(':') {
        return None;
    }

    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    };
    if payload.trim().is_empty() || payload.trim() == DONE_MARKER {
        return None;
    }

    let value: Value = serde_json::from_str(payload).ok()?;
    let choice = value.get("choices")?.get(0)?;
    choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .or_else(|| choice.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

struct RelayState<S> {
    upstream: Option<Pin<Box<S>>>,
    splitter: FrameSplitter,
    pending: VecDeque<String>,
    skipped: usize,
}

impl<S> RelayState<S> {
    fn accept(&mut self, frame: &[u8]) {
        match parse_delta(frame) {
            Some(delta) => self.pending.push_back(delta),
            None => {
                if !frame.iter().all(u8::is_ascii_whitespace) {
                    self.skipped += 1;
                }
            }
        }
    }

    fn release(&mut self) {
        if self.upstream.take().is_some() {
            debug!(
                skipped = self.skipped + self.splitter.oversized(),
                "upstream stream released"
            );
        }
    }
}

/// Relays text deltas from `upstream` in arrival order.
///
/// The returned stream owns the upstream; dropping it at any point drops the
/// upstream body as well. A transport error ends the relay with an
/// `io::Error` so the downstream body terminates abnormally.
pub fn relay<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, io::Error>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = RelayState {
        upstream: Some(Box::pin(upstream)),
        splitter: FrameSplitter::new(),
        pending: VecDeque::new(),
        skipped: 0,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(Bytes::from(delta)), state));
            }

            let upstream = state.upstream.as_mut()?;
            let next = upstream.next().await;
            match next {
                Some(Ok(chunk)) => {
                    for frame in state.splitter.push(&chunk) {
                        state.accept(&frame);
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "upstream stream failed mid-relay");
                    state.release();
                    return Some((Err(io::Error::other(err.to_string())), state));
                }
                None => {
                    if let Some(rest) = state.splitter.finish() {
                        state.accept(&rest);
                    }
                    state.release();
                }
            }
        }
    })
}
