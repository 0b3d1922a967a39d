//! Position feed: turning an input stream into tracker inputs.
//!
//! A feed is any iterator of [`FeedInput`]. Position fixes and source errors
//! arrive on the same item type but on separate arms of a `Result`, so the
//! tracker sees one contract regardless of where positions come from.
//! [`Subscription`] makes a feed cancellable: once cancelled or exhausted it
//! yields nothing ever again.

use std::io::{BufRead, ErrorKind};

use jiff::Timestamp;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::error::PositionSourceError;
use crate::model::PositionFix;

/// One input for the tracker, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedInput {
    Position(Result<PositionFix, PositionSourceError>),
    Skip { at: Timestamp },
    Reached { at: Timestamp },
    Accept { at: Timestamp, offer_id: Option<Uuid> },
    Decline { at: Timestamp, offer_id: Option<Uuid> },
    Tick { at: Timestamp },
}

/// One line of an event script.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ScriptLine {
    Fix(PositionFix),
    Error {
        #[serde(default)]
        code: Option<u16>,
        #[serde(default)]
        message: Option<String>,
    },
    Skip {
        at_ms: i64,
    },
    Reached {
        at_ms: i64,
    },
    Accept {
        at_ms: i64,
        #[serde(default)]
        offer_id: Option<Uuid>,
    },
    Decline {
        at_ms: i64,
        #[serde(default)]
        offer_id: Option<Uuid>,
    },
    Tick {
        at_ms: i64,
    },
}

/// Reads an event script, one JSON object per line.
///
/// ```text
/// {"event":"fix","latitude":41.89,"longitude":12.49,"accuracy":5,"timestampMs":1714550400000}
/// {"event":"error","code":3,"message":"timeout"}
/// {"event":"skip","atMs":1714550460000}
/// {"event":"decline","atMs":1714550470000}
/// ```
///
/// Blank lines are skipped. A line that does not parse becomes a
/// [`PositionSourceError::Decode`] and the feed carries on. A read error is
/// reported once as [`PositionSourceError::Unavailable`] and ends the feed.
pub struct JsonlFeed<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    failed: bool,
}

impl<R: BufRead> JsonlFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            failed: false,
        }
    }

    fn decode(&self, line: &str) -> FeedInput {
        let parsed: ScriptLine = match serde_json::from_str(line) {
            Ok(p) => p,
            Err(e) => return self.decode_error(&e.to_string()),
        };

        let at = |ms: i64| Timestamp::from_millisecond(ms).map_err(|e| e.to_string());
        let input = match parsed {
            ScriptLine::Fix(fix) => {
                if fix.timestamp().is_none() {
                    return self.decode_error("timestampMs out of range");
                }
                Ok(FeedInput::Position(Ok(fix)))
            }
            ScriptLine::Error { code, message } => Ok(FeedInput::Position(Err(
                source_error(code, message),
            ))),
            ScriptLine::Skip { at_ms } => at(at_ms).map(|at| FeedInput::Skip { at }),
            ScriptLine::Reached { at_ms } => at(at_ms).map(|at| FeedInput::Reached { at }),
            ScriptLine::Accept { at_ms, offer_id } => {
                at(at_ms).map(|at| FeedInput::Accept { at, offer_id })
            }
            ScriptLine::Decline { at_ms, offer_id } => {
                at(at_ms).map(|at| FeedInput::Decline { at, offer_id })
            }
            ScriptLine::Tick { at_ms } => at(at_ms).map(|at| FeedInput::Tick { at }),
        };

        input.unwrap_or_else(|e| self.decode_error(&e))
    }

    fn decode_error(&self, message: &str) -> FeedInput {
        warn!(line = self.line_no, error = message, "skipping malformed feed line");
        FeedInput::Position(Err(PositionSourceError::Decode(format!(
            "line {}: {message}",
            self.line_no
        ))))
    }
}

impl<R: BufRead> Iterator for JsonlFeed<R> {
    type Item = FeedInput;

    fn next(&mut self) -> Option<FeedInput> {
        if self.failed {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Some(self.decode_error(&e.to_string()));
                }
                Err(e) => {
                    warn!(line = self.line_no, error = %e, "feed read failed, closing");
                    self.failed = true;
                    return Some(FeedInput::Position(Err(PositionSourceError::Unavailable(
                        e.to_string(),
                    ))));
                }
            };
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(self.decode(trimmed));
            }
        }
    }
}

/// Maps geolocation-style error codes: 1 permission, 2 unavailable, 3 timeout.
fn source_error(code: Option<u16>, message: Option<String>) -> PositionSourceError {
    match code {
        Some(1) => PositionSourceError::PermissionDenied,
        Some(3) => PositionSourceError::Timeout,
        _ => PositionSourceError::Unavailable(message.unwrap_or_else(|| "unknown error".into())),
    }
}

/// A cancellable, non-restartable view over a feed.
pub struct Subscription<I> {
    feed: Option<I>,
    cancel: CancellationToken,
}

impl<I: Iterator<Item = FeedInput>> Subscription<I> {
    pub fn new(feed: I) -> Self {
        Self {
            feed: Some(feed),
            cancel: CancellationToken::new(),
        }
    }

    /// A token that stops this subscription from any thread.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<I: Iterator<Item = FeedInput>> Iterator for Subscription<I> {
    type Item = FeedInput;

    fn next(&mut self) -> Option<FeedInput> {
        if self.cancel.is_cancelled() {
            // Drop the source so it is released as soon as we stop.
            self.feed = None;
            return None;
        }
        let item = self.feed.as_mut()?.next();
        if item.is_none() {
            self.feed = None;
        }
        item
    }
}
