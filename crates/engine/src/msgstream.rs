//! Message-source contract and an in-memory stream
//!
//! The pipeline's input stage pulls [`MsgPack`]s from a [`MsgStream`]. Each
//! pack carries a batch of data-definition messages, the time range it covers
//! and the position it was read from, so a stopped pipeline can be re-pointed
//! with [`MsgStream::seek`].
//!
//! # Design Notes
//!
//! - `consume` blocks until a pack is available or the stream is closed
//! - `close` unblocks every waiting consumer; a closed stream yields `None`
//! - `seek` repositions the read cursor and works while the stream is idle

use parking_lot::{Condvar, Mutex};
use querynode_core::{DdlMsg, Error, Result, TimeRange, Timestamp};
use tracing::debug;

/// Where a pack sits in its channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MsgPosition {
    /// Channel the pack was read from
    pub channel_name: String,
    /// Offset of the pack within the channel
    pub msg_id: u64,
    /// Largest timestamp in the pack
    pub timestamp: Timestamp,
}

/// One batch as read from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgPack {
    /// Smallest timestamp covered
    pub begin_ts: Timestamp,
    /// Largest timestamp covered
    pub end_ts: Timestamp,
    /// Data-definition messages in arrival order
    pub msgs: Vec<DdlMsg>,
    /// Position of this pack
    pub start_position: MsgPosition,
}

impl MsgPack {
    /// Time range covered by the pack.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.begin_ts, self.end_ts)
    }
}

/// Source of data-definition batches
pub trait MsgStream: Send + Sync {
    /// Next pack, blocking until one arrives. `None` once the stream is closed.
    fn consume(&self) -> Option<MsgPack>;

    /// Reposition so the next `consume` returns the pack at `position`.
    fn seek(&self, position: &MsgPosition) -> Result<()>;

    /// Stop the stream and wake blocked consumers.
    fn close(&self);
}

// ============================================================================
// MemMsgStream
// ============================================================================

struct StreamState {
    packs: Vec<MsgPack>,
    cursor: usize,
    closed: bool,
}

/// Single-channel stream backed by memory
///
/// Producers append with [`MemMsgStream::produce`]; every pack is retained so
/// `seek` can rewind to any earlier position.
pub struct MemMsgStream {
    channel: String,
    state: Mutex<StreamState>,
    available: Condvar,
}

impl MemMsgStream {
    /// Create an empty stream for `channel`.
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            state: Mutex::new(StreamState {
                packs: Vec::new(),
                cursor: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Append a pack covering `time_range` and return its position.
    pub fn produce(&self, msgs: Vec<DdlMsg>, time_range: TimeRange) -> MsgPosition {
        let mut state = self.state.lock();
        let position = MsgPosition {
            channel_name: self.channel.clone(),
            msg_id: state.packs.len() as u64,
            timestamp: time_range.timestamp_max,
        };
        state.packs.push(MsgPack {
            begin_ts: time_range.timestamp_min,
            end_ts: time_range.timestamp_max,
            msgs,
            start_position: position.clone(),
        });
        drop(state);
        self.available.notify_one();
        position
    }

    /// Packs not yet consumed.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.packs.len().saturating_sub(state.cursor)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl MsgStream for MemMsgStream {
    fn consume(&self) -> Option<MsgPack> {
        let mut state = self.state.lock();
        while !state.closed && state.cursor >= state.packs.len() {
            self.available.wait(&mut state);
        }
        if state.closed {
            return None;
        }
        let pack = state.packs[state.cursor].clone();
        state.cursor += 1;
        Some(pack)
    }

    fn seek(&self, position: &MsgPosition) -> Result<()> {
        if position.channel_name != self.channel {
            return Err(Error::InvalidState(format!(
                "seek: position belongs to channel '{}', stream reads '{}'",
                position.channel_name, self.channel
            )));
        }
        let mut state = self.state.lock();
        let cursor = (position.msg_id as usize).min(state.packs.len());
        debug!(
            target: "querynode::msgstream",
            channel = %self.channel,
            from = state.cursor,
            to = cursor,
            "Seek"
        );
        state.cursor = cursor;
        Ok(())
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn drop_msg(id: i64, ts: Timestamp) -> DdlMsg {
        DdlMsg::DropCollection {
            collection_id: id,
            timestamp: ts,
        }
    }

    #[test]
    fn test_consume_in_order() {
        let stream = MemMsgStream::new("dml-0");
        stream.produce(vec![drop_msg(1, 10)], TimeRange::new(10, 10));
        stream.produce(vec![drop_msg(2, 20)], TimeRange::new(20, 20));

        let first = stream.consume().unwrap();
        assert_eq!(first.start_position.msg_id, 0);
        assert_eq!(first.time_range(), TimeRange::new(10, 10));
        assert_eq!(stream.consume().unwrap().msgs, vec![drop_msg(2, 20)]);
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_close_unblocks_consumer() {
        let stream = Arc::new(MemMsgStream::new("dml-0"));
        let consumer = {
            let stream = Arc::clone(&stream);
            thread::spawn(move || stream.consume())
        };
        thread::sleep(Duration::from_millis(20));
        stream.close();
        assert!(consumer.join().unwrap().is_none());
        assert!(stream.is_closed());
    }

    #[test]
    fn test_seek_rewinds() {
        let stream = MemMsgStream::new("dml-0");
        let first = stream.produce(vec![drop_msg(1, 10)], TimeRange::new(5, 10));
        stream.produce(vec![drop_msg(2, 20)], TimeRange::new(15, 20));
        stream.consume().unwrap();
        stream.consume().unwrap();

        stream.seek(&first).unwrap();
        assert_eq!(stream.pending(), 2);
        assert_eq!(stream.consume().unwrap().start_position, first);
    }

    #[test]
    fn test_seek_past_end_clamps() {
        let stream = MemMsgStream::new("dml-0");
        stream.produce(vec![], TimeRange::new(1, 1));
        let position = MsgPosition {
            channel_name: "dml-0".to_string(),
            msg_id: 99,
            timestamp: 0,
        };
        stream.seek(&position).unwrap();
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_seek_wrong_channel() {
        let stream = MemMsgStream::new("dml-0");
        let position = MsgPosition {
            channel_name: "dml-1".to_string(),
            msg_id: 0,
            timestamp: 0,
        };
        assert!(matches!(stream.seek(&position), Err(Error::InvalidState(_))));
    }
}
