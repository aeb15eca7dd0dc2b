// Tests for the chunk relay's buffer/flush discipline.
//
// The relay sits between capture (which starts immediately) and the
// channel (which connects asynchronously); these tests verify that
// chunks captured before the channel opens are delivered in capture
// order, and that cancelled audio never reaches the sink.

mod support;

use speakset::{ChannelStatus, ChunkRelay, RelayError};
use support::FakeSink;

#[test]
fn buffered_chunks_flush_in_capture_order() {
    let sink = FakeSink::new(ChannelStatus::Connecting);
    let mut relay = ChunkRelay::new(1024 * 1024);

    // Three chunks arrive while the channel is still connecting.
    for i in 0u8..3 {
        relay.offer(&sink, vec![i; 4]).unwrap();
    }
    assert!(relay.is_buffering());
    assert_eq!(relay.buffered_chunks(), 3);
    assert!(sink.chunks().is_empty(), "nothing may be sent pre-connect");

    // The channel opens: everything flushes at once, in order.
    sink.set_status(ChannelStatus::Connected);
    relay.on_status(&sink, ChannelStatus::Connected);

    let sent = sink.chunks();
    assert_eq!(sent, vec![vec![0u8; 4], vec![1u8; 4], vec![2u8; 4]]);
    assert!(!relay.is_buffering());
    assert_eq!(relay.buffered_chunks(), 0);
}

#[test]
fn connected_chunks_forward_immediately() {
    let sink = FakeSink::new(ChannelStatus::Connected);
    let mut relay = ChunkRelay::new(1024);

    relay.offer(&sink, vec![1, 2, 3]).unwrap();

    assert_eq!(sink.chunks(), vec![vec![1, 2, 3]]);
    assert!(!relay.is_buffering());
}

#[test]
fn late_chunk_queues_behind_unflushed_buffer() {
    let sink = FakeSink::new(ChannelStatus::Connecting);
    let mut relay = ChunkRelay::new(1024);

    relay.offer(&sink, vec![0]).unwrap();
    relay.offer(&sink, vec![1]).unwrap();

    // The channel is already Connected when the third chunk arrives,
    // but the buffer has not flushed yet; order must still hold.
    sink.set_status(ChannelStatus::Connected);
    relay.offer(&sink, vec![2]).unwrap();

    assert_eq!(sink.chunks(), vec![vec![0], vec![1], vec![2]]);
    assert!(!relay.is_buffering());
}

#[test]
fn discard_drops_everything_unsent() {
    let sink = FakeSink::new(ChannelStatus::Connecting);
    let mut relay = ChunkRelay::new(1024);

    relay.offer(&sink, vec![1; 8]).unwrap();
    relay.offer(&sink, vec![2; 8]).unwrap();

    relay.discard();
    assert!(!relay.is_buffering());
    assert_eq!(relay.buffered_chunks(), 0);

    // A later connect must not resurrect cancelled audio.
    sink.set_status(ChannelStatus::Connected);
    relay.on_status(&sink, ChannelStatus::Connected);
    assert!(sink.chunks().is_empty());
}

#[test]
fn repeated_connect_transitions_flush_once() {
    let sink = FakeSink::new(ChannelStatus::Connecting);
    let mut relay = ChunkRelay::new(1024);

    relay.offer(&sink, vec![7]).unwrap();

    sink.set_status(ChannelStatus::Connected);
    relay.on_status(&sink, ChannelStatus::Connected);
    relay.on_status(&sink, ChannelStatus::Connected);

    // No duplicates from the second transition.
    assert_eq!(sink.chunks(), vec![vec![7]]);
}

#[test]
fn overflow_rejects_chunk_and_counts_it() {
    let sink = FakeSink::new(ChannelStatus::Connecting);
    let mut relay = ChunkRelay::new(10);

    relay.offer(&sink, vec![0; 8]).unwrap();

    let err = relay.offer(&sink, vec![1; 8]).unwrap_err();
    assert!(matches!(
        err,
        RelayError::BufferOverflow { buffered_bytes: 8 }
    ));
    assert_eq!(relay.dropped_chunks(), 1);

    // Chunks accepted before the overflow still flush.
    sink.set_status(ChannelStatus::Connected);
    relay.on_status(&sink, ChannelStatus::Connected);
    assert_eq!(sink.chunks(), vec![vec![0; 8]]);
}

#[test]
fn empty_buffer_flush_is_a_no_op() {
    let sink = FakeSink::new(ChannelStatus::Connected);
    let mut relay = ChunkRelay::new(1024);

    relay.on_status(&sink, ChannelStatus::Connected);
    assert!(sink.chunks().is_empty());
}
