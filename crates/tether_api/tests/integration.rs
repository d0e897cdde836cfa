use tether_api::{EventDispatcher, EventKind, RawFrame, SseFrameDecoder, StreamEvent};

const CHAT_STREAM: &str = concat!(
    "event: task_started\ndata: {\"task\":\"triage\"}\n\n",
    "event: tool_call\ndata: {\"tool\":\"search\"}\n\n",
    "event: text\ndata: \"hello\"\n\n",
    "event: tool_result\ndata: {\"tool\":\"search\"}\n\n",
    "event: done\ndata: {}\n\n",
);

fn decode_split(input: &str, split_at: usize) -> Vec<RawFrame> {
    let bytes = input.as_bytes();
    let mut decoder = SseFrameDecoder::default();
    let mut frames = decoder.feed(&bytes[..split_at]);
    frames.extend(decoder.feed(&bytes[split_at..]));
    frames
}

#[test]
fn decoding_is_invariant_under_chunk_boundaries() {
    let reference = SseFrameDecoder::decode_all(CHAT_STREAM);
    assert_eq!(reference.len(), 5);

    for split_at in 0..=CHAT_STREAM.len() {
        assert_eq!(
            decode_split(CHAT_STREAM, split_at),
            reference,
            "split at byte {split_at} changed the decoded frames"
        );
    }
}

#[test]
fn decoding_is_invariant_under_byte_at_a_time_feeding() {
    let reference = SseFrameDecoder::decode_all(CHAT_STREAM);

    let mut decoder = SseFrameDecoder::default();
    let mut frames = Vec::new();
    for byte in CHAT_STREAM.as_bytes() {
        frames.extend(decoder.feed(std::slice::from_ref(byte)));
    }

    assert_eq!(frames, reference);
}

#[test]
fn text_then_done_scenario_dispatches_two_events_and_stops() {
    let stream = "event: text\ndata: \"hi\"\n\nevent: done\ndata: {}\n\n";
    let frames = SseFrameDecoder::decode_all(stream);

    let mut dispatcher: EventDispatcher<Vec<StreamEvent>> = EventDispatcher::new();
    dispatcher.on(EventKind::Text, |seen, event| seen.push(event));
    dispatcher.on(EventKind::Done, |seen, event| seen.push(event));

    let mut seen = Vec::new();
    let mut halted = false;
    for frame in &frames {
        if !dispatcher.dispatch_frame(&mut seen, frame) {
            halted = true;
            break;
        }
    }

    assert!(halted);
    assert_eq!(
        seen,
        vec![
            StreamEvent::Text {
                content: "hi".to_string()
            },
            StreamEvent::Done,
        ]
    );
}

#[test]
fn events_after_done_are_never_dispatched() {
    let stream = concat!(
        "event: done\ndata: {}\n\n",
        "event: text\ndata: \"stale\"\n\n",
    );
    let frames = SseFrameDecoder::decode_all(stream);

    let mut dispatcher: EventDispatcher<Vec<StreamEvent>> = EventDispatcher::new();
    dispatcher.on(EventKind::Text, |seen, event| seen.push(event));

    let mut seen = Vec::new();
    for frame in &frames {
        dispatcher.dispatch_frame(&mut seen, frame);
    }

    assert!(seen.is_empty());
    assert!(dispatcher.is_done());
}

#[test]
fn unrecognizable_frames_produce_no_events() {
    let stream = concat!(
        "event: heartbeat\ndata: {}\n\n",
        ": keepalive comment\n\n",
        "event: text\ndata: not json\n\n",
    );
    let frames = SseFrameDecoder::decode_all(stream);

    let events: Vec<_> = frames
        .iter()
        .filter_map(StreamEvent::from_frame)
        .collect();
    assert!(events.is_empty());
}

#[test]
fn undelimited_remainder_is_not_a_frame() {
    let mut decoder = SseFrameDecoder::default();
    let frames = decoder.feed(b"event: text\ndata: \"complete\"\n\nevent: text\ndata: \"trunc");

    assert_eq!(frames.len(), 1);
    assert!(!decoder.is_empty());
    // Stream end: the decoder is dropped and the remainder with it.
}

#[test]
fn full_chat_stream_parses_every_kind_in_order() {
    let frames = SseFrameDecoder::decode_all(CHAT_STREAM);
    let kinds: Vec<_> = frames
        .iter()
        .filter_map(StreamEvent::from_frame)
        .map(|event| event.kind())
        .collect();

    assert_eq!(
        kinds,
        vec![
            EventKind::TaskStarted,
            EventKind::ToolCall,
            EventKind::Text,
            EventKind::ToolResult,
            EventKind::Done,
        ]
    );
}
