use agentline::api::StreamParser;
use agentline::types::{ContentBlock, StreamEvent};

#[test]
fn test_fragmented_events() {
    let mut parser = StreamParser::new();

    let chunk1 = b"event: content_block_delta\ndata: {\"type\":\"content";
    let events1 = parser.process(chunk1).expect("first chunk parse");
    assert_eq!(events1.len(), 0);

    let chunk2 =
        b"_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n";
    let events2 = parser.process(chunk2).expect("second chunk parse");
    assert_eq!(events2.len(), 1);
}

#[test]
fn test_parse_error_does_not_fail_the_stream() {
    let mut parser = StreamParser::new();

    let chunk = b"event: message_start\ndata: {invalid json}\n\n";
    let events = parser
        .process(chunk)
        .expect("malformed record should be skipped");
    assert_eq!(events.len(), 0);

    // The parser keeps working after a bad record.
    let chunk = b"event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";
    let events = parser.process(chunk).expect("next record parse");
    assert!(matches!(events.as_slice(), [StreamEvent::MessageStop]));
}

#[test]
fn test_partial_json_delta_is_parsed() {
    let mut parser = StreamParser::new();

    let chunk = b"event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"path\\\":\\\"src/\"}}\n\n";
    let events = parser
        .process(chunk)
        .expect("parser should parse input_json deltas");
    assert_eq!(events.len(), 1);

    match &events[0] {
        StreamEvent::ContentBlockDelta { index, delta } => {
            assert_eq!(*index, 1);
            assert_eq!(delta.partial_json.as_deref(), Some("{\"path\":\"src/"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_tool_use_start_without_input_is_accepted() {
    let mut parser = StreamParser::new();

    let chunk = b"event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":1,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_123\",\"name\":\"Write\"}}\n\n";
    let events = parser
        .process(chunk)
        .expect("tool_use start without explicit input should parse");
    assert_eq!(events.len(), 1);

    match &events[0] {
        StreamEvent::ContentBlockStart {
            index,
            content_block,
        } => {
            assert_eq!(*index, 1);
            match content_block {
                ContentBlock::ToolUse { id, name, input } => {
                    assert_eq!(id, "toolu_123");
                    assert_eq!(name, "Write");
                    assert_eq!(input, &serde_json::json!({}));
                }
                other => panic!("unexpected block type: {other:?}"),
            }
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_data_only_record_without_event_line_is_accepted() {
    let mut parser = StreamParser::new();

    let chunk = b"data: {\"type\":\"message_stop\"}\n\n";
    let events = parser.process(chunk).expect("data-only record parse");
    assert!(matches!(events.as_slice(), [StreamEvent::MessageStop]));
}

#[test]
fn test_done_sentinel_is_skipped() {
    let mut parser = StreamParser::new();

    let chunk = b"data: [DONE]\n\n";
    let events = parser.process(chunk).expect("sentinel record parse");
    assert!(events.is_empty());
    assert!(parser.flush().is_empty());
}

#[test]
fn test_unknown_event_types_are_tolerated() {
    let mut parser = StreamParser::new();

    let chunk = b"event: ping\ndata: {\"type\":\"ping\"}\n\n";
    let events = parser.process(chunk).expect("unknown event parse");
    assert!(matches!(events.as_slice(), [StreamEvent::Unknown]));
}
