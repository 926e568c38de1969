use crate::types::{ContentBlock, StreamEvent};
use std::collections::HashMap;

/// Reducer input. `block_index` is the invocation ordinal: the
/// order-of-first-appearance rank among tool invocations in the current turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    TextDelta {
        text: String,
    },
    ToolInvocationStart {
        id: String,
        name: String,
    },
    ToolArgumentFragment {
        block_index: usize,
        fragment: String,
    },
    BlockEnd {
        block_index: usize,
    },
    TurnEnd,
}

/// Translates wire stream events into reducer events.
///
/// The wire protocol numbers all content blocks (text and tool alike), while
/// the reducer tracks tool invocations by a contiguous ordinal assigned in
/// first-seen order. This mapper owns that translation so the reducer never
/// sees a raw wire index. Fragment or stop events for wire indices that never
/// announced a tool block translate to nothing; the upstream ordering
/// guarantees are not strong enough to treat those as errors.
#[derive(Debug, Default)]
pub struct EventMapper {
    tool_ordinals: HashMap<usize, usize>,
}

impl EventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-turn state. Call alongside `TurnReducer::reset`.
    pub fn reset(&mut self) {
        self.tool_ordinals.clear();
    }

    pub fn map(&mut self, event: &StreamEvent) -> Option<TurnEvent> {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                content_block: ContentBlock::ToolUse { id, name, .. },
            } => {
                let ordinal = self.tool_ordinals.len();
                self.tool_ordinals.entry(*index).or_insert(ordinal);
                Some(TurnEvent::ToolInvocationStart {
                    id: id.clone(),
                    name: name.clone(),
                })
            }
            // Text blocks open implicitly on their first delta.
            StreamEvent::ContentBlockStart { .. } => None,
            StreamEvent::ContentBlockDelta { index, delta } => {
                if let Some(text) = &delta.text {
                    return Some(TurnEvent::TextDelta { text: text.clone() });
                }
                if let Some(fragment) = &delta.partial_json {
                    let block_index = self.tool_ordinals.get(index).copied()?;
                    return Some(TurnEvent::ToolArgumentFragment {
                        block_index,
                        fragment: fragment.clone(),
                    });
                }
                None
            }
            StreamEvent::ContentBlockStop { index } => {
                let block_index = self.tool_ordinals.get(index).copied()?;
                Some(TurnEvent::BlockEnd { block_index })
            }
            StreamEvent::MessageStop => {
                self.reset();
                Some(TurnEvent::TurnEnd)
            }
            StreamEvent::MessageStart { .. }
            | StreamEvent::MessageDelta { .. }
            | StreamEvent::Unknown => None,
        }
    }
}
