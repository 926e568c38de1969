use super::block::DisplayBlock;
use super::event::TurnEvent;
use std::time::Instant;

/// What the caller should do after applying one event. Renderer-agnostic:
/// the terminal client and the relay server both consume these.
#[derive(Debug, Clone, PartialEq)]
pub enum ReducerEffect {
    /// Write this literal fragment; the full text lives in the open block.
    AppendText { text: String },
    /// Show a placeholder for a tool whose arguments are not yet known.
    ToolStarted { name: String },
    /// Replace the placeholder with a finalized invocation summary.
    ToolFinished {
        name: String,
        arguments: serde_json::Value,
        duration_seconds: f64,
    },
    /// The turn is over; state has been reset. Carries the flushed blocks.
    TurnComplete { blocks: Vec<DisplayBlock> },
    None,
}

/// One in-progress tool invocation, owned by the reducer for the turn.
#[derive(Debug)]
struct ToolInvocation {
    id: String,
    name: String,
    argument_buffer: String,
    parsed_arguments: Option<serde_json::Value>,
    started_at: Instant,
    completed: bool,
}

impl ToolInvocation {
    fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            argument_buffer: String::new(),
            parsed_arguments: None,
            started_at: Instant::now(),
            completed: false,
        }
    }
}

/// Reduces a flat, ordered sequence of turn events into display blocks.
///
/// Invocations are stored in an insertion-ordered table indexed by their
/// assigned ordinal, so fragment and end events resolve identity by direct
/// lookup instead of rescanning arrival order per event. Ordinals are
/// contiguous and never reused within a turn.
///
/// Infallible by contract: malformed argument fragments stay buffered until
/// they decode, out-of-range indices are dropped, and a repeated end event
/// for a completed invocation is a no-op.
#[derive(Debug, Default)]
pub struct TurnReducer {
    blocks: Vec<DisplayBlock>,
    invocations: Vec<ToolInvocation>,
    open_text: Option<usize>,
}

impl TurnReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered display blocks accumulated so far this turn, including the
    /// still-open text block. Tool blocks appear once finalized.
    pub fn blocks(&self) -> &[DisplayBlock] {
        &self.blocks
    }

    /// Identifier of the invocation at `ordinal`, if one is tracked.
    pub fn invocation_id(&self, ordinal: usize) -> Option<&str> {
        self.invocations.get(ordinal).map(|inv| inv.id.as_str())
    }

    /// Clear all turn state. Idempotent.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.invocations.clear();
        self.open_text = None;
    }

    pub fn apply(&mut self, event: TurnEvent) -> ReducerEffect {
        match event {
            TurnEvent::TextDelta { text } => self.apply_text_delta(text),
            TurnEvent::ToolInvocationStart { id, name } => self.apply_tool_start(id, name),
            TurnEvent::ToolArgumentFragment {
                block_index,
                fragment,
            } => self.apply_argument_fragment(block_index, &fragment),
            TurnEvent::BlockEnd { block_index } => self.apply_block_end(block_index),
            TurnEvent::TurnEnd => {
                let blocks = std::mem::take(&mut self.blocks);
                self.reset();
                ReducerEffect::TurnComplete { blocks }
            }
        }
    }

    fn apply_text_delta(&mut self, text: String) -> ReducerEffect {
        match self.open_text {
            Some(index) => {
                if let Some(DisplayBlock::Text { content }) = self.blocks.get_mut(index) {
                    content.push_str(&text);
                }
            }
            None => {
                self.open_text = Some(self.blocks.len());
                self.blocks.push(DisplayBlock::Text {
                    content: text.clone(),
                });
            }
        }
        ReducerEffect::AppendText { text }
    }

    fn apply_tool_start(&mut self, id: String, name: String) -> ReducerEffect {
        // A tool invocation closes the current text block; later text opens a
        // fresh one so block order matches arrival order.
        self.open_text = None;
        self.invocations.push(ToolInvocation::new(id, name.clone()));
        ReducerEffect::ToolStarted { name }
    }

    fn apply_argument_fragment(&mut self, block_index: usize, fragment: &str) -> ReducerEffect {
        let Some(invocation) = self.invocations.get_mut(block_index) else {
            return ReducerEffect::None;
        };
        if invocation.completed {
            return ReducerEffect::None;
        }

        invocation.argument_buffer.push_str(fragment);
        // Always re-decode the full buffer; a failure just means the
        // arguments are not parseable yet.
        if let Ok(parsed) = serde_json::from_str(&invocation.argument_buffer) {
            invocation.parsed_arguments = Some(parsed);
        }
        ReducerEffect::None
    }

    fn apply_block_end(&mut self, block_index: usize) -> ReducerEffect {
        let Some(invocation) = self.invocations.get_mut(block_index) else {
            return ReducerEffect::None;
        };
        if invocation.completed {
            return ReducerEffect::None;
        }

        invocation.completed = true;
        let arguments = invocation
            .parsed_arguments
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        let duration_seconds = invocation.started_at.elapsed().as_secs_f64();
        let name = invocation.name.clone();

        self.blocks.push(DisplayBlock::Tool {
            name: name.clone(),
            arguments: arguments.clone(),
            duration_seconds,
        });

        ReducerEffect::ToolFinished {
            name,
            arguments,
            duration_seconds,
        }
    }
}
