mod block;
mod event;
mod reducer;
mod summary;

pub use block::DisplayBlock;
pub use event::{EventMapper, TurnEvent};
pub use reducer::{ReducerEffect, TurnReducer};
pub use summary::summarize;
