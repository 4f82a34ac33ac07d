//! Content stream operator model
//!
//! [`ContentTokenizer`] splits raw bytes into operator groups, [`ContentParser`]
//! turns them into typed [`Operator`]s resolved against the page resources, and
//! [`GraphicsState::react`] replays their effect on the device-independent
//! graphics state.

mod operator;
mod parser;
mod state;
mod tokenizer;

pub use operator::{InlineImage, Operator, TextArrayElement};
pub use parser::{ContentParser, ParsedOperation};
pub use state::{
    AdditionalState, GraphicsState, PathConstructionState, TextObjectState, TextState,
};
pub use tokenizer::{ContentTokenizer, RawOperation};
