//! Model stream protocol types and source trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    DeltaStream, Message, Mode, ModelRequest, ModelStream, RequestContext, Role, StreamDelta,
    ToolCallFragment,
};
