//! Domain types for the agent loop

mod action;
mod message;
mod response;
mod tool_call;

pub use action::{
    ActionRequest, ActionResult, CHECK_AVAILABILITY, GET_TIME_SLOTS, LIST_RESERVATIONS,
    SEARCH_RESTAURANTS,
};
pub use message::{Message, Role};
pub use response::{ActionCallRecord, ChatOutcome};
pub use tool_call::{ToolCall, ToolDefinition};
