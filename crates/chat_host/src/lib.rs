//! Conversational assistant: session state, mode selection and the streamed
//! turn controller.

pub mod aggregate;
pub mod controller;
pub mod modes;
pub mod session;

pub use controller::{ChatTurnController, TurnInput, TurnOutcome, APOLOGY};
pub use modes::select_chat_config;
pub use session::ChatSession;
