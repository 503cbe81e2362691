pub mod keyboard_input;

mod dispatch;
mod orchestrator;
mod runtime;
mod scripted;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use dispatch::ActionDispatcher;
pub use keyboard_input::{command_for_key, KeyCommand, KeyboardInputHandler};
pub use orchestrator::PlaceSnapApp;
pub use types::{ComponentState, ShutdownReason};
