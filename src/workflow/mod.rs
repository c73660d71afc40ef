//! Request orchestration.
//!
//! `state` holds the transition function; `controller` runs it against the
//! real collaborators and timers. UI/CLI layers talk to the controller only
//! through `UiCommand`s and receive `WorkflowEvent`s back.

mod controller;
mod state;

pub(crate) use controller::{run_controller, Collaborators, UiCommand};
