//! Data model shared by every RVLA component.

mod action;
mod common;
mod event;
mod observation;
mod snippet;
mod state;

pub use action::*;
pub use common::*;
pub use event::*;
pub use observation::*;
pub use snippet::*;
pub use state::*;
