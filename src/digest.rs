//! The digest pipeline: enumerate channels, collect today's mentions, resolve
//! authors, and assemble a capped block list.

pub mod assemble;
pub mod channels;
pub mod filter;
pub mod history;
pub mod identity;
pub mod service;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use assemble::{Assembler, ModalView, RenderBlock};
pub use filter::MentionFilter;
pub use service::DigestService;
pub use window::DayZone;
