//! Chat layer: intent routing, command handlers and user-facing texts.

pub mod dispatcher;
pub mod handlers;
pub mod messages;

pub use dispatcher::{classify, Dispatcher, Inbound, Intent, PageRequest, Routing};
pub use handlers::Handlers;
