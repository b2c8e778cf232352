//! View composition and teardown

mod engine;
mod error;
mod request;
mod teardown;

pub use engine::Engine;
pub use error::{messages, ComposeError};
pub use request::{AfterInsert, BeforeUnset, CompositionRequest, Content, ValueBinding};
pub use teardown::{TeardownEntry, TeardownRegistry};
