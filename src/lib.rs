pub mod config;
pub mod dispatch;
pub mod observability;
pub mod progress;
pub mod queue;
pub mod request;
pub mod spider;
pub mod store;
pub mod transport;

pub use dispatch::{DispatchError, Dispatcher, RunSummary};
pub use spider::{HandlerError, Spider, ValidationOutcome};
