pub mod api;
pub mod candidates;
pub mod config;
pub mod detect;
pub mod latch;
pub mod matcher;
pub mod pipeline;
pub mod preprocess;
pub mod recognize;
pub mod state;
pub mod storage;

pub use state::PortalState;
