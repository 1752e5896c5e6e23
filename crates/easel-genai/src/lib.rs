pub mod http;

pub mod mock;

pub use http::{GenAiConfig, HttpContentGenerator};
pub use mock::{MockGenerator, MockReply};
