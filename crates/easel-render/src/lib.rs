pub mod http;

pub mod mock;

pub use http::{HttpRenderer, RenderConfig};
pub use mock::MockRenderer;
