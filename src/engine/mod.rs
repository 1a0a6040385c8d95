pub mod components;
pub mod debug;
pub mod loaders;
pub mod managers;
pub mod rendering;
pub mod systems;
pub mod utils;

// Re-export the types most callers need
pub use components::*;
pub use managers::*;
pub use rendering::{GlApi, GlContext, GlError};
pub use systems::*;
pub use utils::*;
