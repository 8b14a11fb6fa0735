pub mod assets;
pub mod clock;
pub mod render_device;
pub mod scene;

pub use assets::*;
pub use clock::*;
pub use render_device::*;
pub use scene::*;
