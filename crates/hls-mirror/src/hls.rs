mod loader;
mod mirror;

pub use loader::load_m3u8;
pub use m3u8_rs;
pub use mirror::*;
