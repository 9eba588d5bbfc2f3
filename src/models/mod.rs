mod health;
mod item;

pub use health::*;
pub use item::*;
