//! Built-in tools that models can use.

mod add;

pub use add::{AddTool, AddToolParameters};
