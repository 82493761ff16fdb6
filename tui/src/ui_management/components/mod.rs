mod component;
pub mod input_box;

pub use component::{Component, ComponentRender, KeyHandled};
