pub mod presets;
pub mod relax;
