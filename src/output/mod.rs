pub mod actions;
pub mod json;
pub mod table;
