pub mod controls;
pub mod dashboard;
pub mod date_range;
pub mod debug;
pub mod text_input;
