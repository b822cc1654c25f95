pub mod memo;
pub mod model;
pub mod parsers;
pub mod sanitize;
pub mod transforms;
pub mod views;
