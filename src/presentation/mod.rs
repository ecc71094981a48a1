//! HTML pages served to readers.

pub mod views;
