// UI and formatting module

pub mod formatters;
