pub mod api;
pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod geo;
pub mod map;
pub mod parse;
pub mod ui;
