pub mod audio;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod event;
pub mod http;
pub mod model;
pub mod util;
