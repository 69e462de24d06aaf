pub mod ads;
pub mod app;
pub mod auth;
pub mod categories;
pub mod config;
pub mod error;
pub mod images;
pub mod likes;
pub mod state;
pub mod storage;
