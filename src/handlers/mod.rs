// src/handlers/mod.rs

pub mod auth;
pub mod category;
pub mod feed;
pub mod profile;
pub mod response;
pub mod survey;
pub mod wallet;
