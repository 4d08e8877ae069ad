// src/models/mod.rs

pub mod category;
pub mod question;
pub mod response;
pub mod survey;
pub mod transaction;
pub mod user;
