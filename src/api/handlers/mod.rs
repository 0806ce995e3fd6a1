pub mod admin;
pub mod auth;
pub mod booking;
pub mod health;
pub mod notification;
pub mod profile;
pub mod service;
pub mod technician;
