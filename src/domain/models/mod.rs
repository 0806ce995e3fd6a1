pub mod admin;
pub mod analytics;
pub mod auth;
pub mod booking;
pub mod job;
pub mod notification;
pub mod otp;
pub mod rating;
pub mod service;
pub mod technician;
pub mod user;
