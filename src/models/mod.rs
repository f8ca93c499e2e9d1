pub mod booking;
pub mod chat;
pub mod contact;
pub mod profile;
pub mod tour;
