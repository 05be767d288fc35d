pub mod activities;
pub mod admin;
