pub mod activities;
pub mod models;
pub mod slots;
