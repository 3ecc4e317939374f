pub mod activities;
pub mod adapters;
pub mod models;
pub mod outcome;
