//! Command-line front end over the profile store

pub mod args;
pub mod commands;
