pub mod bootstrap;
pub mod commands;
pub mod feed;
pub mod submission;
