pub mod cohort;
pub mod free_slots;
pub mod load;
pub mod models;
pub mod summary;
pub mod title;
