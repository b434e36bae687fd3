pub mod migrate;
pub mod show;
