pub mod config;
pub mod generate;
pub mod output;
pub mod revariate;
