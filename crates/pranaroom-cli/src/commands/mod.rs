pub mod config;
pub mod practice;
pub mod techniques;
