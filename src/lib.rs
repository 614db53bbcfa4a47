pub mod backport;
pub mod config;
pub mod error;
pub mod forge;
pub mod selection;
pub mod workspace;
