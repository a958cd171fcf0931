//! Batch pipeline that loads MovieLens-style movies and ratings, enriches
//! movies through OMDb, and writes them into four relational tables.

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod extract;
pub mod loader;
pub mod models;
pub mod omdb;
pub mod processor;
pub mod queries;
pub mod title;
