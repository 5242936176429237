pub mod api;
pub mod config;
pub mod csv_data;
pub mod db;
pub mod pipeline;
