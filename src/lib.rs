pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod generator;
pub mod history;
pub mod indicators;
pub mod market;
pub mod rpc;
pub mod stats;
pub mod tui;
pub mod types;
pub mod web;
