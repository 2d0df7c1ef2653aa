//! Use cases for the deliberation engine

pub mod deliberation_controller;
pub mod deliberation_service;
pub mod speech_streamer;
