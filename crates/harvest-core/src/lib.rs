pub mod config;
pub mod logging;

// Domain model
pub mod episode;
pub mod error;
pub mod media;
pub mod source;

// Collaborators
pub mod downloader;
pub mod probe;
pub mod process;
pub mod verify;

// Orchestration
pub mod control;
pub mod discovery;
pub mod orchestrator;
pub mod scheduler;
pub mod session;
pub mod summary;
