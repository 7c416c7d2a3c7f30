pub mod gate;
pub mod install;
pub mod orchestrator;
pub mod refresh;
pub mod upload;
