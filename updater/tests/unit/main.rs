//! Integration tests for the update pipeline

mod mock;
mod test_install;
mod test_orchestrator;
