/// Shared fixtures for the migration integration tests
#[allow(dead_code)]
pub mod repository_states;
