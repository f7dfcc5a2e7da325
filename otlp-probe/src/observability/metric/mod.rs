pub mod counter;
pub mod instance;
