pub mod audio;
pub mod desk;
pub mod export;
pub mod store;

pub use desk::{NewsDesk, Screen, SpeakOutcome};
pub use store::LocalStore;
