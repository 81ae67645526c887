pub mod achievements;
pub mod clock;
mod daily;
pub mod level;
mod service;
pub mod streak;
pub mod summary;

#[cfg(test)]
mod tests;

pub use service::{
    Player, PreferencesUpdate, Progress, ProgressService, SaveProgress, Submission,
};
