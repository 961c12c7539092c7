pub mod charset;
pub mod config;
pub mod error;
pub mod expander;
pub mod generator;
pub mod seed;
pub mod server;
pub mod settings;

pub use charset::{Alphabet, Category, CategorySet};
pub use error::{Error, Result};
pub use generator::{generate_password, generate_password_with_budget};
pub use seed::{Collector, MotionSample, Seed, digest_samples, reduce_samples};
pub use settings::Settings;
