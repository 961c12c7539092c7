use crate::charset::{Alphabet, CategorySet};
use crate::error::{Error, Result};

pub const MIN_LENGTH: usize = 1;
pub const MAX_LENGTH: usize = 2048;
pub const DEFAULT_LENGTH: usize = 20;

pub const MAX_CUSTOM_CHARACTERS: usize = 1024;

/// Immutable snapshot of the options for one derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub length: usize,
    pub categories: CategorySet,
    pub custom_characters: String,
    pub require_each_selected: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            categories: CategorySet::LOWERCASE
                | CategorySet::UPPERCASE
                | CategorySet::NUMBERS
                | CategorySet::SYMBOLS,
            custom_characters: String::new(),
            require_each_selected: false,
        }
    }
}

impl Settings {
    pub fn new(length: usize, categories: CategorySet) -> Self {
        Self {
            length,
            categories,
            custom_characters: String::new(),
            require_each_selected: false,
        }
    }

    pub fn with_custom_characters(mut self, custom: impl Into<String>) -> Self {
        self.custom_characters = custom.into();
        self
    }

    pub fn with_require_each_selected(mut self, require: bool) -> Self {
        self.require_each_selected = require;
        self
    }

    pub fn clamp_length(length: i64) -> usize {
        length.clamp(MIN_LENGTH as i64, MAX_LENGTH as i64) as usize
    }

    /// Checks the snapshot and builds its alphabet.
    pub fn alphabet(&self) -> Result<Alphabet> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(Error::InvalidSettings(format!(
                "length must be between {} and {}, got {}",
                MIN_LENGTH, MAX_LENGTH, self.length
            )));
        }

        let custom_count = self.custom_characters.chars().count();
        if custom_count > MAX_CUSTOM_CHARACTERS {
            return Err(Error::InvalidSettings(format!(
                "too many custom characters ({}, maximum is {})",
                custom_count, MAX_CUSTOM_CHARACTERS
            )));
        }

        Alphabet::build(self.categories, &self.custom_characters)
    }
}
