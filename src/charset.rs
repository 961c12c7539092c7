//! Character categories and alphabet construction.

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::collections::HashMap;
use std::fmt;

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const NUMBERS: &str = "0123456789";
pub const SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Latin-1 supplement, U+00A0 through U+00FF.
pub const EXTENDED_LATIN: std::ops::RangeInclusive<char> = '\u{A0}'..='\u{FF}';

/// Largest alphabet that two-byte draws can index.
pub const MAX_ALPHABET_SIZE: usize = 65536;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CategorySet: u8 {
        const LOWERCASE = 1 << 0;
        const UPPERCASE = 1 << 1;
        const NUMBERS = 1 << 2;
        const SYMBOLS = 1 << 3;
        const EXTENDED_LATIN = 1 << 4;
        const CUSTOM = 1 << 5;

        const STANDARD = Self::LOWERCASE.bits()
            | Self::UPPERCASE.bits()
            | Self::NUMBERS.bits()
            | Self::SYMBOLS.bits()
            | Self::EXTENDED_LATIN.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Lowercase,
    Uppercase,
    Numbers,
    Symbols,
    ExtendedLatin,
    Custom,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Lowercase,
        Category::Uppercase,
        Category::Numbers,
        Category::Symbols,
        Category::ExtendedLatin,
        Category::Custom,
    ];

    pub fn flag(self) -> CategorySet {
        match self {
            Category::Lowercase => CategorySet::LOWERCASE,
            Category::Uppercase => CategorySet::UPPERCASE,
            Category::Numbers => CategorySet::NUMBERS,
            Category::Symbols => CategorySet::SYMBOLS,
            Category::ExtendedLatin => CategorySet::EXTENDED_LATIN,
            Category::Custom => CategorySet::CUSTOM,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Lowercase => "lowercase",
            Category::Uppercase => "uppercase",
            Category::Numbers => "numbers",
            Category::Symbols => "symbols",
            Category::ExtendedLatin => "extended latin",
            Category::Custom => "custom",
        }
    }

    /// Fixed contents of a standard category. Custom has none.
    pub fn characters(self) -> Vec<char> {
        match self {
            Category::Lowercase => LOWERCASE.chars().collect(),
            Category::Uppercase => UPPERCASE.chars().collect(),
            Category::Numbers => NUMBERS.chars().collect(),
            Category::Symbols => SYMBOLS.chars().collect(),
            Category::ExtendedLatin => EXTENDED_LATIN.collect(),
            Category::Custom => Vec::new(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Categories present in a set, in canonical order.
pub fn categories_in(set: CategorySet) -> impl Iterator<Item = Category> {
    Category::ALL
        .into_iter()
        .filter(move |category| set.contains(category.flag()))
}

/// Ordered alphabet for one settings snapshot, with per-character membership.
///
/// Duplicates are kept: a character listed twice is twice as likely to be
/// drawn. A custom character that also belongs to a standard category is a
/// member of both.
#[derive(Debug, Clone)]
pub struct Alphabet {
    chars: Vec<char>,
    membership: HashMap<char, CategorySet>,
    required: CategorySet,
}

impl Alphabet {
    pub fn build(categories: CategorySet, custom_characters: &str) -> Result<Self> {
        let mut chars = Vec::new();
        let mut membership: HashMap<char, CategorySet> = HashMap::new();
        let mut required = CategorySet::empty();

        for category in categories_in(categories & CategorySet::STANDARD) {
            let flag = category.flag();
            for ch in category.characters() {
                chars.push(ch);
                *membership.entry(ch).or_default() |= flag;
            }
            required |= flag;
        }

        if !custom_characters.is_empty() {
            for ch in custom_characters.chars() {
                chars.push(ch);
                *membership.entry(ch).or_default() |= CategorySet::CUSTOM;
            }
            required |= CategorySet::CUSTOM;
        }

        if chars.is_empty() {
            return Err(Error::InvalidSettings(
                "no character categories selected and no custom characters given".into(),
            ));
        }

        if chars.len() > MAX_ALPHABET_SIZE {
            return Err(Error::InvalidSettings(format!(
                "alphabet has {} characters, maximum is {}",
                chars.len(),
                MAX_ALPHABET_SIZE
            )));
        }

        Ok(Self {
            chars,
            membership,
            required,
        })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn char_at(&self, index: usize) -> char {
        self.chars[index]
    }

    pub fn distinct_len(&self) -> usize {
        self.membership.len()
    }

    /// Categories that a coverage check must find in the output.
    pub fn required(&self) -> CategorySet {
        self.required
    }

    pub fn membership(&self, ch: char) -> CategorySet {
        self.membership.get(&ch).copied().unwrap_or_default()
    }

    pub fn contains(&self, ch: char) -> bool {
        self.membership.contains_key(&ch)
    }

    pub fn covered_by<I>(&self, chars: I) -> CategorySet
    where
        I: IntoIterator<Item = char>,
    {
        chars
            .into_iter()
            .fold(CategorySet::empty(), |acc, ch| acc | self.membership(ch))
    }

    /// Fewest characters that can jointly cover every required category.
    ///
    /// Breadth-first search over the union masks reachable from the
    /// distinct per-character memberships. At most 64 states exist.
    pub fn min_cover_size(&self) -> usize {
        let target = self.required.bits();
        if target == 0 {
            return 0;
        }

        let mut masks: Vec<u8> = self
            .membership
            .values()
            .map(|set| set.bits() & target)
            .filter(|bits| *bits != 0)
            .collect();
        masks.sort_unstable();
        masks.dedup();

        let mut frontier = vec![0u8];
        let mut seen = [false; 64];
        seen[0] = true;

        for depth in 1..=Category::ALL.len() {
            let mut next = Vec::new();
            for state in &frontier {
                for mask in &masks {
                    let union = state | mask;
                    if union == target {
                        return depth;
                    }
                    if !seen[union as usize] {
                        seen[union as usize] = true;
                        next.push(union);
                    }
                }
            }
            frontier = next;
        }

        // Every required category contributes at least one character, so
        // one character per category always covers.
        Category::ALL.len()
    }
}
