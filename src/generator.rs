use crate::charset::{Alphabet, categories_in};
use crate::error::{Error, Result};
use crate::expander::Expander;
use crate::seed::Seed;
use crate::settings::Settings;
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const MAX_COVERAGE_ATTEMPTS: usize = 1000;

/// Largest multiple of `alphabet_size` that fits in a draw of `space` values.
pub fn rejection_threshold(space: usize, alphabet_size: usize) -> usize {
    space - (space % alphabet_size)
}

/// Maps expander output onto alphabet indices without modulo bias.
///
/// Alphabets of up to 256 characters draw one byte per attempt; larger ones
/// draw a little-endian `u16`. Rejected draws are discarded, never reused.
struct Sampler<'a> {
    alphabet: &'a Alphabet,
    wide: bool,
    threshold: usize,
}

impl<'a> Sampler<'a> {
    fn new(alphabet: &'a Alphabet) -> Self {
        let size = alphabet.len();
        let wide = size > 256;
        let space = if wide { 65536 } else { 256 };
        Self {
            alphabet,
            wide,
            threshold: rejection_threshold(space, size),
        }
    }

    fn next_char(&self, expander: &mut Expander) -> Result<char> {
        let size = self.alphabet.len();
        loop {
            let value = if self.wide {
                expander.next_u16()? as usize
            } else {
                expander.next_byte()? as usize
            };

            if value < self.threshold {
                return Ok(self.alphabet.char_at(value % size));
            }
        }
    }

    fn candidate(&self, expander: &mut Expander, length: usize) -> Result<Zeroizing<Vec<char>>> {
        let mut chars = Zeroizing::new(Vec::with_capacity(length));
        while chars.len() < length {
            chars.push(self.next_char(expander)?);
        }
        Ok(chars)
    }
}

pub fn generate_password(seed: &Seed, settings: &Settings) -> Result<Zeroizing<String>> {
    generate_password_with_budget(seed, settings, MAX_COVERAGE_ATTEMPTS)
}

/// Derives a password, allowing at most `max_attempts` full candidates when
/// every selected category must appear.
///
/// Retries continue the same expander stream, so the result is a pure
/// function of the seed and settings.
pub fn generate_password_with_budget(
    seed: &Seed,
    settings: &Settings,
    max_attempts: usize,
) -> Result<Zeroizing<String>> {
    if max_attempts == 0 {
        return Err(Error::InvalidSettings(
            "attempt budget must allow at least one candidate".into(),
        ));
    }

    let alphabet = settings.alphabet()?;
    let required = alphabet.required();

    if settings.require_each_selected {
        let needed = alphabet.min_cover_size();
        if needed > settings.length {
            let names: Vec<_> = categories_in(required).map(|c| c.name()).collect();
            return Err(Error::InvalidSettings(format!(
                "a password of length {} cannot contain all of: {} (needs at least {})",
                settings.length,
                names.join(", "),
                needed
            )));
        }
    }

    let sampler = Sampler::new(&alphabet);
    let mut expander = Expander::new(seed)?;

    for attempt in 1..=max_attempts {
        let candidate = sampler.candidate(&mut expander, settings.length)?;

        if settings.require_each_selected {
            let covered = alphabet.covered_by(candidate.iter().copied());
            if !covered.contains(required) {
                debug!(
                    attempt,
                    missing = ?(required - covered),
                    "candidate missed a selected category"
                );
                continue;
            }
        }

        debug!(
            length = settings.length,
            alphabet_size = alphabet.len(),
            attempts = attempt,
            bytes_consumed = expander.bytes_consumed(),
            "password derived"
        );
        return Ok(Zeroizing::new(candidate.iter().collect()));
    }

    warn!(
        attempts = max_attempts,
        length = settings.length,
        "coverage retry budget exhausted"
    );
    Err(Error::CoverageUnsatisfiable {
        attempts: max_attempts,
    })
}

/// Upper bound on password entropy in bits, counting each distinct
/// character once.
pub fn entropy_bits(alphabet: &Alphabet, length: usize) -> f64 {
    length as f64 * (alphabet.distinct_len() as f64).log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::{CategorySet, LOWERCASE, NUMBERS};

    fn indexed_seed(i: u32) -> Seed {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&i.to_le_bytes());
        Seed::from_bytes(bytes)
    }

    fn standard_four() -> CategorySet {
        CategorySet::LOWERCASE | CategorySet::UPPERCASE | CategorySet::NUMBERS | CategorySet::SYMBOLS
    }

    #[test]
    fn test_regression_zero_seed_lowercase() {
        let seed = Seed::from_bytes([0u8; 32]);
        let settings = Settings::new(8, CategorySet::LOWERCASE);

        let password = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password, "ygxfpkck");
    }

    #[test]
    fn test_regression_lowercase_numbers() {
        let seed = Seed::from_bytes([42u8; 32]);
        let settings = Settings::new(16, CategorySet::LOWERCASE | CategorySet::NUMBERS);

        let password = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password, "4rlfigf5s7x2zs23");
    }

    #[test]
    fn test_regression_standard_four() {
        let seed = Seed::from_bytes([42u8; 32]);
        let settings = Settings::new(20, standard_four());

        let password = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password, "%&z:64|&'(bg9'C$+C,j");
    }

    #[test]
    fn test_regression_coverage_retry() {
        let seed = Seed::from_bytes([0u8; 32]);
        let settings = Settings::new(2, CategorySet::LOWERCASE | CategorySet::NUMBERS)
            .with_require_each_selected(true);

        let password = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password, "v9");
    }

    #[test]
    fn test_regression_coverage_retry_four_categories() {
        let seed = Seed::from_bytes([0u8; 32]);
        let settings = Settings::new(4, standard_four()).with_require_each_selected(true);

        let password = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password, "3Rg/");
    }

    #[test]
    fn test_budget_exhausted() {
        // The zero seed needs five candidates for this combination.
        let seed = Seed::from_bytes([0u8; 32]);
        let settings = Settings::new(2, CategorySet::LOWERCASE | CategorySet::NUMBERS)
            .with_require_each_selected(true);

        let result = generate_password_with_budget(&seed, &settings, 4);
        assert_eq!(
            result.unwrap_err(),
            Error::CoverageUnsatisfiable { attempts: 4 }
        );

        let password = generate_password_with_budget(&seed, &settings, 5).unwrap();
        assert_eq!(*password, "v9");
    }

    #[test]
    fn test_zero_budget_rejected() {
        let seed = Seed::from_bytes([0u8; 32]);

        for require in [false, true] {
            let settings = Settings::new(8, CategorySet::LOWERCASE | CategorySet::NUMBERS)
                .with_require_each_selected(require);
            let result = generate_password_with_budget(&seed, &settings, 0);
            assert!(
                matches!(result, Err(Error::InvalidSettings(_))),
                "require_each_selected = {}: {:?}",
                require,
                result
            );
        }

        let lowercase = Settings::new(8, CategorySet::LOWERCASE);
        let single = generate_password_with_budget(&seed, &lowercase, 1).unwrap();
        assert_eq!(*single, "ygxfpkck");
    }

    #[test]
    fn test_retry_discards_uncovered_candidate() {
        let seed = Seed::from_bytes([0u8; 32]);
        let categories = CategorySet::LOWERCASE | CategorySet::NUMBERS;

        let free = generate_password(&seed, &Settings::new(2, categories)).unwrap();
        let first = generate_password_with_budget(
            &seed,
            &Settings::new(2, categories).with_require_each_selected(true),
            5,
        )
        .unwrap();
        assert_ne!(*free, *first);
        assert_eq!(free.chars().count(), 2);
    }

    #[test]
    fn test_password_deterministic() {
        let seed = Seed::from_bytes([7u8; 32]);
        let settings = Settings::default()
            .with_custom_characters("€£")
            .with_require_each_selected(true);

        let password1 = generate_password(&seed, &settings).unwrap();
        let password2 = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password1, *password2);
    }

    #[test]
    fn test_password_length_and_charset() {
        let settings = Settings::new(64, CategorySet::STANDARD).with_custom_characters("€");
        let alphabet = settings.alphabet().unwrap();

        for i in 0..20 {
            let password = generate_password(&indexed_seed(i), &settings).unwrap();
            assert_eq!(password.chars().count(), 64);
            for ch in password.chars() {
                assert!(
                    alphabet.contains(ch),
                    "Password contains invalid character: {:?}",
                    ch
                );
            }
        }
    }

    #[test]
    fn test_maximum_length() {
        let seed = Seed::from_bytes([1u8; 32]);
        let settings = Settings::new(crate::settings::MAX_LENGTH, CategorySet::STANDARD)
            .with_require_each_selected(true);

        let password = generate_password(&seed, &settings).unwrap();
        assert_eq!(password.chars().count(), crate::settings::MAX_LENGTH);
    }

    #[test]
    fn test_length_one() {
        let settings = Settings::new(1, CategorySet::NUMBERS);
        let password = generate_password(&Seed::from_bytes([9u8; 32]), &settings).unwrap();
        assert_eq!(password.chars().count(), 1);
        assert!(NUMBERS.contains(password.as_str()));
    }

    #[test]
    fn test_length_above_maximum_rejected() {
        let settings = Settings::new(crate::settings::MAX_LENGTH + 1, CategorySet::NUMBERS);
        let result = generate_password(&Seed::from_bytes([9u8; 32]), &settings);
        assert!(matches!(result, Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn test_empty_alphabet_rejected() {
        let settings = Settings::new(12, CategorySet::empty());
        let result = generate_password(&Seed::from_bytes([9u8; 32]), &settings);
        assert!(matches!(result, Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn test_infeasible_coverage_rejected() {
        let settings = Settings::new(
            2,
            CategorySet::LOWERCASE | CategorySet::NUMBERS | CategorySet::SYMBOLS,
        )
        .with_require_each_selected(true);
        let result = generate_password(&Seed::from_bytes([9u8; 32]), &settings);
        assert!(matches!(result, Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn test_overlapping_custom_satisfies_both() {
        let settings = Settings::new(1, CategorySet::NUMBERS)
            .with_custom_characters("0123456789")
            .with_require_each_selected(true);

        let password = generate_password(&Seed::from_bytes([4u8; 32]), &settings).unwrap();
        assert_eq!(password.chars().count(), 1);
    }

    #[test]
    fn test_coverage_invariant() {
        let settings = Settings::new(2, CategorySet::LOWERCASE | CategorySet::NUMBERS)
            .with_require_each_selected(true);

        for i in 0..300 {
            let password = generate_password(&indexed_seed(i), &settings).unwrap();
            assert!(
                password.chars().any(|c| LOWERCASE.contains(c)),
                "seed {} produced {:?} without lowercase",
                i,
                &*password
            );
            assert!(
                password.chars().any(|c| NUMBERS.contains(c)),
                "seed {} produced {:?} without a digit",
                i,
                &*password
            );
        }
    }

    #[test]
    fn test_seed_sensitivity() {
        let base = [42u8; 32];
        let settings = Settings::new(20, standard_four());
        let reference = generate_password(&Seed::from_bytes(base), &settings).unwrap();

        for position in 0..32 {
            let mut flipped = base;
            flipped[position] ^= 0x01;
            let password = generate_password(&Seed::from_bytes(flipped), &settings).unwrap();
            assert_ne!(
                *password, *reference,
                "flipping byte {} did not change the password",
                position
            );
        }
    }

    #[test]
    fn test_uniform_distribution() {
        // Chi-squared, two degrees of freedom; 13.82 is the p = 0.001 cutoff.
        const CRITICAL: f64 = 13.82;
        const SEEDS: u32 = 3000;
        const LENGTH: usize = 8;

        let settings = Settings::new(LENGTH, CategorySet::empty()).with_custom_characters("abc");
        let mut per_position = [[0u32; 3]; LENGTH];
        let mut total = [0u32; 3];

        for i in 0..SEEDS {
            let password = generate_password(&indexed_seed(i), &settings).unwrap();
            for (position, ch) in password.chars().enumerate() {
                let index = (ch as u8 - b'a') as usize;
                per_position[position][index] += 1;
                total[index] += 1;
            }
        }

        let chi_squared = |observed: &[u32; 3]| {
            let n: u32 = observed.iter().sum();
            let expected = n as f64 / 3.0;
            observed
                .iter()
                .map(|&o| (o as f64 - expected).powi(2) / expected)
                .sum::<f64>()
        };

        let overall = chi_squared(&total);
        assert!(overall < CRITICAL, "overall chi-squared {} with counts {:?}", overall, total);

        for (position, counts) in per_position.iter().enumerate() {
            let stat = chi_squared(counts);
            assert!(
                stat < CRITICAL,
                "position {} chi-squared {} with counts {:?}",
                position,
                stat,
                counts
            );
        }
    }

    #[test]
    fn test_rejection_threshold() {
        assert_eq!(rejection_threshold(256, 26), 234);
        assert_eq!(rejection_threshold(256, 3), 255);
        assert_eq!(rejection_threshold(256, 256), 256);
        assert_eq!(rejection_threshold(256, 94), 188);
        assert_eq!(rejection_threshold(65536, 300), 65400);

        for size in 1..=256usize {
            let threshold = rejection_threshold(256, size);
            assert_eq!(threshold % size, 0);
            assert!(256 - threshold < size);
        }
    }

    #[test]
    fn test_wide_alphabet() {
        let custom: String = ('\u{100}'..'\u{200}').collect();
        let settings = Settings::new(40, CategorySet::STANDARD)
            .with_custom_characters(custom)
            .with_require_each_selected(true);
        let alphabet = settings.alphabet().unwrap();
        assert!(alphabet.len() > 256);

        let seed = Seed::from_bytes([11u8; 32]);
        let password1 = generate_password(&seed, &settings).unwrap();
        let password2 = generate_password(&seed, &settings).unwrap();
        assert_eq!(*password1, *password2);
        assert_eq!(password1.chars().count(), 40);
        assert!(password1.chars().all(|c| alphabet.contains(c)));
    }

    #[test]
    fn test_entropy_bits() {
        let alphabet = Settings::new(8, CategorySet::LOWERCASE | CategorySet::UPPERCASE)
            .alphabet()
            .unwrap();
        let bits = entropy_bits(&alphabet, 8);
        assert!((bits - 8.0 * 52f64.log2()).abs() < 1e-9);

        let duplicated = Settings::new(8, CategorySet::NUMBERS)
            .with_custom_characters("0123456789")
            .alphabet()
            .unwrap();
        assert!((entropy_bits(&duplicated, 4) - 4.0 * 10f64.log2()).abs() < 1e-9);
    }
}
