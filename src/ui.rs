use anyhow::{Context, Result};
use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use jitterpass::charset::{Alphabet, categories_in};
use jitterpass::generator::entropy_bits;
use jitterpass::seed::{MotionSample, Seed};
use jitterpass::settings::Settings;
use rpassword::read_password;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

pub const MIN_SAFE_ENTROPY: f64 = 100.0;
pub const PARANOID_ENTROPY: f64 = 256.0;

pub const MIN_SAFE_PASSWORD_LENGTH: usize = 16;

pub const MAX_SAMPLE_FILE_BYTES: u64 = 1024 * 1024;

pub enum EntropySource {
    Samples { count: usize },
    Encoded,
}

pub struct DisplayOptions {
    pub unicode_support: bool,
    pub color_support: bool,
    pub quiet: bool,
}

pub fn detect_unicode_support() -> bool {
    supports_unicode::on(supports_unicode::Stream::Stdout)
}

pub fn detect_color_support() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

pub fn get_status_symbols(unicode_support: bool) -> (&'static str, &'static str) {
    if unicode_support {
        ("✓", "!")
    } else {
        ("+", "!")
    }
}

fn tree_glyphs(unicode_support: bool) -> (&'static str, &'static str) {
    if unicode_support {
        ("├─", "└─")
    } else {
        ("|-", "`-")
    }
}

/// NFC-normalizes custom characters typed on the command line and refuses
/// control characters, which cannot be displayed or typed back.
pub fn normalize_custom_characters(s: &str) -> Result<String> {
    let normalized: String = s.nfc().collect();

    let control_positions: Vec<String> = normalized
        .chars()
        .enumerate()
        .filter(|(_, c)| c.is_control())
        .map(|(pos, _)| pos.to_string())
        .collect();

    if !control_positions.is_empty() {
        anyhow::bail!(
            "Custom characters contain {} control character(s) at position(s): {}",
            control_positions.len(),
            control_positions.join(", ")
        );
    }

    Ok(normalized)
}

pub fn prompt_entropy() -> Result<Seed> {
    print!("Entropy (base64): ");
    io::stdout().flush()?;

    let encoded = Zeroizing::new(read_password().context("Failed to read entropy")?);

    if encoded.trim().is_empty() {
        anyhow::bail!("Entropy cannot be empty");
    }

    Seed::from_base64(&encoded).context("Failed to decode entropy")
}

/// Parses one sample per line: three numbers separated by whitespace
/// and/or commas. Blank lines and `#` comments are skipped.
pub fn parse_samples(text: &str) -> Result<Vec<MotionSample>> {
    let mut samples = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        if fields.len() != 3 {
            anyhow::bail!(
                "Line {}: expected 3 values (x y t), found {}",
                line_no + 1,
                fields.len()
            );
        }

        let mut values = [0f64; 3];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field
                .parse()
                .with_context(|| format!("Line {}: invalid number {:?}", line_no + 1, field))?;
        }

        samples.push(MotionSample::new(values[0], values[1], values[2]));
    }

    Ok(samples)
}

pub fn read_samples(path: &Path) -> Result<Vec<MotionSample>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if metadata.len() > MAX_SAMPLE_FILE_BYTES {
        anyhow::bail!(
            "Sample file too large ({} bytes, maximum is {})",
            metadata.len(),
            MAX_SAMPLE_FILE_BYTES
        );
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_samples(&text)
}

pub fn show_progress<F, T>(unicode_support: bool, f: F) -> Result<(T, Duration)>
where
    F: FnOnce() -> Result<T>,
{
    let term = Term::stdout();
    term.hide_cursor().ok();

    let pb = ProgressBar::new_spinner();

    if unicode_support {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("-\\|/-"),
        );
    }

    pb.set_message("Deriving password...");
    pb.enable_steady_tick(Duration::from_millis(80));

    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();

    pb.finish_and_clear();
    term.show_cursor().ok();

    result.map(|r| (r, elapsed))
}

fn status_style(secure: bool, options: &DisplayOptions) -> Style {
    if !options.color_support {
        Style::new()
    } else if secure {
        Style::new().green()
    } else {
        Style::new().yellow()
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

pub fn display_output(
    output: &Zeroizing<String>,
    settings: &Settings,
    alphabet: &Alphabet,
    source: &EntropySource,
    elapsed: Duration,
    options: &DisplayOptions,
) {
    if options.quiet {
        println!("{}", &**output);
        return;
    }

    println!("Out:\n{}\n", &**output);

    display_settings(settings, alphabet, source, options);
    display_stats(entropy_bits(alphabet, settings.length), settings, elapsed, options);
}

fn display_settings(
    settings: &Settings,
    alphabet: &Alphabet,
    source: &EntropySource,
    options: &DisplayOptions,
) {
    let (branch, last) = tree_glyphs(options.unicode_support);

    println!("Settings:");

    match source {
        EntropySource::Samples { count } => println!(
            "  {} Source     {} motion {} (SHA-256)",
            branch,
            count,
            plural(*count, "sample", "samples")
        ),
        EntropySource::Encoded => println!("  {} Source     256-bit seed (base64)", branch),
    }

    let names: Vec<&str> = categories_in(alphabet.required())
        .map(|category| category.name())
        .collect();
    println!("  {} Categories {}", branch, names.join(", "));

    if !settings.custom_characters.is_empty() {
        let count = settings.custom_characters.chars().count();
        println!(
            "  {} Custom     {} {}",
            branch,
            count,
            plural(count, "char", "chars")
        );
    }

    println!("  {} Expander   HMAC-SHA256 (counter mode)", branch);
    println!("  {} Sampling   Unbiased rejection", branch);
    println!(
        "  {} Coverage   {}",
        last,
        if settings.require_each_selected {
            "Every selected category"
        } else {
            "Not enforced"
        }
    );

    println!();
}

fn display_stats(entropy: f64, settings: &Settings, elapsed: Duration, options: &DisplayOptions) {
    let (check_ok, check_warn) = get_status_symbols(options.unicode_support);
    let (branch, last) = tree_glyphs(options.unicode_support);

    let (status_icon, entropy_style, status_text) = if entropy >= PARANOID_ENTROPY {
        (check_ok, status_style(true, options), "Paranoid")
    } else if entropy >= MIN_SAFE_ENTROPY {
        (check_ok, status_style(true, options), "Strong")
    } else {
        (check_warn, status_style(false, options), "Weak")
    };

    let length_secure = settings.length >= MIN_SAFE_PASSWORD_LENGTH;
    let length_style = status_style(length_secure, options);
    let length_status = if length_secure { check_ok } else { check_warn };

    println!("Stats:");

    println!(
        "  {} Entropy    {} {} bits ({})",
        branch,
        entropy_style.apply_to(format!("[{}]", status_icon)),
        entropy_style.apply_to(format!("{:.1}", entropy)),
        entropy_style.apply_to(status_text)
    );

    println!(
        "  {} Length     {} {} {}",
        branch,
        length_style.apply_to(format!("[{}]", length_status)),
        length_style.apply_to(settings.length),
        plural(settings.length, "char", "chars")
    );

    println!("  {} Time       {:.3}s", last, elapsed.as_secs_f64());

    println!(
        "\n{} Security: {}",
        entropy_style.apply_to(format!("[{}]", status_icon)),
        entropy_style.apply_to(status_text)
    );
}
