//! Pure field normalizers: titles for comparison, creator names, dates.
//! No I/O; the write-mode wrappers live in `quality`.

use once_cell::sync::Lazy;
use regex::Regex;

use zotkeeper_core::{Creator, DateFormat};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?$").expect("valid regex"));
static SLASH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"));
static TEXT_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]+)\.?\s+(?:(\d{1,2})(?:st|nd|rd|th)?,?\s+)?(\d{4})$")
        .expect("valid regex")
});

/// Date layouts the audit accepts without flagging.
static PLAUSIBLE_DATE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}$",
        r"^\d{4}-\d{2}$",
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{2}/\d{2}/\d{4}$",
        r"^\w+ \d{1,2}, \d{4}$",
        r"^\w+ \d{4}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Lowercase, strip punctuation, collapse whitespace. Shared by similarity
/// scoring and keyword matching.
pub fn normalize_title(title: &str) -> String {
    let lowercase = title.to_lowercase();
    let cleaned: String = lowercase
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Particles kept lowercase inside a surname ("van der Waals").
const LOWERCASE_PARTICLES: &[&str] = &["van", "von", "de", "der", "la", "le", "du"];

/// Title-case a personal name, word by word. Hyphenated segments are
/// capitalized independently; name particles stay lowercase unless leading.
pub fn title_case_name(name: &str) -> String {
    let parts: Vec<String> = name
        .split_whitespace()
        .enumerate()
        .map(|(i, part)| {
            if i > 0 && LOWERCASE_PARTICLES.contains(&part.to_lowercase().as_str()) {
                part.to_lowercase()
            } else {
                capitalize_segments(part)
            }
        })
        .collect();
    parts.join(" ")
}

fn capitalize_segments(word: &str) -> String {
    word.split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

pub fn normalize_creator(creator: &Creator) -> Creator {
    let mut normalized = creator.clone();
    if let Some(first) = &creator.first_name {
        normalized.first_name = Some(title_case_name(first));
    }
    if let Some(last) = &creator.last_name {
        normalized.last_name = Some(title_case_name(last));
    }
    normalized
}

/// True for any date layout the library commonly holds; the audit flags
/// everything else as malformed.
pub fn is_plausible_date(date: &str) -> bool {
    PLAUSIBLE_DATE_RES.iter().any(|re| re.is_match(date))
}

pub fn extract_year(date: &str) -> Option<i32> {
    YEAR_RE.find(date).and_then(|m| m.as_str().parse().ok())
}

fn month_from_name(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let months = [
        ("january", 1u32),
        ("february", 2),
        ("march", 3),
        ("april", 4),
        ("may", 5),
        ("june", 6),
        ("july", 7),
        ("august", 8),
        ("september", 9),
        ("october", 10),
        ("november", 11),
        ("december", 12),
    ];
    // Full names first so "march" beats "mar".
    for (month_name, number) in months {
        if name == month_name || (name.len() == 3 && month_name.starts_with(&name)) {
            return Some(number);
        }
    }
    None
}

/// (year, month, day) with trailing components optional.
fn parse_date_parts(date: &str) -> Option<(i32, Option<u32>, Option<u32>)> {
    let date = date.trim();

    if let Some(captures) = ISO_DATE_RE.captures(date) {
        let year = captures[1].parse().ok()?;
        let month = captures.get(2).and_then(|m| m.as_str().parse().ok());
        let day = captures.get(3).and_then(|m| m.as_str().parse().ok());
        return Some((year, month, day));
    }

    if let Some(captures) = SLASH_DATE_RE.captures(date) {
        let month = captures[1].parse().ok();
        let day = captures[2].parse().ok();
        let year = captures[3].parse().ok()?;
        return Some((year, month, day));
    }

    if let Some(captures) = TEXT_DATE_RE.captures(date)
        && let Some(month) = month_from_name(&captures[1])
    {
        let day = captures.get(2).and_then(|m| m.as_str().parse().ok());
        let year = captures[3].parse().ok()?;
        return Some((year, Some(month), day));
    }

    // Free-form fallback: pull the year, and a month name if one appears.
    let year = extract_year(date)?;
    let month = date
        .split(|c: char| !c.is_alphabetic())
        .find_map(month_from_name);
    Some((year, month, None))
}

/// Reformat a date into the target canonical layout. Returns `None` when no
/// year can be recovered. Components the input does not carry are omitted
/// rather than invented, so an already-canonical date is a fixed point.
pub fn normalize_date(date: &str, target: DateFormat) -> Option<String> {
    let (year, month, day) = parse_date_parts(date)?;

    let normalized = match (target, month, day) {
        (DateFormat::Year, _, _) => format!("{year:04}"),
        (DateFormat::YearMonth, Some(month), _) => format!("{year:04}-{month:02}"),
        (DateFormat::YearMonth, None, _) => format!("{year:04}"),
        (DateFormat::YearMonthDay, Some(month), Some(day)) => {
            format!("{year:04}-{month:02}-{day:02}")
        }
        (DateFormat::YearMonthDay, Some(month), None) => format!("{year:04}-{month:02}"),
        (DateFormat::YearMonthDay, None, _) => format!("{year:04}"),
    };
    Some(normalized)
}
