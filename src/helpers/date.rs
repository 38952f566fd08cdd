//! Date helper functions

use chrono::{DateTime, Datelike, TimeZone};
use chrono_tz::Tz;

/// Languages with their own month and weekday names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLocale {
    English,
    Portuguese,
}

impl DateLocale {
    /// Pick the locale for a site language tag such as `pt-BR` or `en`
    pub fn from_language(language: &str) -> Self {
        if language.to_ascii_lowercase().starts_with("pt") {
            Self::Portuguese
        } else {
            Self::English
        }
    }

    fn month(self, month0: usize, abbreviated: bool) -> &'static str {
        const EN: [&str; 12] = [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        const EN_SHORT: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        const PT: [&str; 12] = [
            "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto",
            "setembro", "outubro", "novembro", "dezembro",
        ];
        const PT_SHORT: [&str; 12] = [
            "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
        ];

        let table = match (self, abbreviated) {
            (Self::English, false) => &EN,
            (Self::English, true) => &EN_SHORT,
            (Self::Portuguese, false) => &PT,
            (Self::Portuguese, true) => &PT_SHORT,
        };
        table[month0 % 12]
    }

    fn weekday(self, from_sunday: usize, abbreviated: bool) -> &'static str {
        const EN: [&str; 7] = [
            "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
        ];
        const EN_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        const PT: [&str; 7] = [
            "domingo", "segunda-feira", "terça-feira", "quarta-feira", "quinta-feira",
            "sexta-feira", "sábado",
        ];
        const PT_SHORT: [&str; 7] = ["dom", "seg", "ter", "qua", "qui", "sex", "sáb"];

        let table = match (self, abbreviated) {
            (Self::English, false) => &EN,
            (Self::English, true) => &EN_SHORT,
            (Self::Portuguese, false) => &PT,
            (Self::Portuguese, true) => &PT_SHORT,
        };
        table[from_sunday % 7]
    }
}

/// Format a date using a Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", DateLocale::Portuguese) // -> "15 mar 2021"
/// ```
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str, locale: DateLocale) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format, |token| match token {
        "MMMM" => Some(locale.month(date.month0() as usize, false)),
        "MMM" => Some(locale.month(date.month0() as usize, true)),
        "dddd" => Some(locale.weekday(date.weekday().num_days_from_sunday() as usize, false)),
        "ddd" => Some(locale.weekday(date.weekday().num_days_from_sunday() as usize, true)),
        _ => None,
    });
    date.format(&chrono_format).to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Timezone used to display dates; empty or unknown names fall back to UTC
pub fn display_timezone(name: &str) -> Tz {
    if name.is_empty() {
        return Tz::UTC;
    }
    name.parse::<Tz>().unwrap_or_else(|e| {
        tracing::warn!("Unknown timezone {:?} ({}), using UTC", name, e);
        Tz::UTC
    })
}

/// Convert Moment.js format to chrono format.
///
/// `names` may replace a token with literal text (localized month and
/// weekday names); other tokens map to chrono specifiers.
fn moment_to_chrono_format<'a>(
    format: &str,
    names: impl Fn(&str) -> Option<&'a str>,
) -> String {
    // Longest tokens first within each letter
    const TOKENS: [(&str, &str); 17] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSS", "%3f"),
        ("ZZ", "%z"),
        ("A", "%p"),
    ];

    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                match names(token) {
                    Some(name) => result.push_str(&name.replace('%', "%%")),
                    None => result.push_str(spec),
                }
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                result.push_str("%%");
            } else {
                result.push(c);
            }
        }
        rest = chars.as_str();
    }

    result
}
