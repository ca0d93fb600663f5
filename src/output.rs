//! Rendering records as delimited text.

use crate::base::{BaseInfo, Field};

use std::path::Path;

/// Decode backslash escapes typed on the command line, so `\t` becomes a tab.
///
/// Supports the single-character escapes, octal `\ooo` (up to three digits)
/// and hex `\xHH`, `\uHHHH`, `\UHHHHHHHH`. Unknown or malformed escapes are
/// kept as typed.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };
        let simple = match next {
            't' => Some('\t'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            'a' => Some('\u{07}'),
            'b' => Some('\u{08}'),
            'f' => Some('\u{0c}'),
            'v' => Some('\u{0b}'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            _ => None,
        };
        if let Some(decoded) = simple {
            chars.next();
            out.push(decoded);
            continue;
        }

        if next.is_digit(8) {
            let octal: String = chars.clone().take(3).take_while(|c| c.is_digit(8)).collect();
            // at most 0o777, always a valid scalar value
            if let Some(decoded) = u32::from_str_radix(&octal, 8).ok().and_then(char::from_u32) {
                for _ in 0..octal.len() {
                    chars.next();
                }
                out.push(decoded);
                continue;
            }
        }

        let digits = match next {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => 0,
        };
        let hex: String = chars.clone().skip(1).take(digits).collect();
        let decoded = (digits > 0
            && hex.len() == digits
            && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| u32::from_str_radix(&hex, 16).ok())
        .flatten()
        .and_then(char::from_u32);
        match decoded {
            Some(decoded) => {
                for _ in 0..=digits {
                    chars.next();
                }
                out.push(decoded);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Wrap `text` in `quote` when it contains `delimiter`, doubling embedded quotes.
///
/// An empty `quote` disables quoting.
pub fn quote_delimited(text: &str, delimiter: &str, quote: &str) -> String {
    if quote.is_empty() || !text.contains(delimiter) {
        return text.to_string();
    }
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", text.replace(quote, &doubled))
}

/// Human readable size, decimal units.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1000;
    const MB: u64 = KB * 1000;
    const GB: u64 = MB * 1000;

    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        _ => format!("{} B", bytes),
    }
}

/// Formatting options for [`Table`].
#[derive(Debug, Clone)]
pub struct Table {
    pub fields: Vec<Field>,
    pub delimiter: String,
    pub quote: String,
    pub human_readable: bool,
}

impl Table {
    pub fn header(&self) -> String {
        self.fields
            .iter()
            .map(Field::as_str)
            .collect::<Vec<_>>()
            .join(&self.delimiter)
    }

    pub fn row(&self, base: &BaseInfo) -> String {
        self.fields
            .iter()
            .map(|&field| quote_delimited(&self.value(base, field), &self.delimiter, &self.quote))
            .collect::<Vec<_>>()
            .join(&self.delimiter)
    }

    fn value(&self, base: &BaseInfo, field: Field) -> String {
        let path = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_default();
        let size = |s: u64| {
            if self.human_readable {
                format_size(s)
            } else {
                s.to_string()
            }
        };

        match field {
            Field::Id => base.id().to_string(),
            Field::Name => base.name().to_string(),
            Field::Connect => base.connect().to_string(),
            Field::Folder => base.folder().to_string(),
            Field::Common => base.common().to_string(),
            Field::RoamingPath => path(base.roaming_path()),
            Field::RoamingSize => size(base.roaming_size()),
            Field::LocalPath => path(base.local_path()),
            Field::LocalSize => size(base.local_size()),
            Field::Size => size(base.size()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDir;
    use crate::registry::Registration;
    use std::path::PathBuf;

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape(r"\t"), "\t");
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"\\"), "\\");
        assert_eq!(unescape(r"\x2c"), ",");
        assert_eq!(unescape(r"\u00a7"), "§");
        assert_eq!(unescape(";"), ";");
    }

    #[test]
    fn unescape_octal_and_control_letters() {
        assert_eq!(unescape(r"\012"), "\n");
        assert_eq!(unescape(r"\0"), "\0");
        assert_eq!(unescape(r"\1x"), "\u{01}x");
        assert_eq!(unescape(r"\0123"), "\n3");
        assert_eq!(unescape(r"\a\b\f\v"), "\u{07}\u{08}\u{0c}\u{0b}");
    }

    #[test]
    fn unescape_keeps_unknown_escapes() {
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape(r"\x4"), r"\x4");
        assert_eq!(unescape(r"\xzz"), r"\xzz");
        assert_eq!(unescape(r"\x+1"), r"\x+1");
        assert_eq!(unescape(r"\u+041"), r"\u+041");
        assert_eq!(unescape(r"\8"), r"\8");
        assert_eq!(unescape("end\\"), "end\\");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_delimited("a;b", ";", "\""), "\"a;b\"");
        assert_eq!(quote_delimited("a\"b;", ";", "\""), "\"a\"\"b;\"");
        assert_eq!(quote_delimited("a\"b", ";", "\""), "a\"b");
        assert_eq!(quote_delimited("plain", ";", "\""), "plain");
        assert_eq!(quote_delimited("a;b", ";", ""), "a;b");
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1_500), "1.5 KB");
        assert_eq!(format_size(12_340_000), "12.3 MB");
        assert_eq!(format_size(2_000_000_000), "2.0 GB");
    }

    #[test]
    fn table_rows() {
        let registration = Registration {
            name: "Acc;2024".into(),
            connect: "File=\"C:\\acc\";".into(),
            ..Default::default()
        };
        let roaming = CacheDir {
            path: PathBuf::from("/r/x"),
            size: 2_500,
        };
        let base = BaseInfo::new("x", Some(&registration), Some(&roaming), None);
        let table = Table {
            fields: vec![Field::Id, Field::Name, Field::Connect, Field::LocalPath, Field::Common, Field::Size],
            delimiter: ";".into(),
            quote: "\"".into(),
            human_readable: false,
        };

        assert_eq!(table.header(), "id;name;connect;local_path;common;size");
        assert_eq!(
            table.row(&base),
            "x;\"Acc;2024\";\"File=\"\"C:\\acc\"\";\";;false;2500"
        );

        let human = Table {
            fields: vec![Field::RoamingPath, Field::RoamingSize],
            delimiter: "\t".into(),
            human_readable: true,
            ..table
        };
        assert_eq!(human.row(&base), "/r/x\t2.5 KB");
    }
}
