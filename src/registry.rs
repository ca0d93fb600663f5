//! # Infobase registration lists
//!
//! The 1C launcher stores registered infobases in `ibases.v8i`, an INI-like
//! file of `[Name]` sections followed by `Key=Value` lines. Shared lists are
//! referenced from `1CEStart.cfg` through `CommonInfoBases=` lines; that file
//! is written in UTF-16LE.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\[(.*)\]\s*$").unwrap());
static VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)=(.*)").unwrap());

const COMMON_INFO_BASES: &str = "CommonInfoBases=";

/// Metadata of one registered infobase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registration {
    /// Section title, shown to the user as the infobase name.
    pub name: String,
    /// Whether the entry came from a shared list.
    pub common: bool,
    pub connect: String,
    pub folder: String,
}

/// Registered infobases keyed by their `ID`.
pub type Registrations = HashMap<String, Registration>;

/// Section being accumulated by [`parse_registrations`].
struct Section {
    registration: Registration,
    id: Option<String>,
    has_connect: bool,
}

impl Section {
    fn new(name: &str, common: bool) -> Self {
        Self {
            registration: Registration {
                name: name.to_string(),
                common,
                ..Default::default()
            },
            id: None,
            has_connect: false,
        }
    }

    fn flush(self, into: &mut Registrations) {
        match self.id {
            Some(id) => {
                into.insert(id, self.registration);
            }
            None => tracing::debug!(name = %self.registration.name, "skipping section without ID"),
        }
    }
}

/// Parse a registration list from any buffered reader.
///
/// An `ID` only counts once the section has declared a `Connect` string;
/// sections that never get an `ID` are dropped.
pub fn parse_registrations<R: BufRead>(reader: R, common: bool) -> Result<Registrations> {
    let mut result = Registrations::new();
    let mut current: Option<Section> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_start_matches('\u{feff}');

        if let Some(caps) = SECTION.captures(line) {
            if let Some(section) = current.take() {
                section.flush(&mut result);
            }
            current = Some(Section::new(&caps[1], common));
            continue;
        }

        // Nothing is known about lines before the first header
        let Some(section) = current.as_mut() else {
            continue;
        };
        let Some(caps) = VALUE.captures(line) else {
            continue;
        };
        let value = caps[2].to_string();
        match &caps[1] {
            "ID" if section.has_connect => section.id = Some(value),
            "Folder" => section.registration.folder = value,
            "Connect" => {
                section.registration.connect = value;
                section.has_connect = true;
            }
            _ => {}
        }
    }

    if let Some(section) = current {
        section.flush(&mut result);
    }

    Ok(result)
}

/// Read a registration list file.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid UTF-8.
pub fn read_registrations(path: &Path, common: bool) -> Result<Registrations> {
    let file = File::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_registrations(BufReader::new(file), common)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Decode UTF-16LE text, dropping a leading byte order mark.
fn decode_utf16le(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>()
        .trim_start_matches('\u{feff}')
        .to_string()
}

/// Extract every shared list referenced by a `1CEStart.cfg` body.
pub fn common_lists(cfg: &str) -> Vec<PathBuf> {
    cfg.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(COMMON_INFO_BASES))
        .filter_map(|line| line.split('=').nth(1))
        .map(PathBuf::from)
        .collect()
}

/// Fold shared registrations into the user's own list.
///
/// Ids the user already registered keep their own metadata and are only
/// marked as common.
pub fn merge_common(primary: &mut Registrations, common: Registrations) {
    for (id, registration) in common {
        primary
            .entry(id)
            .and_modify(|existing| existing.common = true)
            .or_insert(registration);
    }
}

/// Load the user's registration list plus any shared lists it is configured with.
///
/// # Errors
/// A missing `registry_file` is an error. A missing `start_cfg`, or a shared
/// list it points at that does not exist, contributes nothing.
pub fn load_all(registry_file: &Path, start_cfg: &Path) -> Result<Registrations> {
    let mut registrations = read_registrations(registry_file, false)?;
    tracing::debug!(
        path = %registry_file.display(),
        count = registrations.len(),
        "read registration list"
    );

    if !start_cfg.is_file() {
        tracing::debug!(path = %start_cfg.display(), "no launcher config");
        return Ok(registrations);
    }

    let bytes = fs::read(start_cfg).with_context(|| format!("Failed to read {}", start_cfg.display()))?;
    for list in common_lists(&decode_utf16le(&bytes)) {
        if !list.is_file() {
            tracing::warn!(path = %list.display(), "shared registration list not found");
            continue;
        }
        let common = read_registrations(&list, true)?;
        tracing::debug!(path = %list.display(), count = common.len(), "read shared registration list");
        merge_common(&mut registrations, common);
    }

    Ok(registrations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IBASES: &str = "\u{feff}[Accounting]
Connect=File=\"C:\\Bases\\Acc\";
ID=11111111-1111-1111-1111-111111111111
OrderInList=0
Folder=/Work
[Just a folder]
ID=22222222-2222-2222-2222-222222222222
Folder=/
[Payroll]
Connect=Srvr=\"srv\";Ref=\"zup\";
ID=33333333-3333-3333-3333-333333333333
";

    fn encode_utf16le(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xff, 0xfe];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn parses_sections_and_flushes_last() {
        let bases = parse_registrations(IBASES.as_bytes(), false).unwrap();

        assert_eq!(bases.len(), 2);
        let acc = &bases["11111111-1111-1111-1111-111111111111"];
        assert_eq!(acc.name, "Accounting");
        assert_eq!(acc.connect, "File=\"C:\\Bases\\Acc\";");
        assert_eq!(acc.folder, "/Work");
        assert!(!acc.common);

        let payroll = &bases["33333333-3333-3333-3333-333333333333"];
        assert_eq!(payroll.name, "Payroll");
        assert_eq!(payroll.connect, "Srvr=\"srv\";Ref=\"zup\";");
    }

    #[test]
    fn sections_without_connect_are_dropped() {
        let bases = parse_registrations(IBASES.as_bytes(), false).unwrap();
        assert!(!bases.contains_key("22222222-2222-2222-2222-222222222222"));
    }

    #[test]
    fn id_before_connect_is_ignored() {
        let text = "[Base]\nID=44444444-4444-4444-4444-444444444444\nConnect=File=\"x\";\n";
        assert!(parse_registrations(text.as_bytes(), false).unwrap().is_empty());
    }

    #[test]
    fn brackets_inside_values_do_not_open_sections() {
        let text = "[Cluster]\nConnect=Srvr=\"[x]\";Ref=\"db\";\nID=66666666-6666-6666-6666-666666666666\nFolder=/[archive]\n";
        let bases = parse_registrations(text.as_bytes(), false).unwrap();

        assert_eq!(bases.len(), 1);
        let cluster = &bases["66666666-6666-6666-6666-666666666666"];
        assert_eq!(cluster.name, "Cluster");
        assert_eq!(cluster.connect, "Srvr=\"[x]\";Ref=\"db\";");
        assert_eq!(cluster.folder, "/[archive]");
    }

    #[test]
    fn indented_header_opens_a_section() {
        let text = "  [Spaced] \nConnect=File=\"x\";\nID=abc\n";
        let bases = parse_registrations(text.as_bytes(), false).unwrap();
        assert_eq!(bases["abc"].name, "Spaced");
    }

    #[test]
    fn crlf_lines() {
        let text = "[Base]\r\nConnect=File=\"x\";\r\nID=abc\r\n";
        let bases = parse_registrations(text.as_bytes(), true).unwrap();
        assert_eq!(bases["abc"].connect, "File=\"x\";");
        assert!(bases["abc"].common);
    }

    #[test]
    fn finds_common_lists() {
        let cfg = "\u{feff}AppAutoInstallLastVersion=1\r\nCommonInfoBases=\\\\srv\\share\\list.v8i\r\n  CommonInfoBases=/etc/1c/list.v8i \r\n";
        assert_eq!(
            common_lists(cfg),
            vec![
                PathBuf::from("\\\\srv\\share\\list.v8i"),
                PathBuf::from("/etc/1c/list.v8i")
            ]
        );
    }

    #[test]
    fn decodes_utf16le_with_bom() {
        let bytes = encode_utf16le("CommonInfoBases=/a/b.v8i\r\n");
        assert_eq!(decode_utf16le(&bytes), "CommonInfoBases=/a/b.v8i\r\n");
    }

    #[test]
    fn common_entries_only_flip_flag_when_already_registered() {
        let mut primary = parse_registrations(IBASES.as_bytes(), false).unwrap();
        let common = parse_registrations(
            "[Shared name]\nConnect=Srvr=\"other\";\nID=11111111-1111-1111-1111-111111111111\n[Shared only]\nConnect=File=\"s\";\nID=55555555-5555-5555-5555-555555555555\n"
                .as_bytes(),
            true,
        )
        .unwrap();

        merge_common(&mut primary, common);

        let acc = &primary["11111111-1111-1111-1111-111111111111"];
        assert!(acc.common);
        assert_eq!(acc.name, "Accounting");
        assert_eq!(acc.connect, "File=\"C:\\Bases\\Acc\";");

        let shared = &primary["55555555-5555-5555-5555-555555555555"];
        assert!(shared.common);
        assert_eq!(shared.name, "Shared only");
    }

    #[test]
    fn empty_common_list_changes_nothing() {
        let mut primary = parse_registrations(IBASES.as_bytes(), false).unwrap();
        let before = primary.clone();
        merge_common(&mut primary, Registrations::new());
        assert_eq!(primary, before);
    }

    #[test]
    fn load_all_reads_shared_lists() {
        let dir = tempfile::tempdir().unwrap();
        let ibases = dir.path().join("ibases.v8i");
        let shared = dir.path().join("shared.v8i");
        let cfg = dir.path().join("1CEStart.cfg");
        fs::write(&ibases, IBASES).unwrap();
        fs::write(
            &shared,
            "[Shared]\nConnect=File=\"s\";\nID=55555555-5555-5555-5555-555555555555\n",
        )
        .unwrap();
        fs::write(
            &cfg,
            encode_utf16le(&format!(
                "CommonInfoBases={}\r\nCommonInfoBases={}\r\n",
                shared.display(),
                dir.path().join("missing.v8i").display()
            )),
        )
        .unwrap();

        let bases = load_all(&ibases, &cfg).unwrap();
        assert_eq!(bases.len(), 3);
        assert!(bases["55555555-5555-5555-5555-555555555555"].common);
    }

    #[test]
    fn missing_launcher_config_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ibases = dir.path().join("ibases.v8i");
        fs::write(&ibases, IBASES).unwrap();

        let bases = load_all(&ibases, &dir.path().join("1CEStart.cfg")).unwrap();
        assert_eq!(bases.len(), 2);
    }

    #[test]
    fn missing_registration_list_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_all(&dir.path().join("ibases.v8i"), &dir.path().join("1CEStart.cfg"))
            .unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
