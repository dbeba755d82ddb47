use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::backend::common::constants::UNSUPPORTED_IME_LIST_BANNER;
use crate::backend::common::dtos::{Device, InputMethodEntry, RemotePathEntry};
use crate::paths::{join_remote_path, normalize_remote_directory_path};

fn trimmed_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Parses `adb devices -l`. The first non-empty line is the header.
pub(crate) fn parse_device_list(output: &str) -> Vec<Device> {
    let mut devices = trimmed_lines(output)
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?;
            let state = fields.next()?;
            let attributes = fields
                .filter_map(|token| token.split_once(':'))
                .filter(|(key, value)| !key.is_empty() && !value.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<HashMap<_, _>>();

            Some(Device {
                serial: serial.to_string(),
                state: state.to_string(),
                attributes,
            })
        })
        .collect::<Vec<_>>();

    devices.sort_by(|left, right| left.serial.cmp(&right.serial));
    devices.dedup_by(|later, kept| later.serial == kept.serial);
    devices
}

/// Collects `package/.Class` ids from `ime list` style output in first-seen
/// order.
pub(crate) fn parse_input_method_ids(output: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for line in trimmed_lines(output) {
        let candidate = if let Some((_, after)) = line.split_once("mId=") {
            after.split_whitespace().next()
        } else if line.contains('/') {
            line.split_whitespace().next()
        } else {
            None
        };

        let Some(id) = candidate.map(str::trim).filter(|value| value.contains('/')) else {
            continue;
        };

        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }

    ids
}

pub(crate) fn parse_current_input_method(dumpsys_output: &str) -> String {
    for line in dumpsys_output.lines().map(str::trim) {
        for marker in ["mCurMethodId=", "mCurrentInputMethod="] {
            if let Some((_, value)) = line.split_once(marker) {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }

    String::new()
}

/// True when `ime list` answered with its usage text instead of a listing.
/// The banner wording belongs to one generation of the device tool, so this
/// check is best-effort.
pub(crate) fn is_unsupported_ime_list_banner(output: &str) -> bool {
    output.contains(UNSUPPORTED_IME_LIST_BANNER)
}

/// Alternate query forms for input-method ids, tried in order.
pub(crate) fn input_method_query_candidates(all: bool) -> Vec<Vec<String>> {
    let forms: &[&[&str]] = if all {
        &[
            &["shell", "ime", "list", "-a", "-s"],
            &["shell", "ime", "list", "-s", "-a"],
            &["shell", "cmd", "input_method", "list", "-a", "-s"],
            &["shell", "cmd", "input_method", "list", "-s", "-a"],
            &["shell", "ime", "list", "-a"],
        ]
    } else {
        &[
            &["shell", "ime", "list", "-s"],
            &["shell", "cmd", "input_method", "list", "-s"],
            &["shell", "ime", "list"],
        ]
    };

    forms
        .iter()
        .map(|form| form.iter().map(|arg| arg.to_string()).collect())
        .collect()
}

/// Merges all, enabled and current ids into one ordered, deduplicated view.
pub(crate) fn merge_input_method_entries(
    all_ids: &[String],
    enabled_ids: &[String],
    current_id: &str,
) -> Vec<InputMethodEntry> {
    let enabled = enabled_ids
        .iter()
        .map(|id| id.trim())
        .collect::<HashSet<_>>();
    let current_id = current_id.trim();

    let mut seen = HashSet::new();
    all_ids
        .iter()
        .map(String::as_str)
        .chain(enabled_ids.iter().map(String::as_str))
        .chain(std::iter::once(current_id))
        .map(str::trim)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(|id| InputMethodEntry {
            id: id.to_string(),
            is_enabled: enabled.contains(id),
            is_current: id == current_id,
        })
        .collect()
}

/// Parses `ls -1 -p <dir>`: a trailing `/` marks a directory.
pub(crate) fn parse_remote_listing(output: &str, base_directory: &str) -> Vec<RemotePathEntry> {
    let directory = normalize_remote_directory_path(base_directory);
    let mut entries = trimmed_lines(output)
        .filter(|raw| *raw != "." && *raw != "..")
        .filter_map(|raw| {
            let is_directory = raw.ends_with('/');
            let name = raw.trim_end_matches('/');
            if name.is_empty() {
                return None;
            }

            Some(RemotePathEntry {
                name: name.to_string(),
                full_path: join_remote_path(&directory, name, is_directory),
                is_directory,
            })
        })
        .collect::<Vec<_>>();

    entries.sort_by(|left, right| {
        right
            .is_directory
            .cmp(&left.is_directory)
            .then_with(|| natural_name_cmp(&left.name, &right.name))
    });
    entries
}

pub(crate) fn parse_package_list(output: &str) -> Vec<String> {
    let mut packages = trimmed_lines(output)
        .filter_map(|line| line.strip_prefix("package:"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    packages.sort();
    packages
}

pub(crate) fn parse_rule_lines(output: &str) -> Vec<String> {
    trimmed_lines(output).map(str::to_string).collect()
}

pub(crate) fn filter_packages(packages: &[String], keyword: &str) -> Vec<String> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return packages.to_vec();
    }

    packages
        .iter()
        .filter(|name| name.to_lowercase().contains(&keyword))
        .cloned()
        .collect()
}

pub(crate) fn cleaned_output(output: &str) -> String {
    output.trim().to_string()
}

/// Finder-style ordering: case-insensitive, with digit runs compared by value.
pub(crate) fn natural_name_cmp(left: &str, right: &str) -> Ordering {
    let mut left_chars = left.chars().peekable();
    let mut right_chars = right.chars().peekable();

    loop {
        match (left_chars.peek().copied(), right_chars.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let left_run = take_digit_run(&mut left_chars);
                let right_run = take_digit_run(&mut right_chars);
                let left_trimmed = left_run.trim_start_matches('0');
                let right_trimmed = right_run.trim_start_matches('0');
                let ordering = left_trimmed
                    .len()
                    .cmp(&right_trimmed.len())
                    .then_with(|| left_trimmed.cmp(right_trimmed));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = l.to_lowercase().cmp(r.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left_chars.next();
                right_chars.next();
            }
        }
    }

    left.cmp(right)
}

fn take_digit_run(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(ch) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(ch);
        chars.next();
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_list_with_attributes() {
        let devices = parse_device_list(
            "List of devices attached\nABC123 device model:Pixel_6 transport_id:2\n",
        );
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "ABC123");
        assert_eq!(devices[0].state, "device");
        assert_eq!(devices[0].attributes.get("model").map(String::as_str), Some("Pixel_6"));
        assert_eq!(devices[0].attributes.get("transport_id").map(String::as_str), Some("2"));
        assert_eq!(devices[0].attributes.len(), 2);
    }

    #[test]
    fn sorts_devices_and_skips_malformed_lines() {
        let output = "List of devices attached\n\
                      zeta device usb:1-1 odd-token\n\
                      lonely\n\
                      \n\
                      192.168.1.5:5555 offline host:a:b\n";
        let devices = parse_device_list(output);
        let serials = devices.iter().map(|d| d.serial.as_str()).collect::<Vec<_>>();
        assert_eq!(serials, vec!["192.168.1.5:5555", "zeta"]);
        assert_eq!(devices[0].attributes.get("host").map(String::as_str), Some("a:b"));
        assert_eq!(devices[1].attributes.len(), 1);
    }

    #[test]
    fn repeated_serial_keeps_first_line() {
        let output = "List of devices attached\n\
                      B device model:first\n\
                      A device\n\
                      B offline model:second\n";
        let devices = parse_device_list(output);
        let serials = devices.iter().map(|d| d.serial.as_str()).collect::<Vec<_>>();
        assert_eq!(serials, vec!["A", "B"]);
        assert_eq!(devices[1].state, "device");
        assert_eq!(devices[1].attributes.get("model").map(String::as_str), Some("first"));
    }

    #[test]
    fn header_only_yields_no_devices() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn dedupes_input_method_ids_in_first_seen_order() {
        let output = "mId=com.b/.B mSettingsActivityName=x\n\
                      mId=com.a/.A\n\
                      mId=com.b/.B\n\
                      com.c/.C\n\
                      no slash here\n";
        assert_eq!(
            parse_input_method_ids(output),
            vec!["com.b/.B", "com.a/.A", "com.c/.C"]
        );
    }

    #[test]
    fn reads_current_input_method_by_marker_priority() {
        let output = "  mCurrentInputMethod=com.x/.X\n  mCurMethodId=com.y/.Y\n";
        assert_eq!(parse_current_input_method(output), "com.x/.X");
        assert_eq!(parse_current_input_method("mCurMethodId= com.y/.Y "), "com.y/.Y");
        assert_eq!(parse_current_input_method("nothing"), "");
    }

    #[test]
    fn detects_unsupported_ime_banner() {
        assert!(is_unsupported_ime_list_banner("usage:\nime <command>:\n  list"));
        assert!(!is_unsupported_ime_list_banner("com.a/.A"));
    }

    #[test]
    fn merges_input_method_sources() {
        let entries = merge_input_method_entries(
            &["com.a/.A".to_string(), "com.b/.B".to_string()],
            &["com.b/.B".to_string(), "com.c/.C".to_string()],
            "com.d/.D",
        );
        let ids = entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["com.a/.A", "com.b/.B", "com.c/.C", "com.d/.D"]);
        assert!(!entries[0].is_enabled);
        assert!(entries[1].is_enabled);
        assert!(entries[3].is_current && !entries[3].is_enabled);
        assert_eq!(entries[3].state_label(), "current");
    }

    #[test]
    fn parses_remote_listing_directories_first() {
        let output = "file10.txt\n.\n..\nDCIM/\nfile2.txt\nalarms/\n\n";
        let entries = parse_remote_listing(output, "sdcard");
        let names = entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["alarms", "DCIM", "file2.txt", "file10.txt"]);
        assert_eq!(entries[1].full_path, "/sdcard/DCIM/");
        assert_eq!(entries[2].full_path, "/sdcard/file2.txt");
        assert_eq!(entries[1].display_name(), "DCIM/");
    }

    #[test]
    fn parses_remote_listing_at_root() {
        let entries = parse_remote_listing("sdcard/\n", "/");
        assert_eq!(entries[0].full_path, "/sdcard/");
    }

    #[test]
    fn parses_packages_and_rules() {
        assert_eq!(
            parse_package_list("package:com.z\npackage:com.a\njunk\n"),
            vec!["com.a", "com.z"]
        );
        assert_eq!(
            parse_rule_lines("  X tcp:1 tcp:2 \n\n"),
            vec!["X tcp:1 tcp:2"]
        );
    }

    #[test]
    fn filters_packages_case_insensitively() {
        let packages = vec!["com.Google.maps".to_string(), "org.fdroid".to_string()];
        assert_eq!(filter_packages(&packages, " google "), vec!["com.Google.maps"]);
        assert_eq!(filter_packages(&packages, ""), packages);
    }

    #[test]
    fn natural_order_compares_numbers_by_value() {
        assert_eq!(natural_name_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_name_cmp("Apple", "banana"), Ordering::Less);
        assert_eq!(natural_name_cmp("b", "B"), Ordering::Greater);
        assert_eq!(natural_name_cmp("a", "a1"), Ordering::Less);
    }

    #[test]
    fn candidate_lists_start_with_preferred_form() {
        assert_eq!(input_method_query_candidates(true)[0], vec!["shell", "ime", "list", "-a", "-s"]);
        assert_eq!(input_method_query_candidates(false).len(), 3);
    }
}
