//! Builds the trusted platform assembly (TPA) list: every assembly next to
//! the host is handed to the runtime as trusted code.

use std::fs;
use std::path::Path;

use crate::platform::PATH_LIST_DELIMITER;

/// Joins the full path of every file in `directory` whose name ends with
/// `extension` (dot included, matched verbatim) into a single delimited
/// string, in whatever order the filesystem yields entries.
///
/// An unreadable or missing directory produces an empty list, same as a
/// directory with no matches; whether an empty list is acceptable is the
/// runtime's call, not ours. Duplicate entries are tolerated, the runtime
/// picks whichever it sees first.
pub fn build_tpa_list(directory: &Path, extension: &str) -> String {
    let mut list = String::new();
    let Ok(entries) = fs::read_dir(directory) else {
        return list;
    };
    for entry in entries.filter_map(|entry| entry.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        // The strict length check also excludes a file named exactly like
        // the extension.
        if name.len() > extension.len() && name.ends_with(extension) {
            list.push_str(&directory.join(name).to_string_lossy());
            list.push(PATH_LIST_DELIMITER);
        }
    }
    list
}
