//! Classification of archive entry names.

const CLASS_SUFFIX: &str = ".class";
const ARCHIVE_SUFFIXES: [&str; 2] = [".jar", ".war"];

/// What an entry name means to the indexer. The two checks are independent,
/// so in principle a name could be both; in practice the suffixes exclude
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryKind {
    pub class: bool,
    pub nested_archive: bool,
}

impl EntryKind {
    pub fn is_ignored(&self) -> bool {
        !self.class && !self.nested_archive
    }
}

pub fn classify_entry(name: &str) -> EntryKind {
    EntryKind {
        class: is_class_entry(name),
        nested_archive: is_archive_name(name),
    }
}

/// Top-level class files only: inner and synthetic classes carry a `$`.
pub fn is_class_entry(name: &str) -> bool {
    ends_with_ignore_ascii_case(name, CLASS_SUFFIX) && !name.contains('$')
}

pub fn is_archive_name(name: &str) -> bool {
    ARCHIVE_SUFFIXES
        .iter()
        .any(|suffix| ends_with_ignore_ascii_case(name, suffix))
}

/// `org/example/Foo.class` -> `org.example.Foo`.
pub fn class_file_to_name(entry_name: &str) -> String {
    let stem = if ends_with_ignore_ascii_case(entry_name, CLASS_SUFFIX) {
        &entry_name[..entry_name.len() - CLASS_SUFFIX.len()]
    } else {
        entry_name
    };
    stem.replace('/', ".")
}

/// Last path segment of an entry, e.g. `WEB-INF/lib/x.jar` -> `x.jar`.
pub fn entry_base_name(entry_name: &str) -> &str {
    entry_name
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(entry_name)
}

fn ends_with_ignore_ascii_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
