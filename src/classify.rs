use crate::event::{EventType, Priority};
use std::path::{Component, Path};

const SECURITY_KEYWORDS: &[&str] = &[
    "malware",
    "virus",
    "trojan",
    "ransom",
    "security",
    "auth",
    "password",
    "credential",
];

const SENSITIVE_KEYWORDS: &[&str] = &[
    "finance",
    "bank",
    "payment",
    "invoice",
    "tax",
    "confidential",
    "private",
    "secret",
];

/// Extensions that get a file quarantined when it lands in a critical tier.
pub const RISKY_EXTENSIONS: &[&str] = &["exe", "dll", "sys", "bat", "scr"];

const RISKY_ROOTS: &[&str] = &["downloads", "desktop", "temp"];

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "csv"];

const TEXT_EXTENSIONS: &[&str] = &["txt", "rtf", "odt", "ppt", "pptx"];

/// Assigns a priority tier from the path alone.
///
/// Rules are evaluated in order and the first match wins:
///
/// 1. security keyword anywhere in the path, or a risky executable under a
///    risky root (`Downloads`, `Desktop`, `Temp`) => [`Priority::Critical`]
/// 2. finance/confidentiality keyword, or a document extension => [`Priority::High`]
/// 3. text/presentation extension => [`Priority::Medium`]
/// 4. anything else => [`Priority::Low`]
///
/// Matching is case-insensitive. Directory events skip the extension rules.
pub fn classify(event_type: EventType, path: &Path) -> Priority {
    let lowered = path.to_string_lossy().replace('\\', "/").to_lowercase();
    let extension = if event_type.is_directory() {
        None
    } else {
        extension_of(path)
    };
    let ext = extension.as_deref();

    if contains_any(&lowered, SECURITY_KEYWORDS) {
        return Priority::Critical;
    }

    if is_risky_executable(ext) && under_risky_root(path) {
        return Priority::Critical;
    }

    if contains_any(&lowered, SENSITIVE_KEYWORDS) || ext_in(ext, DOCUMENT_EXTENSIONS) {
        return Priority::High;
    }

    if ext_in(ext, TEXT_EXTENSIONS) {
        return Priority::Medium;
    }

    Priority::Low
}

/// Whether the path carries one of [`RISKY_EXTENSIONS`].
pub fn has_risky_extension(path: &Path) -> bool {
    is_risky_executable(extension_of(path).as_deref())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn ext_in(ext: Option<&str>, set: &[&str]) -> bool {
    ext.is_some_and(|e| set.contains(&e))
}

fn is_risky_executable(ext: Option<&str>) -> bool {
    ext_in(ext, RISKY_EXTENSIONS)
}

fn under_risky_root(path: &Path) -> bool {
    // Windows paths seen on a POSIX host arrive as a single component.
    let normalized = path.to_string_lossy().replace('\\', "/");
    Path::new(&normalized)
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components())
        .any(|component| match component {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|n| RISKY_ROOTS.contains(&n.to_ascii_lowercase().as_str())),
            _ => false,
        })
}
