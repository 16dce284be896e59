//! Path classification: decides which repository files are rendered as text.
//!
//! The policy is allowlist-for-text, denylist-for-clutter. A path is excluded when it
//! merely *mentions* a clutter marker anywhere (plain substring match, so
//! `src/distance.rs` is excluded by `dist`).

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Include,
    Exclude,
}

impl Classification {
    pub fn is_include(self) -> bool {
        matches!(self, Classification::Include)
    }
}

/// Extensions (lowercase, no dot) of formats known to be text.
const TEXT_EXTENSIONS: &[&str] = &[
    "md", "markdown", "txt", "log", "json", "yaml", "yml", "xml", "html", "htm", "css", "js",
    "jsx", "ts", "tsx", "py", "rb", "php", "java", "c", "h", "cpp", "hpp", "cs", "go", "rs",
    "swift", "kt", "kts", "pl", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "r", "sql",
    "ini", "cfg", "conf", "toml", "editorconfig", "gitignore", "gitattributes", "gitmodules",
    "csv", "tsv", "rst", "adoc", "asciidoc", "tex", "dockerfile", "env", "properties",
    "graphql", "gql", "tf", "tfvars", "hcl", "vue", "svelte", "sum", "mod",
];

/// Well-known unsuffixed file names (lowercase) that are text.
const TEXT_FILE_NAMES: &[&str] = &[
    "readme",
    "license",
    "contributing",
    "code_of_conduct",
    "changelog",
    "makefile",
    "dockerfile",
    "jenkinsfile",
    "gemfile",
    "pipfile",
    "requirements",
    "procfile",
    "version",
    "authors",
    "copying",
    "notice",
    "patents",
    "todo",
];

/// Version-control, lockfile, dependency, build-output and editor markers.
const CLUTTER_MARKERS: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    ".git",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "node_modules",
    "dist",
    ".next",
    ".nuxt",
    ".cache",
    ".vscode",
    ".idea",
    ".history",
    ".github",
];

/// Classify a file by its repository `path` and its file `name`.
///
/// Pure function of the two strings; clutter exclusion wins over the text allowlist.
pub fn classify(path: &str, name: &str) -> Classification {
    if is_clutter(path) || is_clutter(name) {
        return Classification::Exclude;
    }
    if is_known_text(name) {
        Classification::Include
    } else {
        Classification::Exclude
    }
}

/// `true` when `candidate` contains any clutter marker as a substring.
pub fn is_clutter(candidate: &str) -> bool {
    CLUTTER_MARKERS
        .iter()
        .any(|marker| candidate.contains(marker))
}

/// `true` when the extension (text after the final `.`, or the whole name when there
/// is none) or the full lowercase name is allowlisted.
pub fn is_known_text(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let extension = lowered.rsplit('.').next().unwrap_or_default();
    TEXT_EXTENSIONS.contains(&extension) || TEXT_FILE_NAMES.contains(&lowered.as_str())
}
