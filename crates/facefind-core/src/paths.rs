//! Path display helpers and deep links into the files view.

use url::form_urlencoded;

/// Drop the leading separator from `path` for display.
///
/// With `clean`, doubled separators are collapsed first. The root path `/`
/// is kept as-is unless `force` is set, in which case it becomes empty.
/// Surrounding whitespace and a trailing separator are trimmed.
pub fn without_begin_slash(path: &str, force: bool, clean: bool) -> String {
    let path = if clean {
        path.replace("//", "/")
    } else {
        path.to_string()
    };

    if path == "/" && !force {
        return path;
    }

    let stripped = path.strip_prefix('/').unwrap_or(&path);
    let trimmed = stripped.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).trim().to_string()
}

/// Directory part of `path` for a file called `name`, trailing separator included.
pub fn directory_of(path: &str, name: &str) -> String {
    match path.strip_suffix(name) {
        Some(dir) if !name.is_empty() => dir.to_string(),
        _ => match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => String::new(),
        },
    }
}

/// Renders links to the files view (`files.view.index`) that scroll to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplate {
    base: String,
}

impl LinkTemplate {
    /// Application-relative URL of the files view.
    pub const DEFAULT_BASE: &'static str = "/apps/files/";

    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Link opening `directory` with `file_name` scrolled into view.
    pub fn render(&self, directory: &str, file_name: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("dir", directory)
            .append_pair("scrollto", file_name)
            .finish();
        format!("{}?{}", self.base, query)
    }
}

impl Default for LinkTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE)
    }
}
