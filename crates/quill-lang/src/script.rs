//! Host-facing script metadata.
//!
//! A script's header may carry `// @mode: ir` and `// @name: Fold Constants`
//! directives. They are ordinary comments to the lexer; only this module
//! reads them.

/// Which representation a host applies the script to. The language core
/// behaves the same for every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptMode {
    #[default]
    Ast,
    Ir,
    Both,
}

impl ScriptMode {
    /// Case-insensitive; anything unrecognised is `Ast`.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "ir"   => ScriptMode::Ir,
            "both" => ScriptMode::Both,
            _      => ScriptMode::Ast,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptMode::Ast  => "ast",
            ScriptMode::Ir   => "ir",
            ScriptMode::Both => "both",
        }
    }
}

impl std::fmt::Display for ScriptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_NAME: &str = "Untitled Script";

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub mode: ScriptMode,
    pub source: String,
    /// Shipped with the host rather than written by the user.
    pub built_in: bool,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
}

impl Script {
    pub fn new(name: impl Into<String>, mode: ScriptMode, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode,
            source: source.into(),
            built_in: false,
            description: None,
            author: None,
            version: None,
        }
    }

    /// Build a script whose name and mode come from its header directives.
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let name = parse_name_from_content(&source);
        let mode = parse_mode_from_content(&source);
        Self::new(name, mode, source)
    }

    pub fn built_in(mut self) -> Self {
        self.built_in = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

// ─── Header directives ───────────────────────────────────────────────────────

/// Value of the first `// @key:` line, trimmed. Only the leading run of
/// comment and blank lines is searched.
fn directive<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let comment = line.strip_prefix("//")?;
        if let Some(value) = comment.trim_start().strip_prefix('@').and_then(|d| d.strip_prefix(key)) {
            if let Some(value) = value.trim_start().strip_prefix(':') {
                return Some(value.trim());
            }
        }
    }
    None
}

pub fn parse_mode_from_content(content: &str) -> ScriptMode {
    directive(content, "mode").map(ScriptMode::parse).unwrap_or_default()
}

pub fn parse_name_from_content(content: &str) -> String {
    match directive(content, "name") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_NAME.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings() {
        assert_eq!(ScriptMode::parse("ir"), ScriptMode::Ir);
        assert_eq!(ScriptMode::parse("BOTH"), ScriptMode::Both);
        assert_eq!(ScriptMode::parse("ast"), ScriptMode::Ast);
        assert_eq!(ScriptMode::parse("bytecode"), ScriptMode::Ast);
        assert_eq!(ScriptMode::Both.to_string(), "both");
    }

    #[test]
    fn header_directives() {
        let src = "// @mode: ir\n// @name: Fold Constants\n\nlet x = 1;";
        assert_eq!(parse_mode_from_content(src), ScriptMode::Ir);
        assert_eq!(parse_name_from_content(src), "Fold Constants");
    }

    #[test]
    fn missing_directives_use_defaults() {
        let src = "let x = 1;\n// @mode: ir";
        assert_eq!(parse_mode_from_content(src), ScriptMode::Ast);
        assert_eq!(parse_name_from_content(src), DEFAULT_NAME);
        assert_eq!(parse_name_from_content("// @name:   \n"), DEFAULT_NAME);
    }

    #[test]
    fn other_comments_before_directives() {
        let src = "// transform helpers\n\n//@name:Strip\n";
        assert_eq!(parse_name_from_content(src), "Strip");
    }

    #[test]
    fn from_source_fills_metadata() {
        let script = Script::from_source("// @mode: both\n// @name: Demo\nlog(1)")
            .built_in()
            .with_author("core");
        assert_eq!(script.name, "Demo");
        assert_eq!(script.mode, ScriptMode::Both);
        assert!(script.built_in);
        assert_eq!(script.author.as_deref(), Some("core"));
        assert_eq!(script.description, None);
    }
}
