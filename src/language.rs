use crate::handle::{Handle, HandleOption};
use crate::heartbeat::{EntityType, HeartBeat};
use crate::iterext::IterExt;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LanguageError {
    #[error("could not detect language for file {0:?}")]
    NotDetected(String),
}

/// Generic file name to language catalog, consulted after the fixed
/// overrides in [`detect`].
pub trait Catalog {
    fn match_filename(&self, filename: &str) -> Option<&str>;
}

/// Overrides applied around detection.
#[derive(Debug, Clone, Default)]
pub struct LanguageConfig {
    /// Used when detection fails.
    pub alternative: Option<String>,
    /// Replaces whatever was detected.
    pub overwrite: Option<String>,
}

pub fn with_detection<'a, C>(config: LanguageConfig, catalog: C) -> HandleOption<'a>
where
    C: Catalog + 'a,
{
    Box::new(move |mut next: Handle<'a>| -> Handle<'a> {
        Box::new(move |hh: Vec<HeartBeat>| {
            let hh: Vec<HeartBeat> = hh
                .into_iter()
                .edit(|h| {
                    if h.entity_type != EntityType::File {
                        return;
                    }

                    if let Some(language) = &config.overwrite {
                        h.language = Some(language.clone());
                        return;
                    }

                    match detect(&h.entity, &catalog) {
                        Ok(language) => h.language = Some(language),
                        Err(e) => {
                            tracing::error!("failed to detect language on file entity: {}", e);

                            if let Some(language) = &config.alternative {
                                h.language = Some(language.clone());
                            }
                        }
                    }
                })
                .collect();

            next(hh)
        })
    })
}

/// Detects the language of `filepath` from its name alone.
pub fn detect(filepath: &str, catalog: &dyn Catalog) -> Result<String, LanguageError> {
    if let Some(language) = fixed_override(filepath) {
        return Ok(language.to_owned());
    }

    let filename = Path::new(filepath)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filepath);

    catalog
        .match_filename(filename)
        .map(str::to_owned)
        .ok_or_else(|| LanguageError::NotDetected(filepath.to_owned()))
}

// Generic catalogs get these wrong (GAS, Forth, ...).
fn fixed_override(filepath: &str) -> Option<&'static str> {
    const SUFFIXES: &[(&str, &str)] = &[
        (".mm", "Objective-C"),
        (".s", "Assembly"),
        (".fs", "F#"),
        (".cfm", "ColdFusion"),
    ];

    if Path::new(filepath).file_name().and_then(|name| name.to_str()) == Some("go.mod") {
        return Some("Go");
    }

    SUFFIXES
        .iter()
        .find(|(suffix, _)| filepath.ends_with(suffix))
        .map(|(_, language)| *language)
}

/// Built-in catalog keyed on exact file names and extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl BuiltinCatalog {
    fn by_filename(filename: &str) -> Option<&'static str> {
        let language = match filename {
            "Makefile" | "GNUmakefile" | "makefile" => "Makefile",
            "Dockerfile" => "Docker",
            "CMakeLists.txt" => "CMake",
            "Rakefile" | "Gemfile" => "Ruby",
            "Cargo.lock" => "TOML",
            "PKGBUILD" => "Bash",
            _ => return None,
        };
        Some(language)
    }

    fn by_extension(ext: &str) -> Option<&'static str> {
        let language = match ext.to_lowercase().as_str() {
            "s" => "GAS",
            "asm" | "nasm" => "NASM",
            "c" | "h" => "C",
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" | "c++" => "C++",
            "cs" => "C#",
            "cfm" | "cfml" => "Coldfusion HTML",
            "clj" | "cljs" | "cljc" => "Clojure",
            "css" => "CSS",
            "dart" => "Dart",
            "elm" => "Elm",
            "ex" | "exs" => "Elixir",
            "erl" | "hrl" => "Erlang",
            "fs" | "frt" => "Forth",
            "fsx" | "fsi" => "FSharp",
            "go" => "Go",
            "graphql" | "gql" => "GraphQL",
            "groovy" | "gradle" => "Groovy",
            "hs" => "Haskell",
            "hx" => "Haxe",
            "html" | "htm" | "xhtml" => "HTML",
            "java" => "Java",
            "js" | "mjs" | "cjs" => "JavaScript",
            "json" => "JSON",
            "jsx" => "react",
            "jl" => "Julia",
            "kt" | "kts" => "Kotlin",
            "lua" => "Lua",
            "m" => "Matlab",
            "md" | "markdown" => "markdown",
            "ml" | "mli" => "OCaml",
            "nim" => "Nim",
            "nix" => "Nix",
            "php" => "PHP",
            "pl" | "pm" => "Perl",
            "ps1" | "psm1" => "PowerShell",
            "py" | "pyw" => "Python",
            "r" => "R",
            "rb" => "Ruby",
            "rs" => "Rust",
            "sass" => "Sass",
            "scala" | "sc" => "Scala",
            "scss" => "SCSS",
            "sh" | "bash" | "zsh" => "Bash",
            "sql" => "SQL",
            "swift" => "Swift",
            "tf" | "hcl" => "Terraform",
            "toml" => "TOML",
            "ts" | "tsx" => "TypeScript",
            "txt" => "plaintext",
            "vim" => "VimL",
            "vue" => "vue",
            "xml" => "XML",
            "yaml" | "yml" => "YAML",
            "zig" => "Zig",
            _ => return None,
        };
        Some(language)
    }
}

impl Catalog for BuiltinCatalog {
    fn match_filename(&self, filename: &str) -> Option<&str> {
        if let Some(language) = Self::by_filename(filename) {
            return Some(language);
        }

        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::by_extension)
    }
}
