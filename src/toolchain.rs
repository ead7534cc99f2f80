//! Language toolchains as data.
//!
//! Each language maps to an optional compile command and a run command. The
//! commands are argv templates expanded per execution, so adding or
//! retargeting a language is a table change rather than a code change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Class name the Java run step launches. Submitted Java code must declare
/// `public class Main`.
pub const JAVA_ENTRY_CLASS: &str = "Main";

/// Toolchain for a single language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Toolchain {
    /// Source file extension, without the dot.
    pub extension: String,
    /// Source file stem. Defaults to `main`.
    #[serde(default = "default_stem")]
    pub stem: String,
    /// Compile step, if the language has one.
    #[serde(default)]
    pub compile: Option<Vec<String>>,
    /// Run step.
    pub run: Vec<String>,
    /// Extra tags accepted for this language.
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_stem() -> String {
    "main".to_string()
}

impl Toolchain {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.stem, self.extension)
    }
}

/// Values substituted into command templates.
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    /// `{source}`: path of the source artifact.
    pub source: &'a Path,
    /// `{dir}`: the execution's scratch directory.
    pub dir: &'a Path,
    /// `{binary}`: path the compile step writes its executable to.
    pub binary: &'a Path,
    /// `{entry}`: entry point name for runtimes that need one.
    pub entry: &'a str,
}

/// Expand `{source}`, `{dir}`, `{binary}` and `{entry}` in every argument.
pub fn expand(template: &[String], vars: &Placeholders<'_>) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            arg.replace("{source}", &vars.source.to_string_lossy())
                .replace("{dir}", &vars.dir.to_string_lossy())
                .replace("{binary}", &vars.binary.to_string_lossy())
                .replace("{entry}", vars.entry)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    languages: BTreeMap<String, Toolchain>,
}

/// Lookup table from language tag to toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainTable {
    languages: BTreeMap<String, Toolchain>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Default for ToolchainTable {
    fn default() -> Self {
        let mut languages = BTreeMap::new();
        languages.insert(
            "python".to_string(),
            Toolchain {
                extension: "py".to_string(),
                stem: default_stem(),
                compile: None,
                run: argv(&["python3", "{source}"]),
                aliases: argv(&["py", "python3"]),
            },
        );
        languages.insert(
            "javascript".to_string(),
            Toolchain {
                extension: "js".to_string(),
                stem: default_stem(),
                compile: None,
                run: argv(&["node", "{source}"]),
                aliases: argv(&["js", "node"]),
            },
        );
        languages.insert(
            "java".to_string(),
            Toolchain {
                extension: "java".to_string(),
                stem: JAVA_ENTRY_CLASS.to_string(),
                compile: Some(argv(&["javac", "-d", "{dir}", "{source}"])),
                run: argv(&["java", "-cp", "{dir}", "{entry}"]),
                aliases: Vec::new(),
            },
        );
        languages.insert(
            "c".to_string(),
            Toolchain {
                extension: "c".to_string(),
                stem: default_stem(),
                compile: Some(argv(&["gcc", "{source}", "-o", "{binary}"])),
                run: argv(&["{binary}"]),
                aliases: Vec::new(),
            },
        );
        languages.insert(
            "cpp".to_string(),
            Toolchain {
                extension: "cpp".to_string(),
                stem: default_stem(),
                compile: Some(argv(&["g++", "{source}", "-o", "{binary}"])),
                run: argv(&["{binary}"]),
                aliases: argv(&["c++"]),
            },
        );
        Self { languages }
    }
}

impl ToolchainTable {
    /// Parse a TOML table and layer it over the built-in languages.
    ///
    /// ```toml
    /// [languages.python]
    /// extension = "py"
    /// run = ["python3.12", "{source}"]
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, String> {
        let file: TableFile = toml::from_str(input).map_err(|e| format!("toolchains: {}", e))?;
        let mut table = Self::default();
        for (name, toolchain) in file.languages {
            if toolchain.run.is_empty() {
                return Err(format!("toolchains: `{}` has an empty run command", name));
            }
            if toolchain.compile.as_ref().is_some_and(|c| c.is_empty()) {
                return Err(format!("toolchains: `{}` has an empty compile command", name));
            }
            table.languages.insert(name.to_ascii_lowercase(), toolchain);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let contents =
            fs::read_to_string(path).map_err(|e| format!("read {}: {}", path.display(), e))?;
        Self::from_toml_str(&contents)
    }

    /// Resolve a language tag (case-insensitive, aliases allowed) to its
    /// canonical name and toolchain.
    pub fn resolve(&self, tag: &str) -> Option<(&str, &Toolchain)> {
        let tag = tag.trim().to_ascii_lowercase();
        if let Some((name, toolchain)) = self.languages.get_key_value(&tag) {
            return Some((name.as_str(), toolchain));
        }
        self.languages
            .iter()
            .find(|(_, t)| t.aliases.iter().any(|a| a.eq_ignore_ascii_case(&tag)))
            .map(|(name, t)| (name.as_str(), t))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Toolchain)> {
        self.languages.iter().map(|(name, t)| (name.as_str(), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builtin_languages_resolve() {
        let table = ToolchainTable::default();
        for (tag, ext) in [
            ("python", "py"),
            ("javascript", "js"),
            ("java", "java"),
            ("c", "c"),
            ("cpp", "cpp"),
        ] {
            let (name, toolchain) = table.resolve(tag).unwrap();
            assert_eq!(name, tag);
            assert_eq!(toolchain.extension, ext);
        }
        assert!(table.resolve("ruby").is_none());
    }

    #[test]
    fn aliases_and_case_are_accepted() {
        let table = ToolchainTable::default();
        assert_eq!(table.resolve("JS").unwrap().0, "javascript");
        assert_eq!(table.resolve("c++").unwrap().0, "cpp");
        assert_eq!(table.resolve(" Python ").unwrap().0, "python");
    }

    #[test]
    fn java_source_is_named_after_entry_class() {
        let table = ToolchainTable::default();
        let (_, java) = table.resolve("java").unwrap();
        assert_eq!(java.source_file_name(), "Main.java");
        assert!(java.is_compiled());
    }

    #[test]
    fn expand_substitutes_placeholders() {
        let dir = PathBuf::from("/tmp/exec-1");
        let source = dir.join("main.c");
        let binary = dir.join("main");
        let vars = Placeholders { source: &source, dir: &dir, binary: &binary, entry: "Main" };
        let template = argv(&["gcc", "{source}", "-o", "{binary}", "-I{dir}", "{entry}"]);
        assert_eq!(
            expand(&template, &vars),
            vec!["gcc", "/tmp/exec-1/main.c", "-o", "/tmp/exec-1/main", "-I/tmp/exec-1", "Main"]
        );
    }

    #[test]
    fn toml_overrides_and_extends() {
        let table = ToolchainTable::from_toml_str(
            r#"
            [languages.ruby]
            extension = "rb"
            run = ["ruby", "{source}"]
            aliases = ["rb"]

            [languages.python]
            extension = "py"
            run = ["python3.12", "{source}"]
            "#,
        )
        .unwrap();
        let (name, ruby) = table.resolve("rb").unwrap();
        assert_eq!(name, "ruby");
        assert_eq!(ruby.source_file_name(), "main.rb");
        assert_eq!(table.resolve("python").unwrap().1.run[0], "python3.12");
        assert!(table.resolve("java").is_some());
    }

    #[test]
    fn toml_rejects_empty_run() {
        let err = ToolchainTable::from_toml_str(
            r#"
            [languages.bad]
            extension = "x"
            run = []
            "#,
        )
        .unwrap_err();
        assert!(err.contains("empty run command"));
    }
}
