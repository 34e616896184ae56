//! Formula manifest model and text format.
//!
//! A manifest is a declarative, attribute/block description of how to fetch,
//! build, install, and smoke-test a package:
//!
//! ```text
//! formula "go-parquet-tools" do
//!   desc "Utility to deal with Parquet data"
//!   url "https://github.com/hangxie/parquet-tools/archive/v1.0.1.tar.gz"
//!   sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
//!   license "BSD-3-Clause"
//!
//!   depends_on "go" => :build
//!
//!   install do
//!     build "go build -o parquet-tools"
//!     bin "parquet-tools"
//!   end
//! end
//! ```
//!
//! [`Manifest::parse`] reads this format and [`Manifest::to_dsl`] writes it
//! back out canonically, so `parse(to_dsl(m)) == m` for every valid manifest.
//! The parsed value is immutable: the pipeline only ever reads it.

use crate::error::{MaltError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A parsed package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub url: String,
    pub sha256: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub bottle: Option<BottleSpec>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    pub install: InstallSpec,
    #[serde(default)]
    pub test: Option<TestSpec>,
}

/// Precompiled bottle checksums, keyed by platform tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottleSpec {
    #[serde(default)]
    pub cellar: Option<String>,
    pub sha256: BTreeMap<String, String>,
}

/// A declared dependency; `build` marks build-time-only dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub build: bool,
}

/// A conflicting package declaration with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub name: String,
    pub because: String,
}

/// An auxiliary downloadable file (test fixtures)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
    pub sha256: String,
}

/// Build commands plus artifacts to place into the keg's bin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSpec {
    pub build: Vec<String>,
    #[serde(default)]
    pub bin: Vec<String>,
}

/// Smoke test: staged resources, one command, one expected substring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    #[serde(default)]
    pub stage: Vec<String>,
    pub run: String,
    pub assert_match: String,
}

impl Manifest {
    /// Read and parse a manifest file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse manifest text
    pub fn parse(text: &str) -> Result<Self> {
        Parser::new(text).parse()
    }

    /// The effective version: explicit `version` attribute, else inferred
    /// from the source URL (e.g. `.../archive/v1.0.1.tar.gz` -> `1.0.1`)
    pub fn effective_version(&self) -> Option<String> {
        if let Some(v) = &self.version {
            return Some(v.clone());
        }
        infer_version(&self.name, &self.url)
    }

    /// Look up a declared resource by name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Serialize back to canonical manifest text
    pub fn to_dsl(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("formula {} do\n", quote(&self.name)));
        if let Some(desc) = &self.desc {
            out.push_str(&format!("  desc {}\n", quote(desc)));
        }
        if let Some(homepage) = &self.homepage {
            out.push_str(&format!("  homepage {}\n", quote(homepage)));
        }
        out.push_str(&format!("  url {}\n", quote(&self.url)));
        out.push_str(&format!("  sha256 {}\n", quote(&self.sha256)));
        if let Some(license) = &self.license {
            out.push_str(&format!("  license {}\n", quote(license)));
        }
        if let Some(version) = &self.version {
            out.push_str(&format!("  version {}\n", quote(version)));
        }

        if let Some(bottle) = &self.bottle {
            out.push_str("\n  bottle do\n");
            if let Some(cellar) = &bottle.cellar {
                out.push_str(&format!("    cellar :{}\n", cellar));
            }
            for (tag, sha) in &bottle.sha256 {
                out.push_str(&format!("    sha256 {}: {}\n", tag, quote(sha)));
            }
            out.push_str("  end\n");
        }

        if !self.dependencies.is_empty() {
            out.push('\n');
            for dep in &self.dependencies {
                if dep.build {
                    out.push_str(&format!("  depends_on {} => :build\n", quote(&dep.name)));
                } else {
                    out.push_str(&format!("  depends_on {}\n", quote(&dep.name)));
                }
            }
        }

        for conflict in &self.conflicts {
            out.push_str(&format!(
                "  conflicts_with {}, because: {}\n",
                quote(&conflict.name),
                quote(&conflict.because)
            ));
        }

        for resource in &self.resources {
            out.push_str(&format!("\n  resource {} do\n", quote(&resource.name)));
            out.push_str(&format!("    url {}\n", quote(&resource.url)));
            out.push_str(&format!("    sha256 {}\n", quote(&resource.sha256)));
            out.push_str("  end\n");
        }

        out.push_str("\n  install do\n");
        for cmd in &self.install.build {
            out.push_str(&format!("    build {}\n", quote(cmd)));
        }
        for artifact in &self.install.bin {
            out.push_str(&format!("    bin {}\n", quote(artifact)));
        }
        out.push_str("  end\n");

        if let Some(test) = &self.test {
            out.push_str("\n  test do\n");
            for name in &test.stage {
                out.push_str(&format!("    stage {}\n", quote(name)));
            }
            out.push_str(&format!("    run {}\n", quote(&test.run)));
            out.push_str(&format!("    assert_match {}\n", quote(&test.assert_match)));
            out.push_str("  end\n");
        }

        out.push_str("end\n");
        out
    }
}

/// Check a checksum string is a 64-char lowercase hex SHA-256 digest
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == 64
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Infer the package version from the source URL basename
fn infer_version(name: &str, url: &str) -> Option<String> {
    let basename = url.rsplit('/').next()?;
    let mut stem = basename;
    for ext in [".tar.gz", ".tar.xz", ".tar.bz2", ".tgz", ".zip"] {
        if let Some(s) = stem.strip_suffix(ext) {
            stem = s;
            break;
        }
    }
    // foo-1.2.3 -> 1.2.3
    if let Some(s) = stem.strip_prefix(name) {
        stem = s.strip_prefix('-').unwrap_or(s);
    }
    // v1.2.3 -> 1.2.3
    if let Some(s) = stem.strip_prefix('v') {
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            stem = s;
        }
    }
    if stem.starts_with(|c: char| c.is_ascii_digit()) {
        Some(stem.to_string())
    } else {
        None
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Label(String),
    Atom(String),
    Arrow,
}

/// Lex one manifest line into tokens. Commas are separators and dropped.
fn lex_line(line: &str, lineno: usize) -> Result<Vec<Token>> {
    let err = |msg: &str| MaltError::Parse(format!("line {}: {}", lineno, msg));
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | ',' => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            _ => return Err(err("invalid escape in string")),
                        },
                        Some(c) => s.push(c),
                        None => return Err(err("unterminated string")),
                    }
                }
                tokens.push(Token::Str(s));
            }
            ':' => {
                chars.next();
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if s.is_empty() {
                    return Err(err("empty symbol"));
                }
                tokens.push(Token::Atom(s));
            }
            '=' => {
                chars.next();
                if chars.next() != Some('>') {
                    return Err(err("expected `=>`"));
                }
                tokens.push(Token::Arrow);
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek() == Some(&':') {
                    chars.next();
                    tokens.push(Token::Label(s));
                } else {
                    tokens.push(Token::Word(s));
                }
            }
            _ => return Err(err(&format!("unexpected character `{}`", c))),
        }
    }

    Ok(tokens)
}

/// Block contexts the parser can be inside
#[derive(Debug, PartialEq)]
enum Block {
    Formula,
    Bottle,
    Resource,
    Install,
    Test,
}

struct Parser<'a> {
    text: &'a str,
}

/// Partially assembled manifest; validated into a [`Manifest`] at the end
#[derive(Default)]
struct Draft {
    name: Option<String>,
    desc: Option<String>,
    homepage: Option<String>,
    url: Option<String>,
    sha256: Option<String>,
    license: Option<String>,
    version: Option<String>,
    bottle: Option<BottleSpec>,
    dependencies: Vec<Dependency>,
    conflicts: Vec<Conflict>,
    resources: Vec<Resource>,
    install: Option<InstallSpec>,
    test: Option<TestSpec>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text }
    }

    fn parse(self) -> Result<Manifest> {
        let mut draft = Draft::default();
        let mut stack: Vec<Block> = Vec::new();
        let mut done = false;

        // In-progress inner blocks
        let mut bottle = BottleSpec::default();
        let mut resource_name = String::new();
        let mut resource_url: Option<String> = None;
        let mut resource_sha: Option<String> = None;
        let mut install = InstallSpec::default();
        let mut test_stage: Vec<String> = Vec::new();
        let mut test_run: Option<String> = None;
        let mut test_match: Option<String> = None;

        for (idx, raw) in self.text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |msg: String| MaltError::Parse(format!("line {}: {}", lineno, msg));
            if done {
                return Err(err("content after closing `end`".into()));
            }

            let tokens = lex_line(line, lineno)?;
            let Some(Token::Word(directive)) = tokens.first() else {
                return Err(err("expected a directive".into()));
            };
            let directive = directive.as_str();
            let args = &tokens[1..];

            match stack.last() {
                None => match directive {
                    "formula" => match args {
                        [Token::Str(name), Token::Word(kw)] if kw == "do" => {
                            draft.name = Some(name.clone());
                            stack.push(Block::Formula);
                        }
                        _ => return Err(err("expected `formula \"name\" do`".into())),
                    },
                    _ => return Err(err("manifest must start with a `formula` block".into())),
                },
                Some(Block::Formula) => match directive {
                    "desc" | "homepage" | "url" | "sha256" | "license" | "version" => {
                        let value = single_str(args)
                            .ok_or_else(|| err(format!("`{}` takes one string", directive)))?;
                        let slot = match directive {
                            "desc" => &mut draft.desc,
                            "homepage" => &mut draft.homepage,
                            "url" => &mut draft.url,
                            "sha256" => &mut draft.sha256,
                            "license" => &mut draft.license,
                            _ => &mut draft.version,
                        };
                        if slot.is_some() {
                            return Err(err(format!("duplicate `{}`", directive)));
                        }
                        *slot = Some(value);
                    }
                    "bottle" => {
                        expect_do(args).map_err(&err)?;
                        if draft.bottle.is_some() {
                            return Err(err("duplicate `bottle` block".into()));
                        }
                        bottle = BottleSpec::default();
                        stack.push(Block::Bottle);
                    }
                    "depends_on" => match args {
                        [Token::Str(name)] => draft.dependencies.push(Dependency {
                            name: name.clone(),
                            build: false,
                        }),
                        [Token::Str(name), Token::Arrow, Token::Atom(kind)] if kind == "build" => {
                            draft.dependencies.push(Dependency {
                                name: name.clone(),
                                build: true,
                            })
                        }
                        [Token::Str(_), Token::Arrow, Token::Atom(kind)] => {
                            return Err(err(format!("unknown dependency kind `:{}`", kind)));
                        }
                        _ => return Err(err("expected `depends_on \"name\" [=> :build]`".into())),
                    },
                    "conflicts_with" => match args {
                        [Token::Str(name), Token::Label(label), Token::Str(because)]
                            if label == "because" =>
                        {
                            draft.conflicts.push(Conflict {
                                name: name.clone(),
                                because: because.clone(),
                            })
                        }
                        _ => {
                            return Err(err(
                                "expected `conflicts_with \"name\", because: \"reason\"`".into(),
                            ));
                        }
                    },
                    "resource" => match args {
                        [Token::Str(name), Token::Word(kw)] if kw == "do" => {
                            resource_name = name.clone();
                            resource_url = None;
                            resource_sha = None;
                            stack.push(Block::Resource);
                        }
                        _ => return Err(err("expected `resource \"name\" do`".into())),
                    },
                    "install" => {
                        expect_do(args).map_err(&err)?;
                        if draft.install.is_some() {
                            return Err(err("duplicate `install` block".into()));
                        }
                        install = InstallSpec::default();
                        stack.push(Block::Install);
                    }
                    "test" => {
                        expect_do(args).map_err(&err)?;
                        if draft.test.is_some() {
                            return Err(err("duplicate `test` block".into()));
                        }
                        test_stage = Vec::new();
                        test_run = None;
                        test_match = None;
                        stack.push(Block::Test);
                    }
                    "end" => {
                        stack.pop();
                        done = true;
                    }
                    _ => return Err(err(format!("unknown directive `{}`", directive))),
                },
                Some(Block::Bottle) => match directive {
                    "cellar" => match args {
                        [Token::Atom(policy)] => {
                            if bottle.cellar.is_some() {
                                return Err(err("duplicate `cellar`".into()));
                            }
                            bottle.cellar = Some(policy.clone());
                        }
                        _ => return Err(err("expected `cellar :policy`".into())),
                    },
                    "sha256" => match args {
                        [Token::Label(tag), Token::Str(sha)] => {
                            if bottle.sha256.insert(tag.clone(), sha.clone()).is_some() {
                                return Err(err(format!("duplicate bottle tag `{}`", tag)));
                            }
                        }
                        _ => return Err(err("expected `sha256 platform_tag: \"digest\"`".into())),
                    },
                    "end" => {
                        stack.pop();
                        draft.bottle = Some(std::mem::take(&mut bottle));
                    }
                    _ => return Err(err(format!("unknown directive `{}` in bottle", directive))),
                },
                Some(Block::Resource) => match directive {
                    "url" => {
                        let value = single_str(args)
                            .ok_or_else(|| err("`url` takes one string".into()))?;
                        if resource_url.replace(value).is_some() {
                            return Err(err("duplicate `url`".into()));
                        }
                    }
                    "sha256" => {
                        let value = single_str(args)
                            .ok_or_else(|| err("`sha256` takes one string".into()))?;
                        if resource_sha.replace(value).is_some() {
                            return Err(err("duplicate `sha256`".into()));
                        }
                    }
                    "end" => {
                        stack.pop();
                        let url = resource_url
                            .take()
                            .ok_or_else(|| err(format!("resource `{}` has no url", resource_name)))?;
                        let sha256 = resource_sha.take().ok_or_else(|| {
                            err(format!("resource `{}` has no sha256", resource_name))
                        })?;
                        draft.resources.push(Resource {
                            name: std::mem::take(&mut resource_name),
                            url,
                            sha256,
                        });
                    }
                    _ => return Err(err(format!("unknown directive `{}` in resource", directive))),
                },
                Some(Block::Install) => match directive {
                    "build" => {
                        let value = single_str(args)
                            .ok_or_else(|| err("`build` takes one string".into()))?;
                        install.build.push(value);
                    }
                    "bin" => {
                        let value =
                            single_str(args).ok_or_else(|| err("`bin` takes one string".into()))?;
                        install.bin.push(value);
                    }
                    "end" => {
                        stack.pop();
                        draft.install = Some(std::mem::take(&mut install));
                    }
                    _ => return Err(err(format!("unknown directive `{}` in install", directive))),
                },
                Some(Block::Test) => match directive {
                    "stage" => {
                        let value = single_str(args)
                            .ok_or_else(|| err("`stage` takes one string".into()))?;
                        test_stage.push(value);
                    }
                    "run" => {
                        let value =
                            single_str(args).ok_or_else(|| err("`run` takes one string".into()))?;
                        if test_run.replace(value).is_some() {
                            return Err(err("duplicate `run`".into()));
                        }
                    }
                    "assert_match" => {
                        let value = single_str(args)
                            .ok_or_else(|| err("`assert_match` takes one string".into()))?;
                        if test_match.replace(value).is_some() {
                            return Err(err("duplicate `assert_match`".into()));
                        }
                    }
                    "end" => {
                        stack.pop();
                        let run = test_run
                            .take()
                            .ok_or_else(|| err("test block has no `run`".into()))?;
                        let assert_match = test_match
                            .take()
                            .ok_or_else(|| err("test block has no `assert_match`".into()))?;
                        draft.test = Some(TestSpec {
                            stage: std::mem::take(&mut test_stage),
                            run,
                            assert_match,
                        });
                    }
                    _ => return Err(err(format!("unknown directive `{}` in test", directive))),
                },
            }
        }

        if !done {
            return Err(MaltError::Parse("unterminated `formula` block".into()));
        }

        draft.finish()
    }
}

fn single_str(args: &[Token]) -> Option<String> {
    match args {
        [Token::Str(s)] => Some(s.clone()),
        _ => None,
    }
}

fn expect_do(args: &[Token]) -> std::result::Result<(), String> {
    match args {
        [Token::Word(kw)] if kw == "do" => Ok(()),
        _ => Err("expected `do` to open the block".to_string()),
    }
}

impl Draft {
    fn finish(self) -> Result<Manifest> {
        let err = MaltError::Parse;
        let name = self.name.ok_or_else(|| err("missing formula name".into()))?;
        let url = self.url.ok_or_else(|| err("missing `url`".into()))?;
        let sha256 = self.sha256.ok_or_else(|| err("missing `sha256`".into()))?;
        let install = self
            .install
            .ok_or_else(|| err("missing `install` block".into()))?;

        if !is_valid_sha256(&sha256) {
            return Err(err(format!("invalid sha256 `{}`", sha256)));
        }
        if install.build.is_empty() {
            return Err(err("install block has no `build` command".into()));
        }
        for resource in &self.resources {
            if !is_valid_sha256(&resource.sha256) {
                return Err(err(format!(
                    "invalid sha256 for resource `{}`",
                    resource.name
                )));
            }
        }
        if let Some(bottle) = &self.bottle {
            for (tag, sha) in &bottle.sha256 {
                if !is_valid_sha256(sha) {
                    return Err(err(format!("invalid sha256 for bottle tag `{}`", tag)));
                }
            }
        }
        if let Some(test) = &self.test {
            for staged in &test.stage {
                if !self.resources.iter().any(|r| &r.name == staged) {
                    return Err(err(format!("test stages unknown resource `{}`", staged)));
                }
            }
        }

        let manifest = Manifest {
            name,
            desc: self.desc,
            homepage: self.homepage,
            url,
            sha256,
            license: self.license,
            version: self.version,
            bottle: self.bottle,
            dependencies: self.dependencies,
            conflicts: self.conflicts,
            resources: self.resources,
            install,
            test: self.test,
        };

        if manifest.effective_version().is_none() {
            return Err(err(
                "cannot infer version from url; add an explicit `version`".into(),
            ));
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
formula "widget" do
  url "https://example.com/widget/archive/v2.0.0.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"

  install do
    build "make"
    bin "widget"
  end
end
"#;

    #[test]
    fn test_parse_minimal() {
        let manifest = Manifest::parse(MINIMAL).unwrap();
        assert_eq!(manifest.name, "widget");
        assert_eq!(manifest.install.build, vec!["make"]);
        assert_eq!(manifest.install.bin, vec!["widget"]);
        assert_eq!(manifest.effective_version().unwrap(), "2.0.0");
        assert!(manifest.test.is_none());
        assert!(manifest.bottle.is_none());
    }

    #[test]
    fn test_round_trip_minimal() {
        let manifest = Manifest::parse(MINIMAL).unwrap();
        let reparsed = Manifest::parse(&manifest.to_dsl()).unwrap();
        assert_eq!(manifest, reparsed);
    }

    #[test]
    fn test_missing_url() {
        let text = r#"
formula "widget" do
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  install do
    build "make"
  end
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("missing `url`"));
    }

    #[test]
    fn test_missing_install() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("missing `install`"));
    }

    #[test]
    fn test_invalid_sha256_rejected() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
  sha256 "nothex"
  install do
    build "make"
  end
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("invalid sha256"));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
  url "https://example.com/v1.0.1.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  install do
    build "make"
  end
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("duplicate `url`"));
    }

    #[test]
    fn test_unknown_directive_names_line() {
        let text = r#"
formula "widget" do
  frobnicate "yes"
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("line 3"));
        assert!(e.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_depends_on_kinds() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  depends_on "go" => :build
  depends_on "zlib"
  install do
    build "make"
  end
end
"#;
        let manifest = Manifest::parse(text).unwrap();
        assert_eq!(
            manifest.dependencies,
            vec![
                Dependency {
                    name: "go".into(),
                    build: true
                },
                Dependency {
                    name: "zlib".into(),
                    build: false
                },
            ]
        );
    }

    #[test]
    fn test_unknown_dependency_kind_rejected() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  depends_on "go" => :optional
  install do
    build "make"
  end
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("unknown dependency kind"));
    }

    #[test]
    fn test_stage_must_name_declared_resource() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  install do
    build "make"
  end
  test do
    stage "fixtures"
    run "widget --version"
    assert_match "1.0.0"
  end
end
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("unknown resource"));
    }

    #[test]
    fn test_unterminated_block() {
        let text = r#"
formula "widget" do
  url "https://example.com/v1.0.0.tar.gz"
"#;
        let e = Manifest::parse(text).unwrap_err();
        assert!(e.to_string().contains("unterminated"));
    }

    #[test]
    fn test_infer_version() {
        assert_eq!(
            infer_version("parquet-tools", "https://example.com/archive/v1.0.1.tar.gz").unwrap(),
            "1.0.1"
        );
        assert_eq!(
            infer_version("widget", "https://example.com/widget-2.3.4.tar.gz").unwrap(),
            "2.3.4"
        );
        assert_eq!(
            infer_version("widget", "https://example.com/widget-2.3.4.tgz").unwrap(),
            "2.3.4"
        );
        assert!(infer_version("widget", "https://example.com/latest.tar.gz").is_none());
    }

    #[test]
    fn test_explicit_version_wins() {
        let text = r#"
formula "widget" do
  url "https://example.com/latest.tar.gz"
  sha256 "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
  version "3.1.4"
  install do
    build "make"
  end
end
"#;
        let manifest = Manifest::parse(text).unwrap();
        assert_eq!(manifest.effective_version().unwrap(), "3.1.4");
    }

    #[test]
    fn test_quoted_string_escapes() {
        let tokens = lex_line(r#"desc "say \"hi\" \\ok""#, 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("desc".into()),
                Token::Str(r#"say "hi" \ok"#.into())
            ]
        );
    }

    #[test]
    fn test_is_valid_sha256() {
        assert!(is_valid_sha256(
            "8fe59562cd86f82447c8c1f16fb300bab5660f67bbdefca9dafafb9b1a223ca6"
        ));
        assert!(!is_valid_sha256("8FE59562CD86F82447C8C1F16FB300BA"));
        assert!(!is_valid_sha256("zz"));
    }
}
