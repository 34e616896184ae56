//! Command template substitution and build execution.
//!
//! Build and test commands are written as templates with `{placeholder}`
//! variables (`{version}`, `{timestamp}`, `{prefix}`, `{bin}`, `{cellar}`,
//! `{staging}`). Substitution is pure: the same template and variable map
//! always produce the same command line, so builds are reproducible given a
//! fixed timestamp. Commands are split shell-style but executed directly,
//! without a shell.

use crate::error::{MaltError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};

/// Substitute `{placeholder}` variables into a command template.
///
/// Unknown or unterminated placeholders are manifest errors.
pub fn substitute(template: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut key = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => key.push(c),
                Some(c) => {
                    return Err(MaltError::Parse(format!(
                        "invalid character `{}` in placeholder",
                        c
                    )));
                }
                None => {
                    return Err(MaltError::Parse("unterminated placeholder".to_string()));
                }
            }
        }
        let value = vars
            .get(&key)
            .ok_or_else(|| MaltError::Parse(format!("unknown placeholder `{{{}}}`", key)))?;
        out.push_str(value);
    }

    Ok(out)
}

/// Split a command line into argv, honoring single and double quotes
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {
                if in_word {
                    argv.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => {
                            return Err(MaltError::Parse("unterminated single quote".to_string()));
                        }
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => current.push(c),
                            None => {
                                return Err(MaltError::Parse(
                                    "unterminated double quote".to_string(),
                                ));
                            }
                        },
                        Some(c) => current.push(c),
                        None => {
                            return Err(MaltError::Parse("unterminated double quote".to_string()));
                        }
                    }
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        argv.push(current);
    }

    if argv.is_empty() {
        return Err(MaltError::Parse("empty command".to_string()));
    }

    Ok(argv)
}

/// Run one command in `cwd`, capturing output
pub fn run_command(argv: &[String], cwd: Option<&Path>) -> Result<Output> {
    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    Ok(command.output()?)
}

/// Substitute and execute each build command in the build directory.
///
/// Fails with [`MaltError::BuildFailed`] on the first non-zero exit.
pub fn run_build(
    commands: &[String],
    build_dir: &Path,
    vars: &BTreeMap<String, String>,
) -> Result<()> {
    for template in commands {
        let command = substitute(template, vars)?;
        let argv = split_command(&command)?;

        tracing::info!(%command, "running build command");
        let output = run_command(&argv, Some(build_dir))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            tracing::error!(
                %command,
                code,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "build command failed"
            );
            return Err(MaltError::BuildFailed { command, code });
        }
    }

    Ok(())
}
