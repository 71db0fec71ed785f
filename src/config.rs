use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::transform::Filter;

/// Defaults that can be saved to an rc file and overridden on the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub print: bool,
    pub filter: Option<Filter>,
    pub pipe: Option<String>,
}

impl ConfigFlags {
    /// Merge `other` over `self`.
    ///
    /// `filter` and `pipe` are one choice: if `other` names either, it
    /// replaces both.
    pub fn union(&self, other: &Self) -> Self {
        let (filter, pipe) = if other.filter.is_some() || other.pipe.is_some() {
            (other.filter, other.pipe.clone())
        } else {
            (self.filter, self.pipe.clone())
        };
        Self {
            print: self.print || other.print,
            filter,
            pipe,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("acme-select").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("acme-select")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("acme-select").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("acme-select")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".acmeselectrc")
}

/// Load flags from an rc file. A missing file yields the defaults.
///
/// Each non-comment line holds one flag, optionally followed by its value;
/// the value runs to the end of the line so pipe commands may contain spaces.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| match line.split_once(char::is_whitespace) {
            Some((flag, value)) => vec![flag.to_owned(), value.trim().to_owned()],
            None => vec![line.to_owned()],
        })
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# acme-select defaults (saved with --save)".to_string());
    if flags.print {
        lines.push("--print".to_string());
    }
    if let Some(filter) = flags.filter {
        lines.push(format!("--filter {}", filter.name()));
    }
    if let Some(pipe) = &flags.pipe {
        lines.push(format!("--pipe {pipe}"));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the saveable flags out of a token list; anything else is skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--print" {
            flags.print = true;
        } else if token == "--filter" {
            if let Some(next) = tokens.get(i + 1) {
                flags.filter = Filter::from_name(next);
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--filter=") {
            flags.filter = Filter::from_name(value);
        } else if token == "--pipe" {
            if let Some(next) = tokens.get(i + 1) {
                flags.pipe = Some(next.clone());
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--pipe=") {
            flags.pipe = Some(value.to_string());
        }
        i += 1;
    }
    flags
}
