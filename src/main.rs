//! acme-select - replace a selection with transformed text.
//!
//! # Usage
//!
//! ```bash
//! acme-select --addr '#6,#11' --filter upper notes.txt
//! acme-select --addr '#0,$' --pipe 'fmt -w 72' notes.txt
//! acme-select --filter sort-lines --print list.txt
//! ```

use std::convert::Infallible;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use acme_select::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use acme_select::replace_selection;
use acme_select::transform::{Filter, ShellFilter};
use acme_select::window::{CTL_DOT_ADDR, EditorClient, EditorWindow, MemoryEditor};

/// Replace a selection with the output of a filter and leave it selected
#[derive(Parser, Debug)]
#[command(name = "acme-select", version, about, long_about = None)]
struct Cli {
    /// File to edit
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Selection as an address expression (#n, #n,#m, 0, $)
    #[arg(short, long, value_name = "EXPR", default_value = ",")]
    addr: String,

    /// Built-in transformation to apply
    #[arg(long, value_enum, conflicts_with = "pipe")]
    filter: Option<Filter>,

    /// Shell command to pipe the selection through
    #[arg(long, value_name = "CMD")]
    pipe: Option<String>,

    /// Write the result to stdout instead of back to FILE
    #[arg(long)]
    print: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let content = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let editor = MemoryEditor::new();
    let win_id = editor.create_window(&content);
    select(&editor, win_id, &cli.addr)
        .with_context(|| format!("Failed to select {}", cli.addr))?;

    let result = match (&effective.pipe, effective.filter) {
        (Some(command), _) => {
            let shell = ShellFilter::new(command.as_str());
            replace_selection(&editor, win_id, |s| shell.run(s))
        }
        (None, Some(filter)) => {
            replace_selection(&editor, win_id, |s| Ok::<_, Infallible>(filter.apply(s)))
        }
        (None, None) => anyhow::bail!("no transformation given: pass --filter or --pipe"),
    };
    result.context("Failed to replace selection")?;

    let body = editor.body(win_id).unwrap_or_default();
    if effective.print {
        std::io::stdout()
            .write_all(body.as_bytes())
            .context("Failed to write to stdout")?;
    } else {
        std::fs::write(&cli.file, &body)
            .with_context(|| format!("Failed to write {}", cli.file.display()))?;
    }

    if let Some(dot) = editor.dot(win_id) {
        eprintln!("{}:{dot}", cli.file.display());
    }
    Ok(())
}

/// Select `expr` in the window the way a plumbing client would: set addr,
/// then copy it to dot.
fn select(editor: &MemoryEditor, win_id: usize, expr: &str) -> Result<()> {
    let mut win = editor.open(win_id)?;
    win.addr(expr)?;
    win.ctl(CTL_DOT_ADDR)?;
    Ok(())
}
