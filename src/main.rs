use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use findbar::page::{load_document, render_page};
use findbar::{
    ActivationCommand, ContentScript, FileSettingsStore, KeyEvent, OverlayControl, Settings,
    SettingsStore, Shortcut,
};
use findbar_search::Document;
use log::{error, info};

#[derive(Parser)]
#[command(name = "findbar")]
#[command(about = "Regex find bar over a text page", long_about = None)]
#[command(version)]
struct Cli {
    /// Text file loaded as the page, one paragraph per blank-line block
    page: PathBuf,

    /// Open the find bar with this query
    #[arg(long)]
    query: Option<String>,

    /// Toggle shortcut for this session, e.g. `ctrl-shift-f`
    #[arg(long)]
    shortcut: Option<String>,

    /// Settings file to use instead of the platform config location
    #[arg(long)]
    settings: Option<PathBuf>,
}

enum Step {
    Continue,
    Quit,
}

fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()) {
        error!("{:#}", err);
        eprintln!("findbar: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut doc = load_document(&cli.page)?;
    let store = match cli.settings {
        Some(path) => FileSettingsStore::new(path),
        None => FileSettingsStore::from_default_location(),
    };
    if let Some(path) = store.path() {
        info!("Using settings at {}", path.display());
    }

    let mut script = ContentScript::bootstrap(&mut doc, store);
    if let Some(trigger) = cli.shortcut.as_deref() {
        let shortcut = Shortcut::parse_trigger(trigger)
            .map_err(anyhow::Error::msg)
            .context("invalid --shortcut")?;
        let settings = Settings { shortcut };
        if !script.apply_settings(&mut doc, settings) {
            anyhow::bail!("--shortcut `{}` needs at least one modifier", trigger);
        }
    }
    if let Some(query) = cli.query {
        script.dispatch(
            &mut doc,
            ActivationCommand::OpenSearch { query: Some(query) },
        );
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    print_state(&mut stdout, &doc, &script)?;

    for line in stdin.lock().lines() {
        let line = line.context("failed to read command")?;
        let step = execute(&mut doc, &mut script, &mut stdout, &line)?;
        script.overlay_mut().run_animation_frame(&mut doc);
        script.poll_settings(&mut doc);
        if matches!(step, Step::Quit) {
            break;
        }
        print_state(&mut stdout, &doc, &script)?;
    }

    Ok(())
}

fn execute(
    doc: &mut Document,
    script: &mut ContentScript<FileSettingsStore>,
    out: &mut impl Write,
    line: &str,
) -> Result<Step> {
    let Some(command) = line.strip_prefix(':') else {
        if script.overlay().is_open() {
            script.overlay_mut().handle_input(doc, line);
        } else {
            writeln!(out, "find bar is closed; use :open or :toggle")?;
        }
        return Ok(Step::Continue);
    };

    let (name, argument) = match command.split_once(' ') {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };

    match name {
        "toggle" => script.dispatch(doc, ActivationCommand::ToggleSearch),
        "open" => script.dispatch(
            doc,
            ActivationCommand::OpenSearch {
                query: Some(argument.to_string()),
            },
        ),
        "close" => script.overlay_mut().click(doc, OverlayControl::Close),
        "next" => {
            script
                .overlay_mut()
                .handle_input_key(doc, &KeyEvent::new("Enter"));
        }
        "prev" => {
            script
                .overlay_mut()
                .handle_input_key(doc, &KeyEvent::new("Enter").shifted());
        }
        "escape" => {
            script.handle_keydown(doc, &KeyEvent::new("Escape"));
        }
        "click-outside" => {
            let target = doc.children(doc.body()).first().copied();
            script.overlay_mut().handle_pointer_down(doc, target);
        }
        "key" => match Shortcut::parse_trigger(argument) {
            Ok(shortcut) => {
                if !script.handle_keydown(doc, &KeyEvent::from(&shortcut)) {
                    writeln!(out, "`{}` is not bound", shortcut.display_label())?;
                }
            }
            Err(message) => writeln!(out, "{}", message)?,
        },
        "save-shortcut" => match Shortcut::parse_trigger(argument) {
            Ok(shortcut) => {
                if let Err(message) = shortcut.validate() {
                    writeln!(out, "{}", message)?;
                } else if let Err(err) = script.store().save(&Settings { shortcut }) {
                    writeln!(out, "could not save settings: {}", err)?;
                }
            }
            Err(message) => writeln!(out, "{}", message)?,
        },
        "show" => {}
        "quit" | "q" => return Ok(Step::Quit),
        other => writeln!(out, "unknown command `:{}`", other)?,
    }

    Ok(Step::Continue)
}

fn print_state(
    out: &mut impl Write,
    doc: &Document,
    script: &ContentScript<FileSettingsStore>,
) -> Result<()> {
    let overlay = script.overlay();
    let state = if overlay.is_open() { "open" } else { "closed" };
    writeln!(
        out,
        "[{}] {} | query: {:?} | shortcut: {}",
        state,
        overlay.status_text(),
        overlay.query(doc),
        script.settings().shortcut.display_label()
    )?;
    if let Some(message) = overlay.error() {
        writeln!(out, "error: {}", message)?;
    }
    writeln!(out, "{}", render_page(doc))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use findbar::page::document_from_text;
    use findbar::shortcuts::MISSING_MODIFIER_MESSAGE;

    fn session(dir: &tempfile::TempDir) -> (Document, ContentScript<FileSettingsStore>) {
        let mut doc = document_from_text("Foo fighters find foo.");
        let store = FileSettingsStore::new(dir.path().join("settings.json"));
        let script = ContentScript::bootstrap(&mut doc, store);
        (doc, script)
    }

    fn run_command(
        doc: &mut Document,
        script: &mut ContentScript<FileSettingsStore>,
        line: &str,
    ) -> String {
        let mut out = Vec::new();
        execute(doc, script, &mut out, line).expect("command runs");
        String::from_utf8(out).expect("utf-8 output")
    }

    #[test]
    fn save_shortcut_rejects_missing_modifier() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut doc, mut script) = session(&dir);

        let output = run_command(&mut doc, &mut script, ":save-shortcut k");
        assert_eq!(output.trim(), MISSING_MODIFIER_MESSAGE);
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn save_shortcut_persists_valid_trigger() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut doc, mut script) = session(&dir);

        let output = run_command(&mut doc, &mut script, ":save-shortcut alt-k");
        assert!(output.is_empty());
        assert!(script.poll_settings(&mut doc));
        let shortcut = &script.settings().shortcut;
        assert_eq!(shortcut.key, "K");
        assert!(shortcut.alt_key);
    }
}
