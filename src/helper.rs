use std::{
    fs::{read_to_string, OpenOptions},
    io::Write,
    path::Path,
    process::Command,
};

use chrono::{Local, NaiveDate};
use log::{debug, info};
use shell_words::split;
use tempfile::Builder;

use crate::{KeepsakeError, Result};

/// The current calendar date in the local time zone
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Opens the editor on a temporary file seeded with `initial` and returns
/// what the user saved, minus the instruction comments.
pub fn edit_in_editor(editor_cmd: &str, title: &str, initial: &str) -> Result<String> {
    let temp_file = Builder::new().suffix(".txt").tempfile()?;
    let temp_path = temp_file.path().to_path_buf();

    write_editor_template(&temp_path, title, initial)?;

    info!("Opening editor to write diary content. Save and exit when done...");
    launch_editor(editor_cmd, &temp_path)?;

    let content = read_to_string(&temp_path)?;
    Ok(strip_editor_comments(&content))
}

fn write_editor_template(path: &Path, title: &str, initial: &str) -> Result<()> {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;

    writeln!(file, "<!-- {} -->", title)?;
    writeln!(
        file,
        "<!-- Lines that start with <!-- and end with --> are ignored. -->"
    )?;
    writeln!(file, "<!-- Save and exit the editor when you're done. -->")?;
    if !initial.is_empty() {
        writeln!(file, "{}", initial)?;
    }

    Ok(())
}

fn launch_editor(editor_cmd: &str, file_path: &Path) -> Result<()> {
    let args = split(editor_cmd).map_err(|e| KeepsakeError::EditorError {
        message: format!("Failed to parse editor command: {}", e),
    })?;

    let Some((program, rest)) = args.split_first() else {
        return Err(KeepsakeError::EditorError {
            message: "Empty editor command".to_string(),
        });
    };

    debug!("Launching editor {} on {}", program, file_path.display());
    let status = Command::new(program)
        .args(rest)
        .arg(file_path.as_os_str())
        .status()?;

    if !status.success() {
        return Err(KeepsakeError::EditorError {
            message: "Editor exited with non-zero status".to_string(),
        });
    }

    Ok(())
}

/// Drops `<!-- ... -->` instruction lines and trailing blank lines.
pub fn strip_editor_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with("<!--") && line.ends_with("-->"))
        })
        .collect::<Vec<&str>>()
        .join("\n")
        .trim_end()
        .to_string()
}
