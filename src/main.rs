//! dawn - inspect EPUB packages

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use dawn::{AttributedString, Epub, Item, Manifest, Metadata, Toc, Version};

#[derive(Parser)]
#[command(name = "dawn")]
#[command(version, about = "Read and write EPUB 2/3 packages", long_about = None)]
#[command(after_help = "EXAMPLES:
    dawn info book.epub          Show version, identifier and counts
    dawn info --json book.epub   Dump the whole document model as JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what a package contains
    Info {
        /// EPUB file to inspect
        #[arg(value_name = "INPUT")]
        input: String,

        /// Print the document model as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// JSON shape of `dawn info --json`.
#[derive(Serialize)]
struct Dump<'e> {
    uid: Option<&'e str>,
    version: Version,
    spine: Vec<&'e str>,
    manifest: &'e Manifest,
    toc: &'e Toc,
    meta: &'e Metadata,
}

impl<'e> Dump<'e> {
    fn new(epub: &'e Epub<'_>) -> Self {
        Dump {
            uid: epub.uid().map(|u| u.value.as_str()),
            version: epub.version(),
            spine: epub.spine.iter().map(|i: &Item| i.id.as_str()).collect(),
            manifest: &epub.manifest,
            toc: &epub.toc,
            meta: &epub.meta,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Info { input, json } => show_info(&input, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(path: &str, json: bool) -> Result<(), String> {
    let epub = dawn::open(path).map_err(|e| e.to_string())?;

    if json {
        let out = serde_json::to_string_pretty(&Dump::new(&epub)).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        print_summary(path, &epub);
    }

    epub.close().map_err(|e| e.to_string())
}

fn print_summary(path: &str, epub: &Epub<'_>) {
    let joined = |values: &[AttributedString]| {
        values
            .iter()
            .map(|v| v.value.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("File: {path}");
    println!("Version: {}", epub.version());
    println!("Package: {}", epub.opf_path());
    if let Some(uid) = epub.uid() {
        println!("Identifier: {uid}");
    }
    if !epub.meta.titles.is_empty() {
        println!("Title: {}", joined(&epub.meta.titles));
    }
    if !epub.meta.creators.is_empty() {
        println!("Creators: {}", joined(&epub.meta.creators));
    }
    if !epub.meta.languages.is_empty() {
        println!("Language: {}", joined(&epub.meta.languages));
    }
    if let Some(ref publisher) = epub.meta.publisher {
        println!("Publisher: {publisher}");
    }
    println!("Manifest items: {}", epub.manifest.len());
    println!("Spine items: {}", epub.spine.len());
    println!("TOC entries: {}", epub.toc.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use dawn::{Mode, OpenOptions};
    use serde_json::json;

    fn sample(version: Version) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        let mut epub = OpenOptions::new()
            .mode(Mode::Write)
            .version(version)
            .open_writer(&mut buf)
            .unwrap();
        let item = epub.write("c1.xhtml", b"<html/>").unwrap();
        epub.spine.push(&item);
        epub.toc.append_with("c1.xhtml", "One", [("c1.xhtml#a", "A")]);
        epub.meta
            .titles
            .push(AttributedString::new("My Book").with("lang", "en"));
        epub.close().unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_json_dump_shape() {
        for (version, name) in [(Version::V2, "2.0"), (Version::V3, "3.0")] {
            let epub = OpenOptions::new()
                .open_reader(Cursor::new(sample(version)))
                .unwrap();
            let dump = serde_json::to_value(Dump::new(&epub)).unwrap();

            assert_eq!(dump["version"], json!(name));
            assert_eq!(dump["uid"], json!(epub.uid().unwrap().value));
            assert_eq!(dump["spine"], json!(["item-0"]));
            assert_eq!(
                dump["manifest"],
                json!({"item-0": {"id": "item-0", "href": "c1.xhtml"}})
            );
            assert_eq!(
                dump["toc"]["entries"],
                json!([{"href": "c1.xhtml", "title": "One", "children": [
                    {"href": "c1.xhtml#a", "title": "A"}
                ]}])
            );
            assert_eq!(
                dump["meta"]["titles"],
                json!([{"value": "My Book", "attrs": {"lang": "en"}}])
            );
            assert!(dump["meta"]["dates"]["modification"].is_string());
        }
    }
}
