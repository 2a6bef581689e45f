//! chapterize - split unpacked ebook content into chapter fragments

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use chapterize::util::slugify;
use chapterize::{Document, nav, segment};

#[derive(Parser)]
#[command(name = "chapterize")]
#[command(version, about = "Split ebook content documents into chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    chapterize book.json                 Write chapters next to the manifest
    chapterize book.json -o out/         Write chapters under out/")]
struct Cli {
    /// Book manifest (JSON) listing reading order, navigation, and images
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Directory to write chapter fragments and renamed images into
    #[arg(short, long, default_value = "chapters")]
    output: PathBuf,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

/// On-disk description of one unpacked book.
#[derive(Deserialize)]
struct Manifest {
    title: String,
    /// Content files in reading order, relative to the manifest.
    files: Vec<String>,
    navigation: Vec<ManifestEntry>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
struct ManifestEntry {
    title: String,
    /// `file#fragment` href; the fragment is the chapter anchor.
    href: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let raw = fs::read_to_string(&cli.manifest)
        .map_err(|e| format!("{}: {e}", cli.manifest.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&raw).map_err(|e| format!("{}: {e}", cli.manifest.display()))?;
    let base = cli.manifest.parent().unwrap_or(Path::new("."));

    let mut documents = HashMap::new();
    for file in &manifest.files {
        let source =
            fs::read_to_string(base.join(file)).map_err(|e| format!("{file}: {e}"))?;
        let doc = Document::parse(file.as_str(), &source).map_err(|e| e.to_string())?;
        documents.insert(file.clone(), doc);
    }

    let mut images = HashMap::new();
    for name in &manifest.images {
        let bytes = fs::read(base.join(name)).map_err(|e| format!("{name}: {e}"))?;
        images.insert(name.clone(), bytes);
    }

    let navigation = nav::group_by_file(
        manifest
            .navigation
            .iter()
            .map(|e| (e.title.clone(), e.href.clone())),
    );

    let result = segment(&manifest.files, &documents, &images, &navigation)
        .map_err(|e| e.to_string())?;

    let book_dir = cli.output.join(slugify(&manifest.title));
    fs::create_dir_all(&book_dir).map_err(|e| format!("{}: {e}", book_dir.display()))?;

    for (order, chapter) in result.chapters.iter().enumerate() {
        let path = book_dir.join(format!("{:03}-{}.xhtml", order, slugify(&chapter.title)));
        fs::write(&path, &chapter.content).map_err(|e| format!("{}: {e}", path.display()))?;
    }

    for (original, canonical) in &result.rename_map {
        if let Some(bytes) = images.get(original) {
            let path = book_dir.join(canonical);
            fs::write(&path, bytes).map_err(|e| format!("{}: {e}", path.display()))?;
        }
    }

    if !cli.quiet {
        println!(
            "{}: {} chapters, {} images -> {}",
            manifest.title,
            result.chapters.len(),
            result.rename_map.len(),
            book_dir.display()
        );
    }

    Ok(())
}
