//! feishu2mp CLI - publish Feishu Markdown to WeChat HTML and download bundles

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use feishu2mp::{
    find_theme_file, validate_https, DirectoryImageSource, ImageSource, JsonFormat,
    MemoryImageSource, Publisher, ThemeStore, TokenRewrite, DEFAULT_THEME_FILE,
};

#[derive(Parser)]
#[command(name = "feishu2mp")]
#[command(version)]
#[command(about = "Publish Feishu documents as WeChat HTML or Markdown bundles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Markdown to WeChat-ready HTML
    Html {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Theme file (searched in the current directory and its parent if not given)
        #[arg(long, value_name = "PATH", env = "FEISHU2MP_THEME")]
        theme: Option<PathBuf>,

        /// Directory holding images named after their tokens
        #[arg(long, value_name = "DIR", env = "FEISHU2MP_IMAGE_DIR")]
        images: Option<PathBuf>,

        /// Do not insert spaces between CJK and Latin text
        #[arg(long)]
        no_auto_space: bool,
    },

    /// Build a download bundle (<id>.md or <id>.zip)
    Bundle {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Document id used for file names (defaults to the input file stem)
        #[arg(long, value_name = "DOC_ID")]
        id: Option<String>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Directory holding images named after their tokens
        #[arg(long, value_name = "DIR", env = "FEISHU2MP_IMAGE_DIR")]
        images: Option<PathBuf>,

        /// Rewrite every occurrence of an image token, not just the first
        #[arg(long)]
        all_occurrences: bool,
    },

    /// Export Markdown with inlined images as JSON
    Json {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory holding images named after their tokens
        #[arg(long, value_name = "DIR", env = "FEISHU2MP_IMAGE_DIR")]
        images: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the effective theme as JSON
    Theme {
        /// Theme file (searched in the current directory and its parent if not given)
        #[arg(long, value_name = "PATH", env = "FEISHU2MP_THEME")]
        theme: Option<PathBuf>,

        /// Theme file name to search for
        #[arg(long, default_value = DEFAULT_THEME_FILE)]
        name: String,
    },

    /// Check that an image URL is absolute and print its HTTPS form
    CheckUrl {
        /// URL to check
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Html {
            input,
            output,
            theme,
            images,
            no_auto_space,
        } => cmd_html(
            &input,
            output.as_deref(),
            theme.as_deref(),
            images.as_deref(),
            no_auto_space,
        ),
        Commands::Bundle {
            input,
            id,
            output,
            images,
            all_occurrences,
        } => cmd_bundle(
            &input,
            id.as_deref(),
            output.as_deref(),
            images.as_deref(),
            all_occurrences,
        ),
        Commands::Json {
            input,
            output,
            images,
            compact,
        } => cmd_json(&input, output.as_deref(), images.as_deref(), compact),
        Commands::Theme { theme, name } => cmd_theme(theme.as_deref(), &name),
        Commands::CheckUrl { url } => cmd_check_url(&url),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn image_source(images: Option<&Path>) -> Box<dyn ImageSource> {
    match images {
        Some(dir) => Box::new(DirectoryImageSource::new(dir)),
        None => Box::new(MemoryImageSource::new()),
    }
}

/// Explicit theme path, or `name` found in `base` or its parent.
fn theme_path(explicit: Option<&Path>, base: &Path, name: &str) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| find_theme_file(base, name))
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_html(
    input: &Path,
    output: Option<&Path>,
    theme: Option<&Path>,
    images: Option<&Path>,
    no_auto_space: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let markdown = fs::read_to_string(input)?;
    let publisher = Publisher::new().with_auto_space(!no_auto_space);

    // A broken theme file degrades to the built-in theme
    let cwd = std::env::current_dir()?;
    if let Some(path) = theme_path(theme, &cwd, DEFAULT_THEME_FILE) {
        if let Err(e) = publisher.load_theme(&path) {
            eprintln!("{} {}", "Warning:".yellow(), e);
        }
    }

    let source = image_source(images);
    let html = publisher.publish_html(&markdown, &*source);
    write_or_print(output, &html)
}

fn cmd_bundle(
    input: &Path,
    id: Option<&str>,
    output: Option<&Path>,
    images: Option<&Path>,
    all_occurrences: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let markdown = fs::read_to_string(input)?;
    let document_id = match id {
        Some(id) => id.to_string(),
        None => input
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned(),
    };

    let rewrite = if all_occurrences {
        TokenRewrite::AllOccurrences
    } else {
        TokenRewrite::FirstOccurrence
    };
    let publisher = Publisher::new().with_token_rewrite(rewrite);

    let source = image_source(images);
    let bundle = publisher.download_bundle(&markdown, &*source, &document_id)?;

    let output_dir = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;
    let path = bundle.write_to(&output_dir)?;

    println!("{} {}", "Saved to".green(), path.display());
    for entry in bundle.entries() {
        println!("  {} {}", "├─".dimmed(), entry.name);
    }
    Ok(())
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    images: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let markdown = fs::read_to_string(input)?;
    let doc_token = input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();

    let source = image_source(images);
    let export = Publisher::new().markdown_export(&markdown, &*source, &doc_token);

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = feishu2mp::render::to_json(&export, format)?;
    write_or_print(output, &json)
}

fn cmd_theme(theme: Option<&Path>, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = ThemeStore::new();
    let cwd = std::env::current_dir()?;
    match theme_path(theme, &cwd, name) {
        Some(path) => {
            store.load_from(&path)?;
            eprintln!("{} {}", "Loaded".green(), path.display());
        }
        None => eprintln!("{}", "Using built-in theme".dimmed()),
    }

    println!("{}", store.snapshot().to_json()?);
    Ok(())
}

fn cmd_check_url(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let normalized = validate_https(url)?;
    println!("{} {}", "OK".green().bold(), normalized);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "feishu2mp".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Feishu to WeChat publishing tool");
}
