use clap::{Parser, Subcommand};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tiif::block::{ContentType, Extension};
use tiif::traverse::{traverse_file, BlockVisit, ReleaseRecord};
use tiif::{Container, FileSource};

#[derive(Parser)]
#[command(name = "tiif", about = "TIIF install-image container inspector and unpacker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the contents of one or more TIIF files
    List {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Dump the collected release headers as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Unpack block bodies and a manifest into a directory tree
    Unpack {
        input: PathBuf,
        /// Destination directory (default: <input>.unpacked)
        #[arg(short = 'C', long)]
        output_dir: Option<PathBuf>,
    },
    /// Show the decoded top-level container header
    Info {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let mut releases: Vec<ReleaseRecord> = Vec::new();
            for path in &input {
                let size = fs::metadata(path)?.len();
                if !json {
                    println!("Listing tiif file: {}, {}kb", path.display(), size / 1024);
                }
                let report = traverse_file(path, &mut |visit| {
                    if !json {
                        print_block_line(visit);
                    }
                    Ok(())
                })?;
                releases.extend(report.releases);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&releases)?);
            } else {
                for release in &releases {
                    println!(
                        "{}: {}.{:02}-{} {} '{}'",
                        release.container,
                        release.major,
                        release.minor,
                        release.build_number,
                        release.build_id,
                        release.products.join(", "),
                    );
                }
            }
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir } => {
            let root = output_dir.unwrap_or_else(|| {
                let name = input
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "tiif".to_owned());
                PathBuf::from(format!("{name}.unpacked"))
            });
            traverse_file(&input, &mut |visit| {
                let dir = block_dir(&root, visit.container);
                append_manifest(&dir, visit)?;
                save_block(&dir, visit)
            })?;
            println!("Unpacked tiif file to directory: {}", root.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let container = Container::open(FileSource::open(&input)?)?;
            let header = container.header();
            println!("── TIIF container ──────────────────────────────────────");
            println!("  Path        {}", input.display());
            println!("  Version     {}", header.version);
            println!("  Header len  {} B", header.header_len);
            println!("  Body len    {} B", header.body_len);
            println!("  Header CRC  {:#010x}", header.header_crc);
            println!("  Body CRC    {:#010x}", header.body_crc);
        }
    }

    Ok(())
}

// ── Listing ───────────────────────────────────────────────────────────────────

fn print_block_line(visit: &BlockVisit<'_>) {
    let name_width = 24usize.saturating_sub(visit.depth * 2);
    print!(
        "{}{:<name_width$} {:<24} ",
        "  ".repeat(visit.depth),
        visit.block.name,
        visit.block.content_type.label(),
    );
    let size = u64::from(visit.block.body_len);
    if size < 9 * 1024 * 1024 {
        print!("{:>4}k ", size / 1024);
    } else {
        print!("{:>4}M ", size / (1024 * 1024));
    }
    match &visit.block.extension {
        Some(Extension::ReleaseHeader {
            major,
            minor,
            build_number,
            date,
            build_id,
        }) => {
            let products = visit
                .block
                .products
                .as_deref()
                .unwrap_or_default()
                .join(", ");
            println!(
                "{:<10} {:<36} {}    '{}'",
                format_version(*major, *minor, *build_number),
                build_id,
                format_date(*date),
                products,
            );
        }
        Some(Extension::SoftwareBlob {
            major,
            minor,
            build_number,
            build_id,
        }) => {
            println!(
                "{:<10} {:<36}",
                format_version(*major, *minor, *build_number),
                build_id,
            );
        }
        None => println!(),
    }
}

fn format_version(major: u8, minor: u8, build_number: u16) -> String {
    format!("{major:>2}.{minor:02}-{build_number}")
}

fn format_date(epoch: i64) -> String {
    match chrono::DateTime::from_timestamp(epoch, 0) {
        Some(date) => format!("{} UTC", date.format("%a %b %e %H:%M:%S %Y")),
        None => format!("@{epoch}"),
    }
}

// ── Unpacking ─────────────────────────────────────────────────────────────────

/// Directory for a block, mirroring the embedded-container nesting.  The
/// first path segment is the top-level file name and stays out of the tree.
fn block_dir(root: &Path, container: &str) -> PathBuf {
    let mut dir = root.to_path_buf();
    for segment in container.split('/').skip(1) {
        dir.push(segment.replace(' ', "_"));
    }
    dir
}

fn append_manifest(dir: &Path, visit: &BlockVisit<'_>) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join("manifest");
    // The first block of each container starts its manifest fresh.
    let mut file = if visit.block.index == 0 {
        File::create(path)?
    } else {
        OpenOptions::new().append(true).create(true).open(path)?
    };

    let tag = visit.block.content_type.label().replace(' ', "_");
    let mut line = |text: String| writeln!(file, "{}: {}: {}", visit.block.index, tag, text);
    match &visit.block.extension {
        Some(Extension::ReleaseHeader {
            major,
            minor,
            build_number,
            date,
            build_id,
        }) => {
            line(format!("name: {}", visit.block.name))?;
            line(format!(
                "version: {}",
                format_version(*major, *minor, *build_number)
            ))?;
            line(format!("build_id: {build_id}"))?;
            line(format!("date: {}", format_date(*date)))?;
            if let Some(products) = &visit.block.products {
                line(format!("products: {}", products.join(",")))?;
            }
        }
        Some(Extension::SoftwareBlob {
            major,
            minor,
            build_number,
            build_id,
        }) => {
            line(format!(
                "version: {}",
                format_version(*major, *minor, *build_number)
            ))?;
            line(format!("build_id: {build_id}"))?;
        }
        None => {}
    }
    // Decimal, for manifest compatibility with existing tooling.
    line(format!("crc: {}", visit.block.body_crc))
}

fn save_block(dir: &Path, visit: &BlockVisit<'_>) -> io::Result<()> {
    // Release headers are metadata and embedded containers unpack into their
    // own subdirectories; neither body lands on disk verbatim.
    if matches!(
        visit.block.content_type,
        ContentType::ReleaseHeader | ContentType::EmbeddedContainer
    ) {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(visit.block.name.replace(' ', "_"));
    fs::write(path, visit.body)
}
