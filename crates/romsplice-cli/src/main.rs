use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "romsplice")]
#[command(about = "Binary-patch composition for console ROM images")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the regions described by a layout map
    Inspect {
        /// Layout map file (ROM map CSV, or RAM map with --ram)
        map: PathBuf,
        /// Parse the map as a line-oriented RAM map
        #[arg(long)]
        ram: bool,
        /// Subtract this hex offset from every map address
        #[arg(long, default_value = "0")]
        offset: String,
        /// Only list regions carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Sort order: unsorted, address, or name
        #[arg(long, default_value = "address")]
        order: String,
        /// List the undocumented gaps between regions instead
        #[arg(long)]
        gaps: bool,
    },
    /// Hexdump a slice of an image file
    Hexdump {
        /// Image file
        image: PathBuf,
        /// Start address (hex)
        address: String,
        /// Number of bytes to dump
        #[arg(default_value_t = 256)]
        size: usize,
        /// Suppress the ASCII column
        #[arg(long)]
        no_ascii: bool,
    },
    /// Apply an IPS patch to an image
    Apply {
        /// Base image file
        image: PathBuf,
        /// IPS patch file
        patch: PathBuf,
        /// Where to write the patched image
        output: PathBuf,
    },
    /// Compare two images region by region
    Diff {
        /// Original image
        original: PathBuf,
        /// Modified image
        modified: PathBuf,
        /// Optional ROM map CSV used to label differing regions
        #[arg(short, long)]
        map: Option<PathBuf>,
        /// Subtract this hex offset from every map address
        #[arg(long, default_value = "0")]
        offset: String,
        /// Write the difference as an IPS patch to this path
        #[arg(long)]
        ips: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("romsplice=info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Inspect {
            map,
            ram,
            offset,
            tag,
            order,
            gaps,
        } => commands::inspect::run(&map, ram, &offset, tag.as_deref(), &order, gaps),
        Command::Hexdump {
            image,
            address,
            size,
            no_ascii,
        } => commands::hexdump::run(&image, &address, size, !no_ascii),
        Command::Apply {
            image,
            patch,
            output,
        } => commands::apply::run(&image, &patch, &output),
        Command::Diff {
            original,
            modified,
            map,
            offset,
            ips,
        } => commands::diff::run(&original, &modified, map.as_deref(), &offset, ips.as_deref()),
    }
}
