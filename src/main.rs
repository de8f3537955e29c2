//! heapdb - command-line tool for heap record files

use anyhow::Result;
use clap::{Parser, Subcommand};
use heapdb::access::{HeapFile, Rid};
use heapdb::storage::PageId;
use std::path::PathBuf;

/// Manage heap files of variable-length records
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Heap file to operate on
    file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new, empty heap file
    Create,
    /// Remove a heap file from disk
    Destroy,
    /// Insert a record and print its Rid
    Insert {
        /// Record payload (stored as raw bytes)
        value: String,
    },
    /// Fetch one record by its Rid
    Get {
        page: u32,
        slot: u16,
    },
    /// Delete one record by its Rid
    Delete {
        page: u32,
        slot: u16,
    },
    /// List every valid record in the file
    Scan,
    /// Print page and record counts
    Stats,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Create => {
            HeapFile::create(&args.file)?.close()?;
            println!("created {}", args.file.display());
        }
        Command::Destroy => {
            HeapFile::destroy(&args.file)?;
            println!("destroyed {}", args.file.display());
        }
        Command::Insert { value } => {
            let mut heap = HeapFile::open(&args.file)?;
            let rid = heap.insert(value.as_bytes())?;
            heap.close()?;
            println!("inserted at {}", rid);
        }
        Command::Get { page, slot } => {
            let heap = HeapFile::open(&args.file)?;
            let record = heap.get(Rid::new(PageId(page), slot))?;
            println!("{}", String::from_utf8_lossy(&record.data));
        }
        Command::Delete { page, slot } => {
            let mut heap = HeapFile::open(&args.file)?;
            heap.delete(Rid::new(PageId(page), slot))?;
            heap.close()?;
            println!("deleted ({}, {})", page, slot);
        }
        Command::Scan => {
            let heap = HeapFile::open(&args.file)?;
            let mut count = 0;
            for record in heap.scan() {
                let record = record?;
                println!(
                    "{}: {}",
                    record.rid,
                    String::from_utf8_lossy(&record.data)
                );
                count += 1;
            }
            println!("{} record(s)", count);
        }
        Command::Stats => {
            let heap = HeapFile::open(&args.file)?;
            let mut records = 0;
            for record in heap.scan() {
                record?;
                records += 1;
            }
            println!("pages:   {}", heap.num_pages()?);
            println!("records: {}", records);
        }
    }

    Ok(())
}
