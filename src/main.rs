//! One-shot CLI dispatcher: open an image, print its FAT variant, run
//! exactly one action, print the resulting fragmentation percentage.
//!
//! Reworks the teacher's `examples/fat32-fs-std/src/main.rs` interactive
//! shell (built on `clap`'s builder API) into a single-shot dispatcher
//! using `clap`'s derive API, in the shape `fat32expander`'s CLI uses.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use fatimg_fix::dirparser::DirHandle;
use fatimg_fix::direntry::DirectoryEntry;
use fatimg_fix::{FileSystem, FsError};

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "snake_case")]
enum Action {
    Tree,
    Fragmentation,
    Defragmentation,
    ErrorFatTable,
    ErrorLoopedFile,
    ErrorIntersectedFiles,
}

#[derive(Parser, Debug)]
#[command(name = "fatimg-fix", about = "Index, repair, and defragment FAT16/FAT32 disk images in place")]
struct Cli {
    /// Path to the FAT16/FAT32 disk image.
    image_path: String,

    /// Which action to run against the image.
    action: Action,

    /// Target directory for actions that plant a directory entry
    /// (error_looped_file, error_intersected_files). Required for those
    /// two actions; value `\` denotes the root.
    #[arg(long)]
    folder: Option<String>,

    /// FAT copy index used by error_fat_table (the mirror to diverge).
    /// Required for that action.
    #[arg(long)]
    fat_num: Option<u8>,

    /// Random seed driving any pseudo-random action.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(50);
        }
    };

    let required = match cli.action {
        Action::ErrorLoopedFile | Action::ErrorIntersectedFiles => cli.folder.clone().map(RequiredArg::Folder),
        Action::ErrorFatTable => cli.fat_num.map(RequiredArg::FatNum),
        _ => Some(RequiredArg::None),
    };
    let required = match required {
        Some(r) => r,
        None => {
            eprintln!("error: {:?} requires --folder or --fat_num as appropriate", cli.action);
            return ExitCode::from(50);
        }
    };

    match run(&cli, required) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

enum RequiredArg {
    None,
    Folder(String),
    FatNum(u8),
}

fn run(cli: &Cli, required: RequiredArg) -> anyhow::Result<()> {
    let mut fs = FileSystem::open(&cli.image_path).with_context(|| format!("opening {}", cli.image_path))?;
    println!("FAT variant: {:?}", fs.geometry.variant);

    match (cli.action, required) {
        (Action::Tree, _) => print_tree(&mut fs)?,
        (Action::Fragmentation, _) => {}
        (Action::Defragmentation, _) => fs.defragment().context("defragmenting image")?,
        (Action::ErrorFatTable, RequiredArg::FatNum(fat_num)) => fs
            .inject_mirror_divergence(fat_num)
            .context("injecting FAT mirror divergence")?,
        (Action::ErrorLoopedFile, RequiredArg::Folder(folder)) => fs
            .inject_looped_file(&folder)
            .context("injecting looped file")?,
        (Action::ErrorIntersectedFiles, RequiredArg::Folder(folder)) => fs
            .inject_intersecting_files(&folder)
            .context("injecting intersecting files")?,
        _ => unreachable!("argument requiredness already validated in main()"),
    }

    let fragmentation = fs.fragmentation_percent().context("computing fragmentation_data")?;
    println!("fragmentation_data: {fragmentation:.2}%");

    Ok(())
}

fn print_tree(fs: &mut FileSystem) -> Result<(), FsError> {
    let root = match fs.geometry.variant {
        fatimg_fix::geometry::FatVariant::Fat16 => DirHandle::FixedRoot,
        fatimg_fix::geometry::FatVariant::Fat32 => DirHandle::Cluster(fs.geometry.root_cluster),
    };
    println!("\\");
    print_dir(fs, root, 1)
}

fn print_dir(fs: &mut FileSystem, handle: DirHandle, depth: usize) -> Result<(), FsError> {
    let mut entries = fatimg_fix::dirparser::parse_dir(&mut fs.io, &fs.geometry, handle)?;
    entries.retain(|e| !e.is_dot_or_dotdot());
    entries.sort_by(|a, b| {
        b.is_directory()
            .cmp(&a.is_directory())
            .then_with(|| a.display_name().cmp(&b.display_name()))
    });

    for entry in &entries {
        print_entry_line(entry, depth);
        if entry.is_directory() && entry.first_cluster != 0 {
            print_dir(fs, DirHandle::Cluster(entry.first_cluster), depth + 1)?;
        }
    }
    Ok(())
}

fn print_entry_line(entry: &DirectoryEntry, depth: usize) {
    println!("{}{}", "  ".repeat(depth), entry.display_name());
}
