//! # Encrypted Virtual File System CLI
//!
//! A small command-line front end over [`cryptfs_core::FileSystemCore`],
//! backed by [`cryptfs_core::LocalAdapter`] (an on-disk `StorageAdapter`).
//! Exists so the crate is runnable and testable standalone; production
//! users are expected to embed `FileSystemCore` directly against their own
//! adapter rather than shell out to this binary.
//!
//! ## Usage
//!
//! ```bash
//! cryptfs-cli <store-dir> <derivation-key> <command> [args...]
//! ```
//!
//! ### Commands
//!
//! * `mkdir <path/>`            - create a folder
//! * `mkdir-z <path/>`          - create a folder with compressed records
//! * `touch <path>`             - create an empty file
//! * `put <path> <local-file>`  - write a local file's bytes into `path`
//! * `get <path> <local-file>`  - read `path`'s bytes out to a local file
//! * `ls <path/>`               - list a folder's children
//! * `rm <path>`                - delete a file
//! * `rmdir <path/>`            - delete an empty folder
//! * `mv <src> <dst>`           - rename/move a file or folder
//! * `cp <src> <dst>`           - copy a file or folder
//! * `clear`                    - drain and delete everything under the root
//!
//! ### Example
//!
//! ```bash
//! cryptfs-cli /var/lib/cryptfs "correct horse battery staple" mkdir /docs/
//! cryptfs-cli /var/lib/cryptfs "correct horse battery staple" put /docs/a.txt ./a.txt
//! ```

use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cryptfs_core::{FileSystemCore, LocalAdapter, StorageAdapter};

/// Parses arguments, initializes the core over a [`LocalAdapter`] rooted at
/// `store-dir`, and dispatches a single command.
///
/// # Panics
///
/// Will panic if required arguments are missing or a command name is
/// unrecognized; any operational failure (path errors, crypto errors,
/// adapter I/O errors) is reported and turns into a non-zero exit code
/// instead of a panic.
fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "usage: cryptfs-cli <store-dir> <derivation-key> <command> [args...]\n\
             commands: mkdir mkdir-z touch put get ls rm rmdir mv cp clear"
        );
        return ExitCode::FAILURE;
    }

    let store_dir = PathBuf::from(&args[1]);
    let derivation_key = args[2].as_bytes();
    let command = args[3].as_str();
    let rest = &args[4..];

    let adapter: Arc<dyn StorageAdapter> = match LocalAdapter::new(&store_dir) {
        Ok(a) => Arc::new(a),
        Err(e) => {
            eprintln!("failed to open store at {store_dir:?}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let core = match FileSystemCore::init(adapter, derivation_key, Default::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to initialize encrypted file system: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run_command(&core, command, rest) {
        eprintln!("{command} failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run_command(core: &FileSystemCore, command: &str, rest: &[String]) -> cryptfs_core::CoreResult<()> {
    match (command, rest) {
        ("mkdir", [path]) => core.create_folder(path, None),
        ("mkdir-z", [path]) => core.create_folder_compressed(path, None),
        ("touch", [path]) => core.create_file(path, None),
        ("put", [path, local]) => {
            let mut file = File::open(local)?;
            core.set_file_data(path, &mut file, None)
        }
        ("get", [path, local]) => {
            let mut stream = core.get_file_data(path, None)?;
            let mut out = File::create(local)?;
            std::io::copy(&mut stream, &mut out)?;
            Ok(())
        }
        ("ls", [path]) => {
            for item in core.list_folder(path, None)? {
                match item {
                    cryptfs_core::ListItem::Folder(record) => println!("{}/", record.name),
                    cryptfs_core::ListItem::File(record) => println!("{}", record.name),
                    cryptfs_core::ListItem::Error(e) => eprintln!("  <error: {e}>"),
                }
            }
            Ok(())
        }
        ("rm", [path]) => core.delete_file(path),
        ("rmdir", [path]) => core.delete_folder(path),
        ("mv", [src, dst]) => {
            if src.ends_with('/') {
                core.move_folder(src, dst)
            } else {
                core.move_file(src, dst)
            }
        }
        ("cp", [src, dst]) => {
            if src.ends_with('/') {
                core.copy_folder(src, dst)
            } else {
                core.copy_file(src, dst)
            }
        }
        ("clear", []) => core.clear(None),
        _ => {
            eprintln!("unrecognized command or wrong argument count: {command}");
            std::process::exit(2);
        }
    }
}
