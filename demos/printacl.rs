//! Example CLI app to read and print the permissions of files.
//!
//! Run with command: `cargo run --example printacl /some/path`
//! Set `RUST_LOG=debug` to see the native calls.

use posix_permissions::{AclError, AclKind, PermissionModel, PermissionProvider};
use std::env::args_os;
use std::path::Path;
use std::process::exit;

fn print_model(model: &PermissionModel) {
    println!("    # owner: {}", model.owner_id());
    println!("    # group: {}", model.group_id());
    for entry in model.entries() {
        println!("    {}", entry);
    }
}

/// Returns 1 for error, 0 for success
fn handle_result(result: Result<PermissionModel, AclError>, path: &Path, kind: AclKind) -> u32 {
    match result {
        Ok(model) => {
            println!("{} {}:", path.display(), kind);
            print_model(&model);
            0
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            1
        }
    }
}

fn main() {
    env_logger::init();

    let args = args_os();
    if args.len() <= 1 {
        println!("Usage: printacl [FILE ...]");
        exit(1);
    }
    let provider = PermissionProvider::native();
    let mut errs = 0;

    for filename in args.skip(1) {
        let path = Path::new(&filename);
        errs += handle_result(provider.read(path, AclKind::Access), path, AclKind::Access);

        // Only directories have "default" ACLs
        if path.is_dir() {
            errs += handle_result(provider.read(path, AclKind::Default), path, AclKind::Default);
        }
    }

    if errs > 0 {
        exit(2);
    }
}
