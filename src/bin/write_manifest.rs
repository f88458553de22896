//! Manifest utility for xtalclass model directories.
//!
//! Records the SHA-256 digest of `label_encoders.json` and `model.json` in
//! `manifest.json`, which the application checks at startup.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin write_manifest -- <model_dir> [--check]
//! ```
//!
//! With `--check` the existing manifest is verified instead of rewritten.

use std::env;
use std::fs;
use std::path::PathBuf;

use xtalclass::adapters::artifacts::{build_manifest, verify_manifest, MANIFEST_FILE};

fn usage() -> String {
    "Usage: write_manifest <model_dir> [--check]".to_string()
}

fn parse_args() -> Result<(PathBuf, bool), String> {
    let mut model_dir: Option<PathBuf> = None;
    let mut check = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--check" => check = true,
            "-h" | "--help" => return Err(usage()),
            _ => {
                if model_dir.is_none() {
                    model_dir = Some(PathBuf::from(arg));
                } else {
                    return Err(usage());
                }
            }
        }
    }

    let model_dir = model_dir.ok_or_else(usage)?;
    Ok((model_dir, check))
}

fn main() -> Result<(), String> {
    let (model_dir, check) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
            .to_path_buf()
    } else {
        model_dir
    };

    if check {
        let manifest = verify_manifest(&model_dir, true).map_err(|e| e.to_string())?;
        let count = manifest.map_or(0, |m| m.files.len());
        println!("OK: {count} artifact digests match in {model_dir:?}");
        return Ok(());
    }

    let manifest = build_manifest(&model_dir).map_err(|e| e.to_string())?;
    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize manifest: {e}"))?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, json)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Wrote {manifest_path:?}");
    for (name, digest) in &manifest.files {
        println!("  {name}: {digest}");
    }

    Ok(())
}
