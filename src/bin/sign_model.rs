//! Model signing utility for NephroCheck classifier artifacts.
//!
//! # Usage
//!
//! ```bash
//! # Generate a signing seed (0600) and print the verifying key
//! cargo run --bin sign_model -- keygen <seed.b64> [--out-pub <pub.b64>] [--force]
//!
//! # Write manifest.json (binding every *.json in the directory) and model.sig
//! cargo run --bin sign_model -- sign <model_dir> <seed.b64>
//! ```
//!
//! The verifying key printed by `keygen` goes into
//! `NEPHRO_MODEL_SIGNING_PUBKEY_B64` (or a file named by
//! `NEPHRO_MODEL_SIGNING_PUBKEY_B64_FILE`). Seed bytes are zeroized after use.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use nephrocheck::adapters::xgboost::manifest::{
    sha256_hex, ModelManifest, MANIFEST_FILE, MANIFEST_VERSION, SIGNATURE_FILE,
};
use nephrocheck::adapters::xgboost::MODEL_FILE;

const USAGE: &str = "Usage:\n  sign_model keygen <seed_out> [--out-pub <path>] [--force]\n  sign_model sign <model_dir> <seed_file>";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Keygen {
        seed_out: PathBuf,
        pub_out: Option<PathBuf>,
        force: bool,
    },
    Sign {
        model_dir: PathBuf,
        seed_file: PathBuf,
    },
}

fn parse_args() -> Result<Command, String> {
    let mut args = env::args().skip(1);
    let sub = args.next().ok_or_else(|| USAGE.to_string())?;

    match sub.as_str() {
        "keygen" => {
            let mut seed_out = None;
            let mut pub_out = None;
            let mut force = false;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--out-pub" => {
                        pub_out = Some(PathBuf::from(
                            args.next().ok_or_else(|| USAGE.to_string())?,
                        ));
                    }
                    "--force" => force = true,
                    _ if seed_out.is_none() && !arg.starts_with('-') => {
                        seed_out = Some(PathBuf::from(arg));
                    }
                    _ => return Err(format!("Unknown arg: {arg}\n{USAGE}")),
                }
            }
            Ok(Command::Keygen {
                seed_out: seed_out.ok_or_else(|| USAGE.to_string())?,
                pub_out,
                force,
            })
        }
        "sign" => {
            let model_dir = args.next().ok_or_else(|| USAGE.to_string())?;
            let seed_file = args.next().ok_or_else(|| USAGE.to_string())?;
            if args.next().is_some() {
                return Err(USAGE.to_string());
            }
            Ok(Command::Sign {
                model_dir: PathBuf::from(model_dir),
                seed_file: PathBuf::from(seed_file),
            })
        }
        _ => Err(USAGE.to_string()),
    }
}

fn write_secret(path: &Path, contents: &[u8], force: bool) -> Result<(), String> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true);
    if force {
        opts.create(true).truncate(true);
    } else {
        opts.create_new(true);
    }
    #[cfg(unix)]
    opts.mode(0o600);

    let mut file = opts
        .open(path)
        .map_err(|e| format!("Failed to create {path:?}: {e} (use --force to overwrite)"))?;
    file.write_all(contents)
        .map_err(|e| format!("Failed to write {path:?}: {e}"))
}

fn keygen(seed_out: &Path, pub_out: Option<&Path>, force: bool) -> Result<(), String> {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);

    let signing_key = SigningKey::from_bytes(&seed.0);
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes());

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(&seed.0));
    write_secret(seed_out, format!("{}\n", seed_b64.as_str()).as_bytes(), force)?;

    if let Some(path) = pub_out {
        fs::write(path, format!("{pub_b64}\n"))
            .map_err(|e| format!("Failed to write {path:?}: {e}"))?;
        println!("Wrote verifying key: {path:?}");
    }

    println!("Wrote signing seed: {seed_out:?}");
    println!("NEPHRO_MODEL_SIGNING_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn read_seed(path: &Path) -> Result<Seed, String> {
    let content = Zeroizing::new(
        fs::read_to_string(path).map_err(|e| format!("Failed reading seed file: {e}"))?,
    );
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(content.trim())
            .map_err(|e| format!("Invalid base64 in seed file: {e}"))?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        format!(
            "Signing seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn sign(model_dir: &Path, seed_file: &Path) -> Result<(), String> {
    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
    } else {
        model_dir
    };

    // Bind every JSON artifact in the directory.
    let entries =
        fs::read_dir(model_dir).map_err(|e| format!("Failed to list {model_dir:?}: {e}"))?;
    let mut files = BTreeMap::new();
    for entry in entries {
        let path = entry
            .map_err(|e| format!("Failed to list {model_dir:?}: {e}"))?
            .path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !path.is_file() || !name.ends_with(".json") || name == MANIFEST_FILE {
            continue;
        }
        let bytes = fs::read(&path).map_err(|e| format!("Failed to read {path:?}: {e}"))?;
        files.insert(name.to_string(), sha256_hex(&bytes));
    }

    if !files.contains_key(MODEL_FILE) {
        return Err(format!("No {MODEL_FILE} found in {model_dir:?}"));
    }

    let manifest = ModelManifest {
        version: MANIFEST_VERSION,
        created_at: chrono::Utc::now().timestamp(),
        files,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize {MANIFEST_FILE}: {e}"))?;

    let seed = read_seed(seed_file)?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes())
        .map_err(|e| format!("Failed to write {sig_path:?}: {e}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "NEPHRO_MODEL_SIGNING_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
    );
    Ok(())
}

fn main() -> Result<(), String> {
    match parse_args()? {
        Command::Keygen {
            seed_out,
            pub_out,
            force,
        } => keygen(&seed_out, pub_out.as_deref(), force),
        Command::Sign {
            model_dir,
            seed_file,
        } => sign(&model_dir, &seed_file),
    }
}
