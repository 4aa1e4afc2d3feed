use std::env::var_os;
use std::error::Error;
use std::fs::copy;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    include_default_config()?;
    Ok(())
}

fn etc_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("etc").join(name)
}

fn include_default_config() -> Result<(), Box<dyn Error>> {
    let fname = "default.config.yaml";
    let src_path = etc_path(fname);
    let out_dir = var_os("OUT_DIR").ok_or("OUT_DIR not set")?;
    let dest_path = Path::new(&out_dir).join(fname);
    copy(&src_path, dest_path)?;
    println!("cargo::rerun-if-changed={}", src_path.display());
    Ok(())
}
