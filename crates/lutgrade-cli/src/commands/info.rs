//! .clut container inspection.

use crate::InfoArgs;
use anyhow::{Context, Result};
use std::path::Path;

use lutgrade_core::clut;

pub fn run(args: InfoArgs, _verbose: bool) -> Result<()> {
    for path in &args.input {
        show(path, args.json)?;
    }
    Ok(())
}

fn show(path: &Path, json: bool) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))?;
    let lut = clut::decode(&bytes).with_context(|| format!("Not a .clut: {}", path.display()))?;

    if json {
        let value = serde_json::json!({
            "file": path.display().to_string(),
            "size": lut.size,
            "texture": { "width": lut.width, "height": lut.height },
            "domain_min": lut.domain_min,
            "domain_max": lut.domain_max,
            "bytes": bytes.len(),
            "hash": super::short_hash(&bytes),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", path.display());
        println!("  grid:    {0}x{0}x{0}", lut.size);
        println!("  texture: {}x{} RGBA8", lut.width, lut.height);
        println!(
            "  domain:  [{} {} {}] .. [{} {} {}]",
            lut.domain_min[0],
            lut.domain_min[1],
            lut.domain_min[2],
            lut.domain_max[0],
            lut.domain_max[1],
            lut.domain_max[2]
        );
        println!("  bytes:   {}", bytes.len());
        println!("  hash:    {}", super::short_hash(&bytes));
    }
    Ok(())
}
