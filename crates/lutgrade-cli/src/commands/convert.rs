//! Library conversion command: .cube tree to .clut tree plus manifest.

use crate::ConvertArgs;
use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use lutgrade_cache::LutMeta;
use lutgrade_core::{clut, cube, pack};

pub fn run(args: ConvertArgs, verbose: bool) -> Result<()> {
    let manifest = convert_tree(&args.src, &args.dest)?;

    if verbose {
        println!("Converted {} LUTs into {}", manifest.len(), args.dest.display());
    }

    if let Some(path) = &args.manifest {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create manifest: {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &manifest)
            .context("Failed to write manifest")?;
        if verbose {
            println!("Manifest written to {}", path.display());
        }
    }

    Ok(())
}

/// Converts every `.cube` under the category subdirectories of `src`,
/// writing `.clut` files under `dest` and returning manifest entries.
///
/// Per-file failures are logged and skipped; directory-level I/O errors
/// abort the run.
pub fn convert_tree(src: &Path, dest: &Path) -> Result<Vec<LutMeta>> {
    let mut manifest = Vec::new();

    for category_dir in sorted_dirs(src)? {
        let category = leaf_name(&category_dir);
        let out_dir = dest.join(&category);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create: {}", out_dir.display()))?;

        for cube_path in sorted_cubes(&category_dir)? {
            match convert_one(&cube_path, &out_dir, &category) {
                Ok(meta) => {
                    debug!(id = %meta.id, hash = %meta.hash, "converted");
                    manifest.push(meta);
                }
                Err(e) => {
                    warn!(file = %cube_path.display(), error = %e, "skipping LUT");
                }
            }
        }
    }

    Ok(manifest)
}

fn convert_one(cube_path: &Path, out_dir: &Path, category: &str) -> Result<LutMeta> {
    let stem = cube_path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("non-UTF-8 file name")?
        .to_string();

    let lut = cube::read(cube_path)?;
    let bytes = clut::encode(&pack(&lut));
    let hash = super::short_hash(&bytes);

    let out_path = out_dir.join(format!("{stem}.clut"));
    fs::write(&out_path, &bytes)
        .with_context(|| format!("Failed to write: {}", out_path.display()))?;

    // Ids are slugs: whitespace runs collapse to a single dash.
    let slug = stem.split_whitespace().collect::<Vec<_>>().join("-");

    Ok(LutMeta {
        id: format!("{category}-{slug}"),
        name: stem.clone(),
        file: format!("{category}/{stem}.clut"),
        category: category.to_string(),
        hash,
    })
}

/// Orders names with numeric collation: digit runs compare by value, so
/// `lut2` precedes `lut10`.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();
    loop {
        match (a.first().copied(), b.first().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (na, rest_a) = split_number(a);
                let (nb, rest_b) = split_number(b);
                match na.cmp(&nb) {
                    Ordering::Equal => {
                        a = rest_a;
                        b = rest_b;
                    }
                    other => return other,
                }
            }
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => {
                    a = &a[1..];
                    b = &b[1..];
                }
                other => return other,
            },
        }
    }
}

fn split_number(s: &[u8]) -> (u128, &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    let value = s[..end]
        .iter()
        .fold(0u128, |acc, d| acc * 10 + u128::from(d - b'0'));
    (value, &s[end..])
}

fn leaf_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sorted_dirs(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut dirs: Vec<_> = fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort_by(|a, b| natural_cmp(&leaf_name(a), &leaf_name(b)));
    Ok(dirs)
}

fn sorted_cubes(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files: Vec<_> = fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("cube"))
        })
        .collect();
    files.sort_by(|a, b| natural_cmp(&leaf_name(a), &leaf_name(b)));
    Ok(files)
}
