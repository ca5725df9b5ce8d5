//! LUT application command.

use crate::ApplyArgs;
use anyhow::Result;
use tracing::debug;

use lutgrade_render::Sampler;

pub fn run(args: ApplyArgs, verbose: bool) -> Result<()> {
    if verbose {
        println!(
            "Applying {} to {}",
            args.lut.display(),
            args.input.display()
        );
    }

    let image = super::load_png(&args.input)?;
    let lut = super::load_lut(&args.lut)?;
    debug!(
        width = image.width,
        height = image.height,
        lut_size = lut.size,
        "grading"
    );

    let graded = Sampler::new().apply(&image, &lut)?;
    super::save_png(&args.output, &graded)?;

    if verbose {
        println!("Wrote {}", args.output.display());
    }
    Ok(())
}
