use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ganymede_core::calibrate::{classify, AcceptanceCriteria};
use ganymede_core::frame::ImageKind;
use ganymede_core::io::{ExposureReader, FitsArchive};

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,

    /// Expected full-frame pixel count
    #[arg(long)]
    pub expected_pixels: Option<usize>,

    /// Show every header card
    #[arg(long)]
    pub header: bool,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let exposure = FitsArchive
        .read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    println!("File:         {}", args.file.display());
    println!("Dimensions:   {}x{}", exposure.width(), exposure.height());
    println!("Pixels:       {}", exposure.pixel_count());
    println!("Header cards: {}", exposure.header.len());

    match exposure.metadata() {
        Ok(meta) => {
            println!("Type:         {}", meta.image_kind);
            if let Some(ref filter) = meta.filter_name {
                println!("Filter:       {}", filter);
            }
            println!("Binning:      {}x{}", meta.x_binning, meta.y_binning);
            println!("CCD temp:     {:.1} C", meta.ccd_temperature);
            println!("Exposure:     {} s", meta.exposure_seconds);
            println!("Calibration:  {}", meta.calibration_status);

            if meta.image_kind == ImageKind::Light {
                let mut criteria = AcceptanceCriteria::default();
                if let Some(expected) = args.expected_pixels {
                    criteria.expected_pixel_count = expected;
                }
                println!("Verdict:      {}", classify(&meta, &criteria));
            }
        }
        Err(e) => println!("Metadata:     unavailable ({e})"),
    }

    if args.header {
        println!();
        if exposure.header.is_empty() {
            println!("(no keyword cards)");
        }
        for (key, card) in exposure.header.cards() {
            match card.comment {
                Some(ref comment) => println!("{key:<8} = {} / {comment}", card.value),
                None => println!("{key:<8} = {}", card.value),
            }
        }
        for (key, text) in exposure.header.commentary() {
            println!("{key:<8} {text}");
        }
    }

    Ok(())
}
