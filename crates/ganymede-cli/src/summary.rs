use std::path::Path;

use console::Style;
use ganymede_core::pipeline::{MasterBuildSummary, ReductionConfig, ReductionSummary};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    warn: Style,
    bad: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            warn: Style::new().yellow(),
            bad: Style::new().red(),
            path: Style::new().underlined(),
        }
    }

    fn count(&self, n: usize, style: &Style) -> String {
        if n == 0 {
            self.label.apply_to(n).to_string()
        } else {
            style.apply_to(n).to_string()
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

pub fn print_masters_header(batch_dir: &Path, config: &ReductionConfig) {
    let s = Styles::new();
    print_title(&s, "Ganymede Masters");
    println!(
        "  {:<14}{}",
        s.label.apply_to("Batch"),
        s.path.apply_to(batch_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Masters"),
        s.path.apply_to(config.paths.masters_dir.display())
    );
    println!();
}

pub fn print_masters_summary(summary: &MasterBuildSummary) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Indexed"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Bias"),
        s.value.apply_to(summary.counts.bias)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Dark"),
        s.value.apply_to(summary.counts.dark)
    );
    for (filter, count) in &summary.counts.flats {
        println!(
            "    {:<12}{}",
            s.label.apply_to(format!("Flat {filter}")),
            s.value.apply_to(count)
        );
    }
    if summary.skipped_files > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Skipped"),
            s.warn.apply_to(summary.skipped_files)
        );
    }
    if summary.mismatched_dark_exposures > 0 {
        println!(
            "    {:<12}{} with differing exposure time",
            s.label.apply_to("Darks"),
            s.warn.apply_to(summary.mismatched_dark_exposures)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Masters"));
    for master in &summary.built {
        let status = if master.written {
            s.good.apply_to("written")
        } else {
            s.warn.apply_to("kept existing")
        };
        println!(
            "    {:<12}{} ({} frames)",
            s.label.apply_to(&master.label),
            status,
            master.combined_count
        );
    }
    for failure in &summary.failures {
        println!(
            "    {:<12}{}",
            s.label.apply_to(&failure.label),
            s.bad.apply_to(&failure.reason)
        );
    }
    println!();
}

pub fn print_reduction_header(light_dir: &Path, output_dir: &Path, config: &ReductionConfig) {
    let s = Styles::new();
    print_title(&s, "Ganymede Reduction");
    println!(
        "  {:<14}{}",
        s.label.apply_to("Lights"),
        s.path.apply_to(light_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Masters"),
        s.path.apply_to(config.paths.masters_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Max CCD temp"),
        s.value.apply_to(format!("{:.1} C", config.acceptance.max_ccd_temperature))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Missing flat"),
        s.value.apply_to(config.missing_flat)
    );
    println!();
}

pub fn print_reduction_summary(summary: &ReductionSummary, audit_log: &Path) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Results"));
    let rows = [
        ("Calibrated", summary.calibrated, &s.good),
        ("Dark-only", summary.calibrated_dark_only, &s.good),
        ("Redundant", summary.redundant, &s.warn),
        ("Size", summary.rejected_size, &s.warn),
        ("Binning", summary.rejected_binning, &s.warn),
        ("Temperature", summary.rejected_temperature, &s.warn),
        ("No flat", summary.missing_flat, &s.warn),
        ("Failed", summary.failed, &s.bad),
    ];
    for (label, n, style) in rows {
        println!("    {:<12}{}", s.label.apply_to(label), s.count(n, style));
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(summary.total)
    );
    println!();

    if summary.total > summary.calibrated + summary.calibrated_dark_only {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Audit log"),
            s.path.apply_to(audit_log.display())
        );
        println!();
    }
}
