use anyhow::Error as AnyError;
use indicatif::{ProgressBar, ProgressStyle};

pub fn bar(header: String, length: u64) -> Result<ProgressBar, AnyError> {
    let pb = ProgressBar::new(length);
    pb.set_prefix(header);
    pb.set_style(
        ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
