use std::{fs, io::Write, path::Path};

use showcrawl::ProjectRecord;

use crate::error::AppError;

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes one row per record under a fixed header, even when there are no records.
pub fn write_projects_csv(records: &[ProjectRecord], destination: &Path) -> Result<(), AppError> {
    ensure_parent(destination)?;
    let mut writer = csv::Writer::from_path(destination)?;
    if records.is_empty() {
        writer.write_record([
            "urlOfProject",
            "nameOfProject",
            "descriptionOfProject",
            "problemSolved",
            "challengesFaced",
            "technologiesUsed",
        ])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Placeholder rows for the downstream embedding job, one per scraped project.
pub fn write_embeddings_placeholder(
    records: &[ProjectRecord],
    destination: &Path,
) -> Result<(), AppError> {
    ensure_parent(destination)?;
    let mut writer = csv::Writer::from_path(destination)?;
    writer.write_record(["project_url", "field", "embedding"])?;
    for record in records {
        writer.write_record([record.url.as_str(), "pending", ""])?;
    }
    writer.flush()?;
    Ok(())
}

/// One URL per line. Nothing is written when there are no failures.
pub fn write_failures<'a, I>(urls: I, destination: &Path) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut urls = urls.into_iter().peekable();
    if urls.peek().is_none() {
        return Ok(());
    }

    ensure_parent(destination)?;
    let mut file = fs::File::create(destination)?;
    for url in urls {
        writeln!(file, "{url}")?;
    }
    Ok(())
}
