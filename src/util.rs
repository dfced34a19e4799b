use std::io::Write;
use std::path::Path;

/// Write `content` to `path` via a temp file in the same directory, so a
/// crash mid-write never leaves a truncated file behind.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// File name for an exported Aadhaar photo.
///
/// Example: "राम  कुमार" → "Aadhaar_राम_कुमार.jpg"
pub fn photo_file_name(voter_name: &str) -> String {
    let name = voter_name
        .split_whitespace()
        .map(|part| {
            part.chars()
                .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_");
    let name = if name.is_empty() { "Voter".to_string() } else { name };
    format!("Aadhaar_{}.jpg", name)
}
