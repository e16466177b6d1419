//! Photo gallery metadata
//!
//! Gallery entries are derived from image file names alone: title words,
//! a keyword category, tags and an optional `<Month> <Year>` date.
//!
//! Author: hephaex@gmail.com

use crate::{ParserError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// First matching group wins
const CATEGORIES: [(&str, &[&str]); 10] = [
    ("Landscape", &["landscape", "mountain", "sunset", "beach"]),
    ("Nature", &["nature", "flower", "tree", "forest"]),
    ("Urban", &["urban", "city", "street", "building"]),
    ("Wildlife", &["wildlife", "animal", "bird", "eagle"]),
    ("Architecture", &["architecture", "building", "modern"]),
    ("Macro", &["macro", "close", "detail"]),
    ("Portrait", &["portrait", "person", "face"]),
    ("Travel", &["travel", "trip", "vacation"]),
    ("Abstract", &["abstract", "art", "pattern"]),
    ("Documentary", &["documentary", "event", "ceremony"]),
];

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[-_](\d{1,2})[-_](\d{1,2})").expect("valid date pattern"));

static WORD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_\s]+").expect("valid separator pattern"));

/// A photo in the gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// 1-based position in name order
    pub id: usize,
    pub title: String,
    pub category: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub filename: String,
    /// `"<Month> <Year>"` when the name carries a date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Gallery document, `{ "photos": [...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoList {
    pub photos: Vec<Photo>,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn category_for(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or("General")
}

fn date_for(filename: &str) -> Option<String> {
    let captures = DATE_PATTERN.captures(filename)?;
    let month: usize = captures[2].parse().ok()?;
    let name = MONTHS.get(month.checked_sub(1)?)?;
    Some(format!("{} {}", name, &captures[1]))
}

/// Derive gallery metadata from a file name
pub fn describe_photo(id: usize, filename: &str) -> Photo {
    let stem = match filename.rfind('.') {
        Some(dot) if dot > 0 => &filename[..dot],
        _ => filename,
    };
    let words: Vec<&str> = WORD_SEPARATOR
        .split(stem)
        .filter(|w| !w.is_empty())
        .collect();

    Photo {
        id,
        title: words
            .iter()
            .map(|w| capitalize(w))
            .collect::<Vec<_>>()
            .join(" "),
        category: category_for(filename).to_string(),
        image_url: format!("/photography/{filename}"),
        tags: words
            .iter()
            .filter(|w| w.chars().count() > 2)
            .map(|w| w.to_lowercase())
            .collect(),
        filename: filename.to_string(),
        date: date_for(filename),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ParserError {
    ParserError::IoError {
        path: path.display().to_string(),
        source,
    }
}

/// List image files in `dir`, sorted by name; a missing directory is empty
///
/// Symlinks are followed, so a linked image is listed like a regular one.
pub fn scan_photos(dir: &Path) -> Result<Vec<Photo>> {
    if !dir.exists() {
        tracing::debug!("Photo directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if !is_image(&path) {
            continue;
        }
        // A dangling link is not a photo
        let is_file = std::fs::metadata(&path)
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();

    Ok(names
        .iter()
        .enumerate()
        .map(|(i, name)| describe_photo(i + 1, name))
        .collect())
}

/// Scan `dir` and write the gallery as pretty JSON to `out`
///
/// Returns the number of photos written. The parent directory of `out` is
/// created when missing.
pub fn export_photos(dir: &Path, out: &Path) -> Result<usize> {
    let list = PhotoList {
        photos: scan_photos(dir)?,
    };

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let json = serde_json::to_string_pretty(&list)
        .map_err(|e| ParserError::SerializeError(e.to_string()))?;
    std::fs::write(out, json).map_err(|e| io_error(out, e))?;

    Ok(list.photos.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_describe_photo() {
        let photo = describe_photo(3, "sunset-over_lake 2023-07-14.JPG");
        assert_eq!(photo.id, 3);
        assert_eq!(photo.title, "Sunset Over Lake 2023 07 14");
        assert_eq!(photo.category, "Landscape");
        assert_eq!(photo.tags, vec!["sunset", "over", "lake", "2023"]);
        assert_eq!(photo.date.as_deref(), Some("July 2023"));
        assert_eq!(photo.image_url, "/photography/sunset-over_lake 2023-07-14.JPG");
    }

    #[test]
    fn test_category_priority_and_default() {
        // "building" is listed under Urban before Architecture
        assert_eq!(category_for("modern-building.png"), "Urban");
        assert_eq!(category_for("modern-museum.png"), "Architecture");
        assert_eq!(category_for("img_0001.png"), "General");
    }

    #[test]
    fn test_date_extraction() {
        assert_eq!(date_for("trip_2021_1_5.jpg").as_deref(), Some("January 2021"));
        assert_eq!(date_for("bad-2021-13-01.jpg"), None);
        assert_eq!(date_for("bad-2021-00-01.jpg"), None);
        assert_eq!(date_for("no-date.jpg"), None);
    }

    #[test]
    fn test_camel_case_json() {
        let json = serde_json::to_value(describe_photo(1, "eagle.webp")).unwrap();
        assert_eq!(json["imageUrl"], "/photography/eagle.webp");
        assert_eq!(json["category"], "Wildlife");
        assert!(json.get("date").is_none());
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-city.png", "a-forest.jpeg", "notes.txt", "c.TIFF"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("d.jpg")).unwrap();

        let photos = scan_photos(dir.path()).unwrap();
        let names: Vec<_> = photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["a-forest.jpeg", "b-city.png", "c.TIFF"]);
        assert_eq!(photos[1].id, 2);
        assert_eq!(photos[1].category, "Urban");
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinks() {
        let store = tempfile::tempdir().unwrap();
        let gallery = tempfile::tempdir().unwrap();
        fs::write(store.path().join("original.jpg"), b"").unwrap();
        std::os::unix::fs::symlink(
            store.path().join("original.jpg"),
            gallery.path().join("linked-beach.jpg"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            store.path().join("missing.jpg"),
            gallery.path().join("dangling.jpg"),
        )
        .unwrap();

        let photos = scan_photos(gallery.path()).unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].filename, "linked-beach.jpg");
        assert_eq!(photos[0].category, "Landscape");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let photos = scan_photos(&dir.path().join("absent")).unwrap();
        assert!(photos.is_empty());
    }

    #[test]
    fn test_export_writes_gallery_document() {
        let photos_dir = tempfile::tempdir().unwrap();
        fs::write(photos_dir.path().join("street-market_2020-05-02.png"), b"").unwrap();
        fs::write(photos_dir.path().join("readme.md"), b"").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("data/photography.json");
        let written = export_photos(photos_dir.path(), &out).unwrap();
        assert_eq!(written, 1);

        let raw = fs::read_to_string(&out).unwrap();
        assert!(raw.contains('\n'));
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let photos = json["photos"].as_array().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0]["title"], "Street Market 2020 05 02");
        assert_eq!(photos[0]["category"], "Urban");
        assert_eq!(photos[0]["date"], "May 2020");
    }

    #[test]
    fn test_export_missing_directory_writes_empty_list() {
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("photography.json");

        let written = export_photos(&out_dir.path().join("absent"), &out).unwrap();
        assert_eq!(written, 0);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"photos": []}));
    }
}
