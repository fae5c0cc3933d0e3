//! Flat-file library of previously fetched URLs.
//!
//! Persisted as delimited text (`.ydl`): one header line, then one record
//! per line as `title,url,path,is_playlist`. Load replaces the in-memory
//! list wholesale; save overwrites the target file.

use std::path::Path;

const HEADER: &str = "Title,URL,FilePath,IsPlaylist";

/// One remembered fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub title: String,
    pub url: String,
    pub destination_dir: String,
    pub is_playlist: bool,
}

/// Commas are the field separator; squash them in free-text fields so a
/// saved record never gains extra fields and gets dropped on load.
fn sanitize_field(field: &str) -> String {
    field.replace(',', ";")
}

impl LibraryEntry {
    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{}",
            sanitize_field(&self.title),
            self.url,
            sanitize_field(&self.destination_dir),
            self.is_playlist as u8
        )
    }

    /// Records with the wrong field count (hand-edited files can have them)
    /// are skipped on load rather than failing the whole file.
    fn from_csv_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.trim().split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let is_playlist = match parts[3] {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        Some(Self {
            title: parts[0].to_string(),
            url: parts[1].to_string(),
            destination_dir: parts[2].to_string(),
            is_playlist,
        })
    }
}

/// Append-only list of fetched URLs, deduplicated by url.
#[derive(Debug, Default)]
pub struct MediaLibrary {
    entries: Vec<LibraryEntry>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry unless its url is already present. A duplicate is a
    /// no-op, not an error; two in-flight fetches of the same URL may both
    /// land here.
    pub fn add(&mut self, entry: LibraryEntry) -> bool {
        if self.contains_url(&entry.url) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.entries.iter().any(|e| e.url == url)
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&LibraryEntry> {
        self.entries.get(index)
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.entries.len() {
            self.entries.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_title(&self, keyword: &str) -> Vec<&LibraryEntry> {
        let keyword = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.title.to_lowercase().contains(&keyword))
            .collect()
    }

    pub fn find_by_url(&self, keyword: &str) -> Vec<&LibraryEntry> {
        let keyword = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.url.to_lowercase().contains(&keyword))
            .collect()
    }

    pub fn find_playlists(&self) -> Vec<&LibraryEntry> {
        self.entries.iter().filter(|e| e.is_playlist).collect()
    }

    /// Overwrites `path` with the current entries.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut out = String::from(HEADER);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&entry.to_csv_line());
            out.push('\n');
        }
        std::fs::write(path, out)
    }

    /// Replaces the in-memory library with the contents of `path`.
    pub fn load(&mut self, path: &Path) -> std::io::Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.entries = content
            .lines()
            .skip(1) // header
            .filter_map(LibraryEntry::from_csv_line)
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> LibraryEntry {
        LibraryEntry {
            title: format!("title of {url}"),
            url: url.to_string(),
            destination_dir: "/downloads".into(),
            is_playlist: false,
        }
    }

    #[test]
    fn duplicate_urls_are_not_added() {
        let mut lib = MediaLibrary::new();
        assert!(lib.add(entry("https://youtu.be/a")));
        assert!(!lib.add(entry("https://youtu.be/a")));
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.ydl");

        let mut lib = MediaLibrary::new();
        lib.add(entry("https://youtu.be/a"));
        lib.add(LibraryEntry {
            title: "My List".into(),
            url: "https://www.youtube.com/playlist?list=PL123".into(),
            destination_dir: "/downloads/My List".into(),
            is_playlist: true,
        });
        lib.save(&path).unwrap();

        let mut loaded = MediaLibrary::new();
        loaded.add(entry("https://youtu.be/stale"));
        loaded.load(&path).unwrap();

        // Load replaces wholesale.
        assert_eq!(loaded.entries(), lib.entries());
        assert!(!loaded.contains_url("https://youtu.be/stale"));
        assert_eq!(loaded.find_playlists().len(), 1);
    }

    #[test]
    fn comma_titles_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.ydl");

        let mut lib = MediaLibrary::new();
        lib.add(LibraryEntry {
            title: "Best, Worst, and Weirdest".into(),
            url: "https://youtu.be/a".into(),
            destination_dir: "/downloads".into(),
            is_playlist: false,
        });
        lib.save(&path).unwrap();

        let mut loaded = MediaLibrary::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].title, "Best; Worst; and Weirdest");
        assert_eq!(loaded.entries()[0].url, "https://youtu.be/a");
    }

    #[test]
    fn malformed_lines_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.ydl");
        std::fs::write(
            &path,
            "Title,URL,FilePath,IsPlaylist\n\
             good,https://youtu.be/a,/dl,0\n\
             has,a,comma,in,title,1\n\
             badflag,https://youtu.be/b,/dl,x\n",
        )
        .unwrap();

        let mut lib = MediaLibrary::new();
        lib.load(&path).unwrap();
        assert!(!lib.is_empty());
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.entries()[0].url, "https://youtu.be/a");
    }

    #[test]
    fn searches_are_case_insensitive() {
        let mut lib = MediaLibrary::new();
        lib.add(LibraryEntry {
            title: "Rust Tutorials".into(),
            url: "https://youtu.be/RUST".into(),
            destination_dir: "/dl".into(),
            is_playlist: false,
        });
        assert_eq!(lib.find_by_title("rust").len(), 1);
        assert_eq!(lib.find_by_url("rust").len(), 1);
        assert!(lib.find_by_title("python").is_empty());
    }
}
