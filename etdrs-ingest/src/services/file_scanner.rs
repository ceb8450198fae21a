//! Report file scanner
//!
//! Lists delimited report files in an input directory. Only the top level
//! is scanned unless a deeper walk is requested. Results are sorted by path
//! so aggregation order, and therefore tie-breaking, is reproducible.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Report scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Report file scanner
pub struct FileScanner {
    ignore_patterns: Vec<String>,
    extension: String,
    max_depth: usize,
}

impl FileScanner {
    /// Top-level `.csv` scanner that ignores editor and OS droppings
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "~$".to_string(),
            ],
            extension: "csv".to_string(),
            max_depth: 1,
        }
    }

    /// Descend `depth` directory levels below the root
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Sorted list of report files under `root_path`
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.has_report_extension(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                }
            }
        }
        files.sort();

        tracing::debug!(
            "{} report file(s) found in {}",
            files.len(),
            root_path.display()
        );

        Ok(files)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }

    fn has_report_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_report_extension_detection() {
        let scanner = FileScanner::new();
        assert!(scanner.has_report_extension(Path::new("EG0001.csv")));
        assert!(scanner.has_report_extension(Path::new("EG0001.CSV")));
        assert!(!scanner.has_report_extension(Path::new("EG0001.txt")));
        assert!(!scanner.has_report_extension(Path::new("csv")));
    }

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::new();
        let result = scanner.scan(Path::new("/nonexistent/path"));
        match result.unwrap_err() {
            ScanError::PathNotFound(_) => {}
            other => panic!("Expected PathNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_file_as_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("report.csv");
        fs::write(&file, "x").unwrap();

        match FileScanner::new().scan(&file).unwrap_err() {
            ScanError::NotADirectory(_) => {}
            other => panic!("Expected NotADirectory error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_is_sorted_and_top_level() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.csv"), "x").unwrap();
        fs::write(temp_dir.path().join("a.csv"), "x").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        fs::write(temp_dir.path().join("~$a.csv"), "x").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("c.csv"), "x").unwrap();

        let files = FileScanner::new().scan(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);

        let deep = FileScanner::new().with_max_depth(2).scan(temp_dir.path()).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new().scan(temp_dir.path()).unwrap();
        assert!(result.is_empty());
    }
}
