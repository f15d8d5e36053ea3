//! Recording persistence - one pretty-printed JSON document per file

use crate::action::RecordingFile;
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| Error::persistence("HOME not set"))?;
        Self::with_dir(PathBuf::from(home).join(".deskrec"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist a recording document. A write failure is fatal to the save
    /// only; the caller still holds the in-memory document.
    pub fn save(&self, recording: &RecordingFile) -> Result<PathBuf> {
        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let name = sanitize(&recording.metadata.script_name);
        let filename = format!("{}_{}.json", name, ts);
        let path = self.dir.join(&filename);

        let file = File::create(&path)?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, recording)?;
        w.flush()?;
        Ok(path)
    }

    pub fn load(&self, filename: &str) -> Result<RecordingFile> {
        let path = self.resolve(filename);
        let file = File::open(&path)?;
        let recording = serde_json::from_reader(BufReader::new(file))?;
        Ok(recording)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(s) = entry.file_name().to_str() {
                if s.ends_with(".json") {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, filename: &str) -> Result<()> {
        fs::remove_file(self.resolve(filename))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    // Accept both a bare filename and a full path.
    fn resolve(&self, filename: &str) -> PathBuf {
        let p = Path::new(filename);
        if p.is_absolute() || p.exists() {
            p.to_path_buf()
        } else {
            self.dir.join(filename)
        }
    }
}

fn sanitize(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "recording".to_string()
    } else {
        cleaned
    }
}
