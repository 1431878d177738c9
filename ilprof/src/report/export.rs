use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

const FILE_SUFFIX: &str = "-ilp.txt";

/// Writes finished reports to `<output_dir>/<name>-ilp.txt`
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_owned(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_name = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect::<String>();
        self.output_dir.join(format!("{file_name}{FILE_SUFFIX}"))
    }

    pub fn export(&self, name: &str, report: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("unable to create {}", self.output_dir.display()))?;
        let path = self.path_for(name);
        fs::write(&path, report).with_context(|| format!("unable to write {}", path.display()))?;

        tracing::info!("Profile data for {name} exported to {}", path.display());
        Ok(path)
    }
}
