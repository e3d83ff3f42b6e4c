//! Artifact sinks.

pub mod fs;

use std::io::Write;

use tracing::debug;

use crate::errors::GenerationError;

pub use fs::FsArtifactWriter;

/// Destination for rendered artifacts.
pub trait ArtifactWriter {
    /// Persist one artifact and return the number of content bytes written.
    fn write(&mut self, path: &str, content: &str) -> Result<u64, GenerationError>;
}

/// A rendered artifact held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub content: String,
}

/// Collects artifacts in emission order.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    artifacts: Vec<Artifact>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn paths(&self) -> Vec<&str> {
        self.artifacts.iter().map(|artifact| artifact.path.as_str()).collect()
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }
}

impl ArtifactWriter for MemoryWriter {
    fn write(&mut self, path: &str, content: &str) -> Result<u64, GenerationError> {
        self.artifacts.push(Artifact {
            path: path.to_string(),
            content: content.to_string(),
        });
        Ok(content.len() as u64)
    }
}

/// Prints every artifact instead of persisting it.
pub struct DryRunWriter<W: Write> {
    out: W,
}

impl<W: Write> DryRunWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ArtifactWriter for DryRunWriter<W> {
    fn write(&mut self, path: &str, content: &str) -> Result<u64, GenerationError> {
        writeln!(self.out, "==> {path} <==")?;
        self.out.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        debug!(path, bytes = content.len(), "artifact printed");
        Ok(content.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_writer_keeps_order() {
        let mut writer = MemoryWriter::new();
        writer.write("b.txt", "second").expect("write");
        writer.write("a.txt", "first").expect("write");
        assert_eq!(writer.paths(), vec!["b.txt", "a.txt"]);

        let artifacts = writer.into_artifacts();
        assert_eq!(artifacts[1].content, "first");
    }

    #[test]
    fn dry_run_prints_path_and_content() {
        let mut writer = DryRunWriter::new(Vec::new());
        let bytes = writer.write("out/case.txt", "body").expect("write");
        let printed = String::from_utf8(writer.into_inner()).expect("utf8");

        assert_eq!(bytes, 4);
        assert_eq!(printed, "==> out/case.txt <==\nbody\n");
    }
}
