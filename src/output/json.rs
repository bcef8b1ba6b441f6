//! JSON file output

use crate::api::Offer;
use crate::output::traits::{OfferSink, OutputError, OutputResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Document written by [`JsonFileSink`]
#[derive(Debug, Serialize)]
struct OffersDocument<'a> {
    collected_at: DateTime<Utc>,
    offers_count: usize,
    offers: &'a [Offer],
}

/// Writes collected listings to a single pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OfferSink for JsonFileSink {
    fn write_offers(&mut self, collected_at: DateTime<Utc>, offers: &[Offer]) -> OutputResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let document = OffersDocument {
            collected_at,
            offers_count: offers.len(),
            offers,
        };

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.write_all(b"\n")?;
        writer
            .flush()
            .map_err(|e| OutputError::Write(format!("{}: {}", self.path.display(), e)))?;

        tracing::info!(
            "Wrote {} offers to {}",
            offers.len(),
            self.path.display()
        );
        Ok(())
    }
}
