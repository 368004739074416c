use std::path::Path;

use color_eyre::{Result, eyre::WrapErr};
use el_messages::Sample;

use crate::plot::figure;

/// Every sample received during the current run.
#[derive(Debug, Default)]
pub struct Recording {
    samples: Vec<Sample>,
    saved: bool,
    plotted: bool,
}

impl Recording {
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
        self.saved = false;
        self.plotted = false;
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.saved = false;
        self.plotted = false;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True if there are samples that have not been written to a file yet.
    #[inline]
    pub fn has_unsaved(&self) -> bool {
        !self.saved && !self.samples.is_empty()
    }

    /// True if there are samples missing from the last saved figure.
    #[inline]
    pub fn has_unplotted(&self) -> bool {
        !self.plotted && !self.samples.is_empty()
    }

    /// One record line per sample, each terminated by a newline.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.samples.len() * 52);
        for sample in &self.samples {
            // Writing to a String cannot fail.
            let _ = sample.write_record(&mut text);
            text.push('\n');
        }
        text
    }

    /// Writes the recording to `path`, replacing the file. Returns the number of samples written.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub async fn save(&mut self, path: &Path) -> Result<usize> {
        tokio::fs::write(path, self.to_text())
            .await
            .wrap_err_with(|| format!("Failed to save data to {}", path.display()))?;
        self.saved = true;
        Ok(self.samples.len())
    }

    /// Draws the whole recording into an SVG figure at `path`. Returns the number of samples drawn.
    ///
    /// # Errors
    /// Returns an error if the recording is empty or the file cannot be written.
    pub async fn save_plot(&mut self, path: &Path) -> Result<usize> {
        let samples = self.samples.clone();
        let target = path.to_owned();
        tokio::task::spawn_blocking(move || figure::render_run(&samples, &target))
            .await?
            .wrap_err_with(|| format!("Failed to save the plot to {}", path.display()))?;
        self.plotted = true;
        Ok(self.samples.len())
    }
}
