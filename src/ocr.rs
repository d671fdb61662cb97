use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::config::OcrConfig;

/// Turns an image file into text. Never fails: an empty string means nothing
/// could be read.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, image: &Path) -> String;
}

/// Shells out to the `tesseract` CLI and reads the result from stdout.
#[derive(Debug, Clone)]
pub struct Tesseract {
    config: OcrConfig,
}

impl Tesseract {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn args(&self, image: &Path) -> Vec<OsString> {
        vec![
            image.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.config.languages.clone().into(),
            "--oem".into(),
            self.config.oem.to_string().into(),
            "--psm".into(),
            self.config.psm.to_string().into(),
        ]
    }
}

#[async_trait]
impl OcrEngine for Tesseract {
    async fn extract_text(&self, image: &Path) -> String {
        let output = match Command::new(&self.config.tesseract_bin)
            .args(self.args(image))
            .output()
            .await
        {
            Ok(o) => o,
            Err(e) => {
                error!(error = %e, bin = %self.config.tesseract_bin, "failed to run tesseract");
                return String::new();
            }
        };

        if !output.status.success() {
            error!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "tesseract exited with failure"
            );
            return String::new();
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.chars().count(), "ocr finished");
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_language_and_segmentation_flags() {
        let tess = Tesseract::new(OcrConfig::default());
        let args = tess.args(Path::new("/tmp/receipt-1.jpg"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "/tmp/receipt-1.jpg",
                "stdout",
                "-l",
                "eng+jpn",
                "--oem",
                "1",
                "--psm",
                "6"
            ]
        );
    }

    #[tokio::test]
    async fn missing_binary_yields_empty_text() {
        let tess = Tesseract::new(OcrConfig {
            tesseract_bin: "/nonexistent/tesseract-binary".into(),
            ..OcrConfig::default()
        });
        let text = tess.extract_text(Path::new("/tmp/nothing.png")).await;
        assert!(text.is_empty());
    }
}
