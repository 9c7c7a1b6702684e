//! Text extraction via an external OCR engine.
//!
//! The engine is a black box behind [`OcrEngine`]. The production
//! implementation, [`TesseractEngine`], pipes a PNG into the `tesseract`
//! binary over stdin and reads plain text from stdout, so no native
//! bindings are linked and the binary location is just a config value.

use crate::config::ExtractionConfig;
use crate::error::{FileError, OcrError};
use crate::pipeline::preprocess::encode_png;
use async_trait::async_trait;
use image::GrayImage;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// An OCR engine: normalised raster in, raw text out.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise all text in `image`. Whitespace and line breaks are
    /// returned as the engine produces them.
    async fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Runs the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    cmd: PathBuf,
    language: String,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(cmd: impl Into<PathBuf>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            cmd: cmd.into(),
            language: language.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.tesseract_cmd.clone(),
            config.ocr_language.clone(),
            Duration::from_secs(config.ocr_timeout_secs),
        )
    }

    pub fn cmd(&self) -> &std::path::Path {
        &self.cmd
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.cmd)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OcrError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            OcrError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "tesseract stdin was not captured",
            ))
        })?;

        let run = async move {
            stdin.write_all(&png).await?;
            drop(stdin);
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| OcrError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The engine to use for a run: the injected one, else tesseract.
pub fn resolve_engine(config: &ExtractionConfig) -> Arc<dyn OcrEngine> {
    match config.ocr_engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(TesseractEngine::from_config(config)),
    }
}

/// Run the engine and reject whitespace-only output.
///
/// The returned text is untrimmed; only the emptiness check trims.
pub async fn extract_text(engine: &dyn OcrEngine, image: &GrayImage) -> Result<String, FileError> {
    let text = engine.recognize(image).await?;
    if text.trim().is_empty() {
        return Err(FileError::NoText);
    }
    debug!("OCR produced {} chars", text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    struct FixedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenOcr;

    #[async_trait]
    impl OcrEngine for BrokenOcr {
        async fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            Err(OcrError::Failed {
                status: "exit status: 1".into(),
                stderr: "Error opening data file".into(),
            })
        }
    }

    fn blank() -> GrayImage {
        GrayImage::from_pixel(4, 4, Luma([255]))
    }

    #[tokio::test]
    async fn whitespace_only_text_is_no_text() {
        let err = extract_text(&FixedOcr(" \n\t \n"), &blank()).await.unwrap_err();
        assert_eq!(err, FileError::NoText);
    }

    #[tokio::test]
    async fn text_is_returned_untrimmed() {
        let text = extract_text(&FixedOcr("  INT. KITCHEN - DAY\n"), &blank())
            .await
            .unwrap();
        assert_eq!(text, "  INT. KITCHEN - DAY\n");
    }

    #[tokio::test]
    async fn engine_failure_is_extraction_failure() {
        let err = extract_text(&BrokenOcr, &blank()).await.unwrap_err();
        assert!(matches!(err, FileError::OcrFailed { .. }), "got: {err:?}");
        assert!(err.to_string().contains("Error opening data file"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let engine = TesseractEngine::new(
            "/nonexistent/bin/tesseract-for-tests",
            "eng",
            Duration::from_secs(5),
        );
        let err = engine.recognize(&blank()).await.unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }), "got: {err:?}");
    }

    #[test]
    fn injected_engine_takes_precedence() {
        let injected: Arc<dyn OcrEngine> = Arc::new(FixedOcr("x"));
        let config = ExtractionConfig::builder()
            .ocr_engine(Arc::clone(&injected))
            .build()
            .unwrap();
        let resolved = resolve_engine(&config);
        assert!(Arc::ptr_eq(&resolved, &injected));
    }

    /// Write an executable shell script standing in for tesseract.
    ///
    /// Each script drains stdin first so the PNG write never hits a closed
    /// pipe.
    #[cfg(unix)]
    fn fake_tesseract(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Run `engine`, retrying while the freshly written script is still
    /// reported busy (ETXTBSY) by a concurrent fork in another test.
    #[cfg(unix)]
    async fn recognize_fresh(engine: &TesseractEngine) -> Result<String, OcrError> {
        for _ in 0..20 {
            match engine.recognize(&blank()).await {
                Err(OcrError::Spawn { ref source, .. }) if source.raw_os_error() == Some(26) => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                other => return other,
            }
        }
        engine.recognize(&blank()).await
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tesseract_stdout_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = fake_tesseract(dir.path(), "printf 'INT. ROOF - NIGHT\\n\\nMARA\\nJump.\\n'");
        let engine = TesseractEngine::new(cmd, "eng", Duration::from_secs(10));

        let text = recognize_fresh(&engine).await.unwrap();
        assert_eq!(text, "INT. ROOF - NIGHT\n\nMARA\nJump.\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tesseract_arguments_name_stdin_stdout_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = fake_tesseract(dir.path(), "echo \"$@\"");
        let engine = TesseractEngine::new(cmd, "eng+fra", Duration::from_secs(10));

        let text = recognize_fresh(&engine).await.unwrap();
        assert_eq!(text.trim(), "stdin stdout -l eng+fra");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tesseract_nonzero_exit_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = fake_tesseract(
            dir.path(),
            "echo 'Error opening data file /usr/share/tessdata/xyz.traineddata' >&2\nexit 1",
        );
        let engine = TesseractEngine::new(cmd, "xyz", Duration::from_secs(10));

        match recognize_fresh(&engine).await.unwrap_err() {
            OcrError::Failed { status, stderr } => {
                assert!(status.contains('1'), "got: {status}");
                assert_eq!(
                    stderr,
                    "Error opening data file /usr/share/tessdata/xyz.traineddata"
                );
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_tesseract_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = fake_tesseract(dir.path(), "exec sleep 30");
        let engine = TesseractEngine::new(cmd, "eng", Duration::from_secs(1));

        let start = std::time::Instant::now();
        let err = recognize_fresh(&engine).await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout { secs: 1 }), "got: {err:?}");
        assert!(start.elapsed() < Duration::from_secs(10));

        let err: FileError = err.into();
        assert!(matches!(err, FileError::OcrFailed { .. }));
    }
}
