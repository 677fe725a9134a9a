//! Audio extraction via an ffmpeg subprocess with fixed parameters:
//! mono, 16 kHz, signed 16-bit PCM.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use clipfund_common::{EngineError, EngineResult};

use crate::traits::AudioExtractor;

pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }

    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, input: &Path, output: &Path) -> EngineResult<()> {
        let result = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-acodec", "pcm_s16le", "-y"])
            .arg(output)
            .output()
            .await
            .map_err(|e| EngineError::external("ffmpeg", e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(EngineError::ExternalService {
                service: "ffmpeg".into(),
                message: format!("exit {:?}: {}", result.status.code(), tail),
            });
        }

        Ok(())
    }
}
