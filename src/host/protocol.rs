use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::domain::{DetectionRecord, NavigationIntent, ScanResult, ScanStats, TabId};

/// Largest frame accepted from the extension.
pub const MAX_INBOUND_FRAME: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("host pipe error: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {0} bytes exceeds the inbound limit")]
    TooLarge(usize),
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Message from the extension. `id` is echoed back on the reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub event: HostEvent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum HostEvent {
    NavigationIntent(NavigationIntent),
    TabRemoved { tab_id: TabId },
    ScanCurrentTab { url: String },
    ClearCache,
    AllowUrlForTab { tab_id: TabId, url: String },
    GetLastDetection,
    GetStats,
    BlockPageGoBack { tab_id: TabId },
    BlockPageProceed { tab_id: TabId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum HostCommand {
    OpenBlockPage { tab_id: TabId },
    NavigateTab { tab_id: TabId, url: String },
    Reply { id: Option<u64>, body: Reply },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    Ack,
    #[serde(rename = "SCAN_RESULT")]
    Scan { result: ScanResult },
    Detection { detection: Option<DetectionRecord> },
    Stats { stats: ScanStats },
    Error { message: String },
}

/// Reads one length-prefixed frame. `Ok(None)` means the extension closed the pipe.
///
/// Oversized frames are drained so the stream stays aligned on the next header.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32_le().await {
        Ok(len) => len as usize,
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    if len > MAX_INBOUND_FRAME {
        let mut body = (&mut *reader).take(len as u64);
        tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
        return Err(FrameError::TooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub fn decode_message(frame: &[u8]) -> Result<InboundMessage, FrameError> {
    Ok(serde_json::from_slice(frame)?)
}

pub async fn write_frame<W>(writer: &mut W, command: &HostCommand) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(command)?;
    writer.write_u32_le(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
