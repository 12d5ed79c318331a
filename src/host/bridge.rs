use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use tokio::{
    io::AsyncWrite,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{domain::TabId, guard::TabController};

use super::protocol::{write_frame, HostCommand, Reply};

/// Queues commands for the extension. Cloned into every component that talks
/// back to the browser; a single writer task owns stdout.
#[derive(Clone)]
pub struct CommandSink {
    tx: UnboundedSender<HostCommand>,
}

impl CommandSink {
    pub fn channel() -> (Self, UnboundedReceiver<HostCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, command: HostCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("extension connection closed"))
    }

    pub fn reply(&self, id: Option<u64>, body: Reply) {
        if let Err(err) = self.send(HostCommand::Reply { id, body }) {
            tracing::warn!(target: "host", error = %err, ?id, "dropping reply");
        }
    }
}

impl TabController for CommandSink {
    fn open_block_page(&self, tab_id: TabId) -> BoxFuture<'_, Result<()>> {
        let sent = self.send(HostCommand::OpenBlockPage { tab_id });
        Box::pin(async move { sent })
    }

    fn navigate(&self, tab_id: TabId, url: String) -> BoxFuture<'_, Result<()>> {
        let sent = self.send(HostCommand::NavigateTab { tab_id, url });
        Box::pin(async move { sent })
    }
}

pub fn spawn_writer<W>(mut writer: W, mut rx: UnboundedReceiver<HostCommand>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            if let Err(err) = write_frame(&mut writer, &command).await {
                tracing::error!(target: "host", error = %err, "failed to write to extension; stopping writer");
                break;
            }
        }
        tracing::debug!(target: "host", "command writer stopped");
    })
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn tab_commands_reach_the_writer() {
        let (sink, rx) = CommandSink::channel();
        let (host_side, mut extension_side) = tokio::io::duplex(4096);
        let writer = spawn_writer(host_side, rx);

        sink.open_block_page(TabId(11)).await.unwrap();
        drop(sink);
        writer.await.unwrap();

        let len = extension_side.read_u32_le().await.unwrap() as usize;
        let mut body = vec![0u8; len];
        extension_side.read_exact(&mut body).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["type"], "OPEN_BLOCK_PAGE");
        assert_eq!(json["tabId"], 11);
    }

    #[tokio::test]
    async fn closed_channel_is_an_error() {
        let (sink, rx) = CommandSink::channel();
        drop(rx);
        assert!(sink.navigate(TabId(1), "https://a.test/".into()).await.is_err());
    }
}
