//! Channel-backed media group
//!
//! Every call becomes a [`MediaGroupRequest`] on an unbounded channel. The
//! receiving side is whatever drives the real media server, or a test.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::MediaGroup;
use crate::controller::ControllerRef;
use crate::errors::{ControllerError, Result};
use crate::types::{Collect, ControllerId, MediaGroupId, Play, Record, Stop};

#[derive(Debug, Clone, PartialEq)]
pub enum MediaGroupCommand {
    Observe(ControllerRef),
    StopObserving(ControllerId),
    Start,
    Stop,
    StopMedia(Stop),
    Record(Record),
    Play(Play),
    Collect(Collect),
    Destroy,
}

/// A command addressed to one media group
#[derive(Debug, Clone, PartialEq)]
pub struct MediaGroupRequest {
    pub group: MediaGroupId,
    pub command: MediaGroupCommand,
}

#[derive(Debug, Clone)]
pub struct ChannelMediaGroup {
    id: MediaGroupId,
    tx: mpsc::UnboundedSender<MediaGroupRequest>,
}

impl ChannelMediaGroup {
    pub fn new(id: MediaGroupId, tx: mpsc::UnboundedSender<MediaGroupRequest>) -> Self {
        Self { id, tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MediaGroupRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(MediaGroupId::new(), tx), rx)
    }

    fn send(&self, command: MediaGroupCommand) -> Result<()> {
        debug!("Media group {} <- {:?}", self.id, command);
        self.tx
            .send(MediaGroupRequest {
                group: self.id.clone(),
                command,
            })
            .map_err(|_| ControllerError::MediaGroup(format!("Media group {} is gone", self.id)))
    }
}

#[async_trait]
impl MediaGroup for ChannelMediaGroup {
    fn id(&self) -> &MediaGroupId {
        &self.id
    }

    async fn observe(&self, observer: ControllerRef) -> Result<()> {
        self.send(MediaGroupCommand::Observe(observer))
    }

    async fn stop_observing(&self, observer: &ControllerId) -> Result<()> {
        self.send(MediaGroupCommand::StopObserving(observer.clone()))
    }

    async fn start(&self) -> Result<()> {
        self.send(MediaGroupCommand::Start)
    }

    async fn stop(&self) -> Result<()> {
        self.send(MediaGroupCommand::Stop)
    }

    async fn stop_media(&self, stop: Stop) -> Result<()> {
        self.send(MediaGroupCommand::StopMedia(stop))
    }

    async fn record(&self, request: Record) -> Result<()> {
        self.send(MediaGroupCommand::Record(request))
    }

    async fn play(&self, request: Play) -> Result<()> {
        self.send(MediaGroupCommand::Play(request))
    }

    async fn collect(&self, request: Collect) -> Result<()> {
        self.send(MediaGroupCommand::Collect(request))
    }

    async fn destroy(&self) -> Result<()> {
        self.send(MediaGroupCommand::Destroy)
    }
}
