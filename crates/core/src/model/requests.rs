use std::collections::BTreeMap;

use crate::model::graph::NodeId;

/// Independent request streams. Each channel applies only its newest
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Files,
    FileContent,
    TraceEvents,
    Graph,
    /// Header preview text for one graph node.
    Preview(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub channel: Channel,
    pub seq: u64,
}

/// Issues monotonically increasing tokens and remembers the newest one per
/// channel, so a slow response for a superseded request is discarded
/// instead of overwriting newer state.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    next_seq: u64,
    latest: BTreeMap<Channel, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next token for `channel`. Any earlier token on the same
    /// channel stops being current, so its response will be dropped.
    pub fn issue(&mut self, channel: Channel) -> RequestToken {
        self.next_seq += 1;
        self.latest.insert(channel, self.next_seq);
        RequestToken {
            channel,
            seq: self.next_seq,
        }
    }

    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.latest.get(&token.channel) == Some(&token.seq)
    }

    /// Accept `token`'s response if it is the newest for its channel.
    /// A channel completes at most once per issued token.
    pub fn complete(&mut self, token: &RequestToken) -> bool {
        if self.is_current(token) {
            self.latest.remove(&token.channel);
            true
        } else {
            false
        }
    }

    /// Forget any outstanding request on `channel`.
    pub fn retire(&mut self, channel: Channel) {
        self.latest.remove(&channel);
    }

    pub fn retire_previews(&mut self) {
        self.latest
            .retain(|channel, _| !matches!(channel, Channel::Preview(_)));
    }

    pub fn is_pending(&self, channel: Channel) -> bool {
        self.latest.contains_key(&channel)
    }

    pub fn pending(&self) -> usize {
        self.latest.len()
    }
}
