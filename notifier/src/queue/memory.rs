//! In-process broker used by the pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, Stream};

use super::Publish;
use crate::consumer::Acknowledge;

#[derive(Default)]
pub struct MemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    acked: Arc<Mutex<Vec<u64>>>,
}

pub struct MemoryDelivery {
    tag: u64,
    data: Vec<u8>,
    acked: Arc<Mutex<Vec<u64>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages still waiting on `queue`.
    pub fn pending(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    /// Raw payloads waiting on `queue`, without consuming them.
    pub fn peek(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues
            .lock()
            .unwrap()
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn acked(&self) -> Vec<u64> {
        self.acked.lock().unwrap().clone()
    }

    /// Hand every message currently on `queue` to a consumer.
    pub fn deliveries(
        &self,
        queue: &str,
    ) -> impl Stream<Item = Result<MemoryDelivery, Infallible>> + Unpin {
        let drained: Vec<_> = self
            .queues
            .lock()
            .unwrap()
            .get_mut(queue)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default();

        let acked = Arc::clone(&self.acked);
        stream::iter(drained.into_iter().enumerate().map(move |(i, data)| {
            Ok(MemoryDelivery {
                tag: i as u64 + 1,
                data,
                acked: Arc::clone(&acked),
            })
        }))
    }
}

#[async_trait]
impl Publish for MemoryQueue {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        self.queues
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_vec());
        Ok(())
    }
}

#[async_trait]
impl Acknowledge for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn tag(&self) -> u64 {
        self.tag
    }

    async fn ack(&self) -> Result<()> {
        self.acked.lock().unwrap().push(self.tag);
        Ok(())
    }
}
