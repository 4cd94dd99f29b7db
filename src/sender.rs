pub mod jsonl {
    use crate::handle::Sender;
    use crate::heartbeat::{HeartBeat, SendResult};
    use anyhow::{Context as _, Result};
    use std::io::Write;

    /// Writes every heartbeat as one JSON object per line.
    pub struct JsonLinesSender<W> {
        inner: W,
    }

    impl<W: Write> JsonLinesSender<W> {
        const STATUS_CREATED: u16 = 201;

        pub fn new(inner: W) -> Self {
            Self { inner }
        }

        pub fn into_inner(self) -> W {
            self.inner
        }
    }

    impl<W: Write> Sender for JsonLinesSender<W> {
        fn send(&mut self, heartbeats: Vec<HeartBeat>) -> Result<Vec<SendResult>> {
            let mut results = Vec::with_capacity(heartbeats.len());

            for heartbeat in heartbeats {
                serde_json::to_writer(&mut self.inner, &heartbeat)
                    .with_context(|| format!("failed to write heartbeat {}", heartbeat.id()))?;
                self.inner
                    .write_all(b"\n")
                    .context("failed to terminate heartbeat record")?;

                results.push(SendResult {
                    status: Self::STATUS_CREATED,
                    heartbeat,
                });
            }

            self.inner.flush().context("failed to flush heartbeats")?;

            Ok(results)
        }
    }

}
