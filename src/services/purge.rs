//! Bulk deletion of everything below the adapter root.

use super::{listing::PrefixWalker, object_handle::Object, swift_fs::SwiftFs};
use crate::{
    client::ClientError,
    errors::{Error, Result},
};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
};
use tracing::{debug, info, warn};

impl SwiftFs {
    /// Delete every object below the root, directory markers included, then
    /// the container itself when the adapter is at the container root.
    ///
    /// One producer walks the tree into a queue holding at most `transfers`
    /// objects; `transfers` workers delete from it. A listing error wins over
    /// deletion errors, which are reported together as `DeleteFailed`.
    pub async fn purge(&self) -> Result<()> {
        if self.container().is_empty() {
            return Err(Error::ContainerRequired);
        }
        let transfers = self.options().transfers.max(1);
        let (tx, rx) = mpsc::channel::<Object>(transfers);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker in 0..transfers {
            let rx = rx.clone();
            workers.spawn(async move {
                let mut failures = Vec::new();
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(mut object) = next else { break };
                    match object.remove().await {
                        Ok(()) => debug!("worker {}: deleted {}", worker, object),
                        Err(err) => {
                            warn!("{}: couldn't delete: {}", object, err);
                            failures.push(err);
                        }
                    }
                }
                failures
            });
        }

        let walked = self.queue_everything(tx).await;

        let mut failures = Vec::new();
        while let Some(joined) = workers.join_next().await {
            failures.extend(joined?);
        }
        walked?;

        let count = failures.len();
        if let Some(first) = failures.into_iter().next() {
            return Err(Error::DeleteFailed {
                count,
                first: Box::new(first),
            });
        }

        self.rmdir("").await?;
        info!("purged {}", self);
        Ok(())
    }

    /// Feed every key below the root into `tx`. Dropping `tx` on return
    /// tells the workers to finish.
    async fn queue_everything(&self, tx: mpsc::Sender<Object>) -> Result<()> {
        let mut walker =
            PrefixWalker::new(self.client().clone(), self.container(), self.root(), "", true);
        let mut queued = 0usize;
        loop {
            let page = match walker.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(ClientError::ContainerNotFound) => return Err(Error::DirectoryNotFound),
                Err(err) => return Err(err.into()),
            };
            for raw in page {
                let object = self.new_object_with_info(&raw.remote, Some(raw.info)).await?;
                if tx.send(object).await.is_err() {
                    debug!("purge workers gone after {} objects", queued);
                    return Ok(());
                }
                queued += 1;
            }
        }
        debug!("queued {} objects for deletion", queued);
        Ok(())
    }
}
