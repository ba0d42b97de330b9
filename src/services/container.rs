//! Lazy creation and deletion of the working container.

use crate::{
    client::{ClientError, ObjectClient},
    errors::Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// What is known locally about the container's existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerState {
    /// Not checked yet; it may or may not exist.
    Unknown,
    /// Created or confirmed by this adapter.
    Exists,
    /// Deleted by this adapter.
    Deleted,
}

/// Serializes creation and deletion of one container and caches success.
///
/// The mutex is held across the store round trips, so concurrent `ensure`
/// calls issue at most one creation and all observe its outcome.
#[derive(Debug)]
pub struct ContainerLifecycle {
    name: String,
    no_check: bool,
    state: Mutex<ContainerState>,
}

impl ContainerLifecycle {
    pub fn new(name: impl Into<String>, no_check: bool) -> Self {
        Self {
            name: name.into(),
            no_check,
            state: Mutex::new(ContainerState::Unknown),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> ContainerState {
        *self.state.lock().await
    }

    /// Make sure the container exists, creating it if needed.
    pub async fn ensure(&self, client: &dyn ObjectClient) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == ContainerState::Exists {
            return Ok(());
        }

        let mut exists = false;
        if !self.no_check {
            match client.container_info(&self.name).await {
                Ok(_) => exists = true,
                Err(ClientError::ContainerNotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }
        if !exists {
            create_container(client, &self.name).await?;
            info!("created container {:?}", self.name);
        }
        *state = ContainerState::Exists;
        Ok(())
    }

    /// Delete the container. The cached state only changes on success.
    pub async fn destroy(&self, client: &dyn ObjectClient) -> Result<()> {
        let mut state = self.state.lock().await;
        client.delete_container(&self.name).await?;
        *state = ContainerState::Deleted;
        info!("deleted container {:?}", self.name);
        Ok(())
    }
}

/// Create `name`, treating an existing container as success.
pub(crate) async fn create_container(client: &dyn ObjectClient, name: &str) -> Result<()> {
    match client.create_container(name).await {
        Ok(()) => Ok(()),
        Err(ClientError::ContainerExists) => {
            debug!("container {:?} already exists", name);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::{Call, MemoryClient};
    use std::sync::Arc;

    fn creates(client: &MemoryClient) -> usize {
        client
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateContainer(_)))
            .count()
    }

    #[tokio::test]
    async fn test_concurrent_ensure_creates_once() {
        let client = Arc::new(MemoryClient::new());
        let lifecycle = Arc::new(ContainerLifecycle::new("photos", false));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = client.clone();
            let lifecycle = lifecycle.clone();
            handles.push(tokio::spawn(async move {
                lifecycle.ensure(client.as_ref()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(creates(&client), 1);
        assert!(client.has_container("photos"));
        assert_eq!(lifecycle.state().await, ContainerState::Exists);
    }

    #[tokio::test]
    async fn test_existing_container_is_not_recreated() {
        let client = MemoryClient::new();
        client.seed_container("photos");
        let lifecycle = ContainerLifecycle::new("photos", false);
        lifecycle.ensure(&client).await.unwrap();
        assert_eq!(creates(&client), 0);
    }

    #[tokio::test]
    async fn test_no_check_treats_existing_as_success() {
        let client = MemoryClient::new();
        client.seed_container("photos");
        let lifecycle = ContainerLifecycle::new("photos", true);
        lifecycle.ensure(&client).await.unwrap();
        assert_eq!(creates(&client), 1);
        assert_eq!(lifecycle.state().await, ContainerState::Exists);
    }

    #[tokio::test]
    async fn test_failed_creation_is_not_cached() {
        let client = MemoryClient::new();
        client.fail_create_container("photos");
        let lifecycle = ContainerLifecycle::new("photos", false);
        assert!(lifecycle.ensure(&client).await.is_err());
        assert_eq!(lifecycle.state().await, ContainerState::Unknown);
    }

    #[tokio::test]
    async fn test_destroy_only_clears_on_success() {
        let client = MemoryClient::new();
        let lifecycle = ContainerLifecycle::new("photos", false);
        lifecycle.ensure(&client).await.unwrap();
        client.seed_object("photos", "k", b"x", "text/plain", Default::default());

        assert!(lifecycle.destroy(&client).await.is_err());
        assert_eq!(lifecycle.state().await, ContainerState::Exists);

        client.delete("photos", "k").await.unwrap();
        lifecycle.destroy(&client).await.unwrap();
        assert_eq!(lifecycle.state().await, ContainerState::Deleted);

        // A later write recreates it.
        lifecycle.ensure(&client).await.unwrap();
        assert!(client.has_container("photos"));
    }
}
