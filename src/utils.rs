use anyhow::{anyhow, Error, Result};
use tokio::sync::mpsc::channel;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type Task = futures::future::BoxFuture<'static, Result<()>>;

/// Runs the long-lived tasks until one of them fails or shutdown is requested.
///
/// The first error is returned and cancels the remaining tasks through `cancel_token`.
pub async fn join_all(tasks: Vec<Task>, cancel_token: CancellationToken) -> Result<()> {
  let (sender, mut receiver) = channel::<Error>(1);
  for task in tasks {
    let sender = sender.clone();
    tokio::spawn(async move {
      if let Err(e) = task.await {
        // Only the first error is reported, later ones find the receiver gone.
        let _ = sender.send(e).await;
      }
    });
  }
  drop(sender);

  tokio::select! {
    biased;
    _ = cancel_token.cancelled() => {
      debug!("Receive cancel signal...");

      Ok(())
    },
    res = receiver.recv() => {
      cancel_token.cancel();

      match res {
        Some(err) => Err(err),
        None => Err(anyhow!("All tasks stopped before shutdown was requested")),
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use futures::FutureExt;

  use super::*;

  #[tokio::test]
  async fn test_first_error_cancels_everything() {
    let cancel_token = CancellationToken::new();
    let waiter = {
      let cancel_token = cancel_token.clone();
      async move {
        cancel_token.cancelled().await;
        Ok(())
      }
    };

    let result = join_all(
      vec![waiter.boxed(), async { Err(anyhow!("boom")) }.boxed()],
      cancel_token.clone(),
    )
    .await;

    assert_eq!(result.unwrap_err().to_string(), "boom");
    assert!(cancel_token.is_cancelled());
  }

  #[tokio::test]
  async fn test_cancel_stops_waiting() {
    let cancel_token = CancellationToken::new();
    let forever = async {
      tokio::time::sleep(Duration::from_secs(3600)).await;
      Ok(())
    };

    cancel_token.cancel();

    assert!(join_all(vec![forever.boxed()], cancel_token).await.is_ok());
  }
}
