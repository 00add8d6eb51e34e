use anyhow::Result;
use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type Task = BoxFuture<'static, Result<()>>;

/// Runs `tasks` side by side until one of them fails or `cancel_token` fires.
///
/// A failing task cancels the token so the others wind down as well. After
/// cancellation the remaining tasks are awaited, letting the server finish
/// its in-flight requests.
pub async fn join_all(tasks: Vec<Task>, cancel_token: CancellationToken) -> Result<()> {
  let mut set = JoinSet::new();
  for task in tasks {
    set.spawn(task);
  }

  loop {
    tokio::select! {
      joined = set.join_next() => match joined {
        Some(Ok(Ok(()))) => continue,
        Some(Ok(Err(e))) => {
          cancel_token.cancel();
          return Err(e);
        },
        Some(Err(e)) => {
          cancel_token.cancel();
          return Err(e.into());
        },
        None => return Ok(()),
      },
      _ = cancel_token.cancelled() => {
        debug!("Receive cancel signal...");
        break;
      },
    }
  }

  while let Some(joined) = set.join_next().await {
    match joined {
      Ok(Ok(())) => {},
      Ok(Err(e)) => warn!("Task failed while shutting down: {:?}", e),
      Err(e) => warn!("Task panicked while shutting down: {}", e),
    }
  }

  Ok(())
}
