use crate::error::{AppError, AppResult};
use std::time::Duration;
use tokio::task;
use tokio::time::sleep;

pub async fn run_blocking<F, T>(func: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(func).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn pace(interval: Duration) {
    if !interval.is_zero() {
        sleep(interval).await;
    }
}
