use crate::error::{AppError, AppResult};
use crate::model::common::Page;
use crate::utils::pace;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::future::Future;
use std::time::Duration;

struct Cursor<F> {
    fetch: F,
    offset: u32,
    fetched_any: bool,
    done: bool,
}

pub fn paginate<'a, T, F, Fut>(limit: u32, pacing: Duration, fetch: F) -> BoxStream<'a, AppResult<T>>
where
    T: Send + 'a,
    F: FnMut(u32, u32) -> Fut + Send + 'a,
    Fut: Future<Output = AppResult<Page<T>>> + Send + 'a,
{
    let cursor = Cursor {
        fetch,
        offset: 0,
        fetched_any: false,
        done: false,
    };

    stream::try_unfold(cursor, move |mut cursor| async move {
        if cursor.done {
            return Ok::<_, AppError>(None);
        }
        if cursor.fetched_any {
            pace(pacing).await;
        }

        let page = (cursor.fetch)(limit, cursor.offset).await?;
        cursor.fetched_any = true;
        if page.has_next && !page.items.is_empty() {
            cursor.offset = cursor.offset.saturating_add(limit);
        } else {
            cursor.done = true;
        }
        Ok(Some((page.items, cursor)))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, AppError>)))
    .try_flatten()
    .boxed()
}
