use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use crate::domain::diff::DiffNode;
use crate::error::AppResult;
use crate::services::{DiffProvider, TokenCounter};

/// Fetches the diff of every file in the tree and records its token count.
///
/// Up to `concurrency` fetches are outstanding at once. Results land back on the
/// file they were requested for, whatever order they complete in. The first
/// provider error aborts the collection and is returned.
pub async fn collect_diffs(
    mut root: DiffNode,
    provider: &dyn DiffProvider,
    tokens: &dyn TokenCounter,
    concurrency: usize,
) -> AppResult<DiffNode> {
    let changes = root
        .files()
        .into_iter()
        .map(|diff| diff.change().clone())
        .collect::<Vec<_>>();

    let texts = stream::iter(changes.iter())
        .map(|change| provider.diff(change))
        .buffered(concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await?;

    for (file, text) in root.files_mut().into_iter().zip(texts) {
        file.replace_diff(text, tokens);
        debug!(file = file.file(), tokens = file.token_count(), "collected diff");
    }

    Ok(root)
}
