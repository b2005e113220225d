//! Bounded, staggered evidence fetching for gap filling

use futures::stream::{self, StreamExt};
use quarry_domain::{EvidenceSource, GapDescriptor, ServiceError};
use quarry_llm::{cancellable_sleep, RetryPolicy};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Evidence retrieved for one gap
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    /// Gap the evidence was fetched for
    pub gap: GapDescriptor,

    /// Raw evidence text
    pub text: String,
}

/// Fetch evidence for `gaps`
///
/// At most `concurrency` fetches are in flight. Fetch `i` starts no earlier
/// than `i * stagger` after the call began. Each fetch goes through `retry`;
/// fetches that still fail with a non-fatal error, or return blank text, are
/// logged and skipped. Results come back in gap order.
///
/// # Errors
///
/// `ServiceError::Cancelled` when the token fires before all fetches finish,
/// or the first fatal error (in gap order) any fetch returned.
pub async fn fetch_evidence<E>(
    source: &E,
    gaps: &[GapDescriptor],
    concurrency: usize,
    stagger: Duration,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Vec<Evidence>, ServiceError>
where
    E: EvidenceSource + ?Sized,
{
    if gaps.is_empty() {
        return Ok(Vec::new());
    }

    let started = Instant::now();
    debug!(gaps = gaps.len(), concurrency, "Fetching evidence");

    let fetches = gaps.iter().enumerate().map(|(index, gap)| async move {
        let offset = stagger.saturating_mul(index as u32);
        let wait = (started + offset).saturating_duration_since(Instant::now());
        cancellable_sleep(wait, cancel).await?;

        let query = gap.follow_up_query.as_str();
        let fetched = retry
            .run(cancel, "evidence_fetch", move || source.fetch(query, cancel))
            .await;
        Ok::<_, ServiceError>((index, gap, fetched))
    });

    let completed: Vec<_> = stream::iter(fetches)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    if cancel.is_cancelled() {
        info!("Evidence fetching cancelled");
        return Err(ServiceError::Cancelled);
    }

    let mut completed = completed.into_iter().collect::<Result<Vec<_>, _>>()?;
    completed.sort_by_key(|(index, _, _)| *index);

    let mut evidence = Vec::with_capacity(completed.len());
    for (index, gap, fetched) in completed {
        match fetched {
            Ok(text) if !text.trim().is_empty() => evidence.push(Evidence { gap: gap.clone(), text }),
            Ok(_) => debug!(area = %gap.area, index, "Evidence fetch returned no text"),
            Err(ServiceError::Cancelled) => return Err(ServiceError::Cancelled),
            Err(e) if e.is_fatal() => {
                warn!(area = %gap.area, query = %gap.follow_up_query, "Evidence fetch failed fatally: {}", e);
                return Err(e);
            }
            Err(e) => warn!(area = %gap.area, query = %gap.follow_up_query, "Evidence fetch failed: {}", e),
        }
    }

    info!(requested = gaps.len(), retrieved = evidence.len(), "Evidence fetched");
    Ok(evidence)
}
