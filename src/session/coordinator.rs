//! Batch coordinator - runs every configured target
//!
//! Each target gets its own page and runs as a separate task. Concurrency is
//! bounded by a semaphore sized from `max-concurrent-pages`; the tasks share
//! only the configuration, the session gate and the rate limiter.
//!
//! Per target the pipeline is:
//! 1. Acquire a slot from the origin's rate limiter
//! 2. Navigate and let the session gate inspect the page
//! 3. Check for login walls, backing off and retrying on a block signal
//! 4. Wait for the item list, read the header, then paginate and collect items
//! 5. For Instagram profiles, open each collected post for its numbers
//! 6. Summarize, or fall back to the public endpoint in guest mode
//!
//! Failures stay with their target, except authentication failures, which
//! abort the whole batch.

use super::fetcher::{build_http_client, fetch_public_profile};
use super::report::{DataSource, ScrapeReport};
use super::scheduler::RateLimiter;
use super::SessionGate;
use crate::browser::{Browser, PageFactory, PageOptions, Scope};
use crate::config::{Config, TargetEntry};
use crate::extract::{ExtractionRecord, FieldValue, ItemCollector, ItemExtractor, Selector, SelectorResolver};
use crate::metrics::{summarize, ProfileCounters};
use crate::paginate::{PaginationConfig, ScrollPaginator};
use crate::platform::{preset, target_url, Platform, Preset, TargetKind};
use crate::state::TargetState;
use crate::url::extract_origin;
use crate::ScrapeError;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Runs a batch of targets against a page factory
pub struct Coordinator<F, G> {
    worker: TargetWorker<F, G>,
}

impl<F, G> Coordinator<F, G>
where
    F: PageFactory + 'static,
    G: SessionGate + 'static,
{
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `factory` - Opens one page per target
    /// * `gate` - Session check applied after every navigation
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ScrapeError)` - The HTTP client for guest mode could not be built
    pub fn new(config: Config, factory: F, gate: G) -> Result<Self, ScrapeError> {
        let client = if config.engine.guest_mode {
            Some(build_http_client()?)
        } else {
            None
        };
        let limiter = RateLimiter::new(config.rate_limit.clone());

        Ok(Self {
            worker: TargetWorker {
                config: Arc::new(config),
                factory: Arc::new(factory),
                gate: Arc::new(gate),
                limiter: Arc::new(limiter),
                client,
                public_base_url: Platform::Instagram.base_url().to_string(),
            },
        })
    }

    /// Overrides the root URL of the public profile endpoint
    pub fn with_public_endpoint(mut self, base_url: &str) -> Self {
        self.worker.public_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &Config {
        &self.worker.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.worker.limiter
    }

    /// Runs every target and returns their reports in configuration order
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ScrapeReport>)` - One report per target, failed ones included
    /// * `Err(ScrapeError::Authentication)` - The session was rejected; the
    ///   remaining targets were cancelled
    pub async fn run(&self) -> Result<Vec<ScrapeReport>, ScrapeError> {
        let targets = &self.worker.config.targets;
        let permits = self.worker.config.rate_limit.max_concurrent_pages.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(permits));
        tracing::info!("Starting batch of {} targets ({} pages at a time)", targets.len(), permits);

        let mut tasks = JoinSet::new();
        for (position, target) in targets.iter().cloned().enumerate() {
            let worker = self.worker.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => worker.scrape(&target).await,
                    Err(e) => Err(ScrapeError::Task(e.to_string())),
                };
                (position, result)
            });
        }

        let mut slots: Vec<Option<ScrapeReport>> = vec![None; targets.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, Ok(report))) => slots[position] = Some(report),
                Ok((_, Err(e))) if e.is_session_fatal() => {
                    tracing::error!("Aborting batch: {}", e);
                    tasks.abort_all();
                    return Err(e);
                }
                Ok((position, Err(e))) => {
                    let target = &targets[position];
                    slots[position] = Some(failed_report(target, TargetState::Failed, &e));
                }
                Err(e) => tracing::error!("Target task failed: {}", e),
            }
        }

        let reports: Vec<ScrapeReport> = slots
            .into_iter()
            .zip(targets.iter())
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| {
                    failed_report(target, TargetState::Failed, &ScrapeError::Task("task panicked".to_string()))
                })
            })
            .collect();

        let succeeded = reports.iter().filter(|r| r.state.is_success()).count();
        tracing::info!("Batch finished: {}/{} targets succeeded", succeeded, reports.len());
        Ok(reports)
    }
}

/// Shared handles moved into each target task
struct TargetWorker<F, G> {
    config: Arc<Config>,
    factory: Arc<F>,
    gate: Arc<G>,
    limiter: Arc<RateLimiter>,
    client: Option<Client>,
    public_base_url: String,
}

impl<F, G> Clone for TargetWorker<F, G> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            factory: Arc::clone(&self.factory),
            gate: Arc::clone(&self.gate),
            limiter: Arc::clone(&self.limiter),
            client: self.client.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }
}

impl<F, G> TargetWorker<F, G>
where
    F: PageFactory,
    G: SessionGate,
{
    /// Scrapes one target
    ///
    /// Only session-fatal errors are returned as `Err`; everything else ends
    /// up in the report's state.
    async fn scrape(&self, target: &TargetEntry) -> Result<ScrapeReport, ScrapeError> {
        let label = target.label();

        let url = match target_url(target) {
            Ok(url) => url,
            Err(e) => return Ok(failed_report(target, TargetState::Failed, &e.into())),
        };
        let mut report = ScrapeReport::new(label.clone(), target.platform, target.kind, url.to_string());
        let origin = extract_origin(&url).unwrap_or_else(|| target.platform.as_str().to_string());

        let preset = match preset(target.platform, target.kind) {
            Ok(preset) => preset,
            Err(e) => return Ok(report.fail(TargetState::Failed, e)),
        };

        let options = PageOptions {
            headless: self.config.engine.headless,
        };
        let mut page = match self.factory.open(target, &options).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(target = %label, error = %e, "Could not open page");
                return Ok(report.fail(TargetState::NavigationFailed, e));
            }
        };

        report.state = TargetState::Navigating;
        if let Err(e) = self.load(&mut page, &url, &origin, &preset, &label, target).await {
            if e.is_session_fatal() {
                return Err(e);
            }
            if matches!(e, ScrapeError::Blocked { .. }) && self.can_fall_back(target) {
                return match self.fall_back(&mut report, target, &origin, &preset).await {
                    Ok(()) => Ok(report),
                    Err(fallback) => {
                        tracing::warn!(target = %label, error = %fallback, "Public endpoint fallback failed");
                        Ok(report.fail(TargetState::Blocked, e))
                    }
                };
            }
            tracing::warn!(target = %label, error = %e, "Target failed");
            let state = failure_state(&e);
            return Ok(report.fail(state, e));
        }

        report.state = TargetState::Extracting;
        self.extract(&mut page, &preset, &label, &mut report).await;

        let page_gave_nothing = report.counters.followers == 0 || report.records.is_empty();
        if page_gave_nothing && self.can_fall_back(target) {
            match self.fall_back(&mut report, target, &origin, &preset).await {
                Ok(()) => {
                    self.limiter.report_success(&origin).await;
                    return Ok(report);
                }
                Err(e) => {
                    tracing::warn!(target = %label, error = %e, "Public endpoint fallback failed, keeping page data");
                }
            }
        }

        if self.visits_posts(target) {
            drop(page);
            self.visit_posts(target, &origin, &label, &mut report).await?;
        }

        report.summary = Some(summarize(&report.records, &report.counters, &preset.metrics));
        report.state = self.final_state(&report);
        report.scraped_at = Utc::now();
        self.limiter.report_success(&origin).await;

        tracing::info!(
            target = %label,
            state = %report.state,
            records = report.records.len(),
            partial = report.partial_records(),
            "Target finished"
        );
        Ok(report)
    }

    /// Navigates until the page shows content instead of a block signal
    async fn load(
        &self,
        page: &mut F::Page,
        url: &Url,
        origin: &str,
        preset: &Preset,
        label: &str,
        target: &TargetEntry,
    ) -> Result<(), ScrapeError> {
        let max_retries = self.config.rate_limit.max_block_retries;
        let mut blocks = 0u32;

        loop {
            self.limiter.acquire(origin).await?;

            tracing::debug!(target = label, url = %url, "Navigating");
            page.navigate(url.as_str())
                .await
                .map_err(|e| ScrapeError::Navigation {
                    target: label.to_string(),
                    reason: e.to_string(),
                })?;

            self.gate.prepare(page).await?;

            let signal = match detect_block(&*page, &preset.block_signals).await {
                Some(signal) => signal,
                None => return Ok(()),
            };

            let blocked = ScrapeError::Blocked {
                target: label.to_string(),
                signal,
            };

            // The public endpoint does not need the page, no point in waiting
            if self.can_fall_back(target) {
                return Err(blocked);
            }

            blocks += 1;
            let backoff = self.limiter.report_block(origin).await;
            if blocks > max_retries {
                return Err(blocked);
            }
            tracing::info!(
                target = label,
                retry = blocks,
                backoff_ms = backoff.as_millis() as u64,
                "Blocked, retrying after backoff"
            );
        }
    }

    /// Reads the header and paginates through the item list
    async fn extract(&self, page: &mut F::Page, preset: &Preset, label: &str, report: &mut ScrapeReport) {
        let engine = &self.config.engine;
        let extractor = self.extractor(label);

        let appeared = extractor
            .resolver()
            .wait_for(
                page,
                &preset.item_selectors,
                Duration::from_millis(engine.wait_for_items),
                Duration::from_millis(engine.inter_attempt_delay.max(1)),
            )
            .await;
        if !appeared {
            tracing::debug!(target = label, "Item list did not appear");
        }

        let header = extractor
            .extract_one(&*page, &Scope::Document, &preset.header_schema)
            .await;
        report.counters = ProfileCounters::from_record(&header);
        report.profile = Some(header);

        let scrollable = scroll_container(&*page, &preset.scroll_container).await;
        let paginator = ScrollPaginator::new(
            PaginationConfig::from(engine),
            preset.signature.clone(),
            preset.action.clone(),
        )
        .with_target(label);

        let mut collector = ItemCollector::new();
        let mut state = paginator.begin(&*page, &scrollable).await;
        loop {
            let added = collector
                .collect(
                    &extractor,
                    page,
                    &Scope::Document,
                    &preset.item_selectors,
                    &preset.item_schema,
                    engine.max_items,
                )
                .await;
            tracing::trace!(target = label, added, total = collector.len(), "Collected items");

            if collector.is_full(engine.max_items) || state.phase(paginator.config()).is_terminal() {
                break;
            }
            paginator.step(page, &scrollable, &mut state).await;
        }

        report.pagination = Some(paginator.outcome(&state));
        report.records = collector.into_records();
    }

    fn extractor(&self, label: &str) -> ItemExtractor {
        let engine = &self.config.engine;
        ItemExtractor::new(
            SelectorResolver::new(Duration::from_millis(engine.locator_timeout)),
            Duration::from_millis(engine.field_budget),
        )
        .with_reveal(engine.reveal_items)
        .with_target(label)
    }

    fn visits_posts(&self, target: &TargetEntry) -> bool {
        self.config.engine.post_details
            && target.platform == Platform::Instagram
            && target.kind == TargetKind::Profile
    }

    /// Opens every collected post link and merges the post page's numbers
    /// into its grid record
    ///
    /// A post that cannot be opened keeps its grid values. A block signal or
    /// an exhausted rate limit stops the remaining visits. Only
    /// session-fatal errors are returned.
    async fn visit_posts(
        &self,
        target: &TargetEntry,
        origin: &str,
        label: &str,
        report: &mut ScrapeReport,
    ) -> Result<(), ScrapeError> {
        let post = match preset(target.platform, TargetKind::Post) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(target = label, error = %e, "No post preset, skipping post pages");
                return Ok(());
            }
        };
        let extractor = self.extractor(label);
        let options = PageOptions {
            headless: self.config.engine.headless,
        };
        let mut visited = 0usize;

        for record in report.records.iter_mut() {
            let link = record.text("link").to_string();
            if link.is_empty() {
                continue;
            }

            let entry = target.post_target(&link);
            let url = match target_url(&entry) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(target = label, link = %link, error = %e, "Skipping unusable post link");
                    continue;
                }
            };

            if let Err(e) = self.limiter.acquire(origin).await {
                tracing::warn!(target = label, error = %e, "Stopping post visits");
                break;
            }

            let mut page = match self.factory.open(&entry, &options).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(target = label, url = %url, error = %e, "Could not open post page");
                    continue;
                }
            };
            if let Err(e) = page.navigate(url.as_str()).await {
                tracing::warn!(target = label, url = %url, error = %e, "Post navigation failed");
                continue;
            }

            self.gate.prepare(&mut page).await?;

            if let Some(signal) = detect_block(&page, &post.block_signals).await {
                self.limiter.report_block(origin).await;
                tracing::warn!(target = label, url = %url, signal = %signal, "Post page blocked, stopping post visits");
                break;
            }

            let details = extractor
                .extract_one(&page, &Scope::Document, &post.header_schema)
                .await;
            merge_post_details(record, &details);
            visited += 1;
        }

        tracing::info!(target = label, visited, records = report.records.len(), "Visited post pages");
        Ok(())
    }

    fn can_fall_back(&self, target: &TargetEntry) -> bool {
        self.client.is_some()
            && target.platform == Platform::Instagram
            && target.kind == TargetKind::Profile
    }

    /// Replaces the report's numbers with the public endpoint's
    async fn fall_back(
        &self,
        report: &mut ScrapeReport,
        target: &TargetEntry,
        origin: &str,
        preset: &Preset,
    ) -> Result<(), ScrapeError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ScrapeError::Task("no HTTP client in this session".to_string()))?;
        let username = target.username.as_deref().unwrap_or_default();

        self.limiter.acquire(origin).await?;
        let public = fetch_public_profile(
            client,
            &self.public_base_url,
            username,
            self.config.engine.max_items,
        )
        .await?;

        tracing::info!(
            target = %report.target,
            followers = public.counters.followers,
            records = public.records.len(),
            "Using public endpoint data"
        );

        report.counters = public.counters;
        report.records = public.records;
        report.source = DataSource::PublicEndpoint;
        report.summary = Some(summarize(&report.records, &report.counters, &preset.metrics));
        report.state = TargetState::Completed;
        report.error = None;
        report.scraped_at = Utc::now();
        Ok(())
    }

    /// Completed when every record is whole and the list was exhausted or
    /// the item cap was reached; Partial otherwise
    fn final_state(&self, report: &ScrapeReport) -> TargetState {
        let max_items = self.config.engine.max_items;
        let header_partial = report.profile.as_ref().map_or(false, |p| p.partial);
        let converged = report.pagination.as_ref().map_or(true, |p| p.converged);
        let full = max_items != 0 && report.records.len() >= max_items;

        if !header_partial && report.partial_records() == 0 && (converged || full) {
            TargetState::Completed
        } else {
            TargetState::Partial
        }
    }
}

/// Returns the text of the first block signal present on the page
async fn detect_block<B: Browser>(page: &B, signals: &[Selector]) -> Option<String> {
    for signal in signals {
        match page.query_one(&Scope::Document, signal).await {
            Ok(Some(_)) => return Some(signal.to_string()),
            Ok(None) => {}
            Err(e) => tracing::debug!(signal = %signal, error = %e, "Block signal query failed"),
        }
    }
    None
}

/// Copies the post page's counts and texts onto a grid record
///
/// Counts keep the larger of the two readings, since grid overlays and post
/// pages each miss numbers on some layouts. Texts are taken when non-empty.
fn merge_post_details(record: &mut ExtractionRecord, details: &ExtractionRecord) {
    for name in ["likes", "comments"] {
        let count = record.count(name).max(details.count(name));
        record.fields.insert(name.to_string(), FieldValue::Count(count));
    }
    for name in ["caption", "posted_at"] {
        let text = details.text(name);
        if !text.is_empty() {
            record
                .fields
                .insert(name.to_string(), FieldValue::Text(text.to_string()));
        }
    }
}

/// First matching scroll container, or the document
async fn scroll_container<B: Browser>(page: &B, candidates: &[Selector]) -> Scope<B::Node> {
    for selector in candidates {
        if let Ok(Some(node)) = page.query_one(&Scope::Document, selector).await {
            return Scope::Element(node);
        }
    }
    Scope::Document
}

fn failure_state(error: &ScrapeError) -> TargetState {
    match error {
        ScrapeError::RateLimited { .. } => TargetState::RateLimited,
        ScrapeError::Navigation { .. } | ScrapeError::Browser(_) => TargetState::NavigationFailed,
        ScrapeError::Blocked { .. } => TargetState::Blocked,
        _ => TargetState::Failed,
    }
}

fn failed_report(target: &TargetEntry, state: TargetState, error: &ScrapeError) -> ScrapeReport {
    let url = target_url(target).map(|url| url.to_string()).unwrap_or_default();
    ScrapeReport::new(target.label(), target.platform, target.kind, url).fail(state, error)
}
