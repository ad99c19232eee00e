//! Process entry point: brings up the primary and mega-carpool Postgres
//! pools, applies pending migrations, and schedules the periodic jobs each
//! component crate exposes as a plain async function. Nothing here holds
//! business logic — it is wiring only.

use std::sync::Arc;

use bytemark_cache::{CacheRepo, TicketCacheService};
use chrono::Utc;
use ledger::{ReaperRepo, RewardRepo};
use microsurvey::{
    ActorRegistry, FallbackPushTimeScheduler, LlmPushTimeScheduler, PushTimeScheduler, SurveyOrchestrator,
    SurveyRepo, TriggerRequest, TriggerSelector, trigger_microsurvey,
};
use parkmobile_monitor::{MonitorRepo, ParkMobileMonitor};
use secrecy::SecretString;
use shared_utils::config::Settings;
use tokio_cron_scheduler::{Job, JobScheduler};
use trajectory_validator::{PgTrajectoryRepo, carpool_block_validation_job};
use upstream_clients::bytemark::BytemarkClient;
use upstream_clients::parkmobile::ParkMobileClient;
use upstream_clients::queue::HttpQueueClient;

/// The single microsurvey this deployment drives; batch triggers and the
/// completion reward are both scoped to this id.
const PRIMARY_SURVEY_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;

    portal_db::db::migrate::run_postgres(&settings.database_url)?;
    // The mega-carpool database itself is only touched by the carpool
    // relation manager (C6), which runs out of the request path, not this
    // process — keeping its schema current here regardless, since this is
    // the only place migrations are ever applied.
    mega_carpool::pool::run_migrations(&settings.mega_carpool_database_url)?;

    let pool = portal_db::pool::build_pool(&settings.database_url)?;

    let scheduler = JobScheduler::new().await?;

    // C1 — escrow/points reaper.
    let reaper = Arc::new(ReaperRepo::new(pool.clone()));
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _lock| {
            let reaper = Arc::clone(&reaper);
            Box::pin(async move {
                match reaper.clear_old_pending_pt(Utc::now()).await {
                    Ok(updated) => tracing::info!(updated, "clear_old_pending_pt"),
                    Err(err) => tracing::warn!(%err, "clear_old_pending_pt failed"),
                }
            })
        })?)
        .await?;

    // C4 — Bytemark ticket cache: periodic timeout sweep plus bootstrap.
    let ticket_cache = Arc::new(TicketCacheService::new(
        CacheRepo::new(pool.clone()),
        Arc::new(BytemarkClient::new(settings.bytemark_base_url.clone())?),
    ));
    {
        let ticket_cache = Arc::clone(&ticket_cache);
        scheduler
            .add(Job::new_async("0 */15 * * * *", move |_uuid, _lock| {
                let ticket_cache = Arc::clone(&ticket_cache);
                Box::pin(async move {
                    match ticket_cache.sweep_timeouts(Utc::now()).await {
                        Ok(refreshed) => tracing::info!(refreshed, "bytemark cache timeout sweep"),
                        Err(err) => tracing::warn!(%err, "bytemark cache timeout sweep failed"),
                    }
                })
            })?)
            .await?;
    }
    {
        let ticket_cache = Arc::clone(&ticket_cache);
        scheduler
            .add(Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
                let ticket_cache = Arc::clone(&ticket_cache);
                Box::pin(async move {
                    match ticket_cache.build_cache_if_empty(Utc::now()).await {
                        Ok(built) => tracing::info!(built, "bytemark cache bootstrap"),
                        Err(err) => tracing::warn!(%err, "bytemark cache bootstrap failed"),
                    }
                })
            })?)
            .await?;
    }

    // C5 — ParkMobile monitor: ongoing-alert sweep, finish/expire sweep,
    // token rotation, cache purge.
    let queue_client: Arc<dyn upstream_clients::queue::QueueClient> =
        Arc::new(HttpQueueClient::new(settings.queue_dispatch_url.clone())?);
    let notifications = Arc::new(notification::NotificationRepo::new(pool.clone(), queue_client));
    let parkmobile_client = ParkMobileClient::new(
        format!("{}/connect/token", settings.parkmobile_base_url),
        SecretString::from(settings.parkmobile_client_id.clone()),
        SecretString::from(settings.parkmobile_client_secret.clone()),
    )?;
    let parkmobile = Arc::new(ParkMobileMonitor::new(
        MonitorRepo::new(pool.clone()),
        Arc::clone(&notifications),
        parkmobile_client,
    ));
    {
        let parkmobile = Arc::clone(&parkmobile);
        scheduler
            .add(Job::new_async("0 * * * * *", move |_uuid, _lock| {
                let parkmobile = Arc::clone(&parkmobile);
                Box::pin(async move {
                    match parkmobile.check_on_going_events(Utc::now()).await {
                        Ok(alerted) => tracing::info!(alerted, "parkmobile ongoing sweep"),
                        Err(err) => tracing::warn!(%err, "parkmobile ongoing sweep failed"),
                    }
                })
            })?)
            .await?;
    }
    {
        let parkmobile = Arc::clone(&parkmobile);
        scheduler
            .add(Job::new_async("0 * * * * *", move |_uuid, _lock| {
                let parkmobile = Arc::clone(&parkmobile);
                Box::pin(async move {
                    match parkmobile.check_finished_and_expired_events(Utc::now()).await {
                        Ok((expired, finished)) => {
                            tracing::info!(expired, finished, "parkmobile finish/expire sweep")
                        }
                        Err(err) => tracing::warn!(%err, "parkmobile finish/expire sweep failed"),
                    }
                })
            })?)
            .await?;
    }
    {
        let parkmobile = Arc::clone(&parkmobile);
        scheduler
            .add(Job::new_async("0 */30 * * * *", move |_uuid, _lock| {
                let parkmobile = Arc::clone(&parkmobile);
                Box::pin(async move {
                    if let Err(err) = parkmobile.update_token(Utc::now()).await {
                        tracing::warn!(%err, "parkmobile token rotation failed");
                    }
                })
            })?)
            .await?;
    }
    {
        let parkmobile = Arc::clone(&parkmobile);
        scheduler
            .add(Job::new_async("0 0 4 * * *", move |_uuid, _lock| {
                let parkmobile = Arc::clone(&parkmobile);
                Box::pin(async move {
                    match parkmobile.purge_outdated_cache(Utc::now()).await {
                        Ok((tokens, events)) => {
                            tracing::info!(tokens, events, "parkmobile cache purge")
                        }
                        Err(err) => tracing::warn!(%err, "parkmobile cache purge failed"),
                    }
                })
            })?)
            .await?;
    }

    // C7 — daily trajectory validation batch, scored against yesterday's
    // unvalidated driver/rider trip pairs.
    let trajectory_repo = Arc::new(PgTrajectoryRepo::new(pool.clone()));
    scheduler
        .add(Job::new_async("0 0 2 * * *", move |_uuid, _lock| {
            let trajectory_repo = Arc::clone(&trajectory_repo);
            Box::pin(async move {
                let now = Utc::now();
                let since = now - chrono::Duration::hours(24);
                let scored = carpool_block_validation_job(trajectory_repo.as_ref(), since, now, now).await;
                tracing::info!(scored, "carpool_block_validation_job");
            })
        })?)
        .await?;

    // C8 — microsurvey orchestrator: timer rehydration sweep plus the
    // daily onboarding batch.
    let push_scheduler: Box<dyn PushTimeScheduler> = match (
        settings.microsurvey_llm_endpoint.clone(),
        settings.microsurvey_llm_api_key.clone(),
    ) {
        (Some(endpoint), Some(api_key)) => Box::new(LlmPushTimeScheduler::new(
            reqwest::Client::new(),
            endpoint,
            SecretString::from(api_key),
        )),
        _ => Box::new(FallbackPushTimeScheduler),
    };
    let orchestrator = Arc::new(SurveyOrchestrator::new(
        SurveyRepo::new(pool.clone()),
        RewardRepo::new(pool.clone()),
        Arc::clone(&notifications),
        push_scheduler,
    ));
    let registry = ActorRegistry::new(Arc::clone(&orchestrator), settings.microsurvey_actor_cap as usize);

    // Rehydration is a startup-only catch-up for snapshots a prior crash
    // left with no outstanding schedule — not a recurring job, since
    // re-running it against an actor with a pending schedule would just
    // keep pushing that schedule back.
    match orchestrator.rehydrate_overdue_timers(Utc::now()).await {
        Ok(count) => tracing::info!(count, "microsurvey timer rehydration"),
        Err(err) => tracing::warn!(%err, "microsurvey timer rehydration failed"),
    }
    {
        let orchestrator = Arc::clone(&orchestrator);
        scheduler
            .add(Job::new_async("0 * * * * *", move |_uuid, _lock| {
                let orchestrator = Arc::clone(&orchestrator);
                Box::pin(async move {
                    let dispatched = orchestrator.dispatch_due_pushes(Utc::now()).await;
                    if dispatched > 0 {
                        tracing::info!(dispatched, "microsurvey push dispatch");
                    }
                })
            })?)
            .await?;
    }
    {
        let registry = Arc::clone(&registry);
        let survey_repo = Arc::new(SurveyRepo::new(pool.clone()));
        scheduler
            .add(Job::new_async("0 0 9 * * *", move |_uuid, _lock| {
                let registry = Arc::clone(&registry);
                let survey_repo = Arc::clone(&survey_repo);
                Box::pin(async move {
                    let request = TriggerRequest {
                        selector: TriggerSelector::StartMicrosurvey,
                        survey_id: PRIMARY_SURVEY_ID,
                        limitation: 500,
                        settime_ms: 250,
                    };
                    match trigger_microsurvey(&registry, &survey_repo, request, Utc::now()).await {
                        Ok(summary) => tracing::info!(
                            dispatched = summary.dispatched,
                            failed = summary.failed,
                            "microsurvey onboarding batch"
                        ),
                        Err(err) => tracing::warn!(%err, "microsurvey onboarding batch failed"),
                    }
                })
            })?)
            .await?;
    }

    scheduler.start().await?;
    tracing::info!("system_manager scheduler started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    Ok(())
}
