use std::{process, sync::Arc};

use streamlog::{
    application::{
        entries::{EntryService, NotifyMode},
        error::AppError,
        notify::{
            HubOutcome, NotificationPipeline, SiteLinks, webmention::WebmentionDispatcher,
            websub::HubNotifier,
        },
        render::{ComrakRenderer, ContentRenderer},
        reply::ReplyContextFetcher,
        repos::EntriesRepo,
        syndication::{FeedMeta, SyndicationService},
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminToken, HttpState, SiteInfo},
        memory::InMemoryEntries,
        outbound, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Resend(args) => run_resend(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let (repo, db) = init_repository(&settings).await?;
    let app = build_application_context(repo, db, &settings, notify_mode(&settings.webmention))?;

    if !app.http_state.admin_token.is_configured() {
        warn!(
            target = "streamlog::serve",
            "No admin token configured; the admin API rejects every request"
        );
    }

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "streamlog::serve",
        addr = %settings.server.addr,
        site = %settings.site.host,
        "Listening"
    );

    axum::serve(listener, http::build_router(app.http_state).into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_resend(settings: config::Settings, args: config::ResendArgs) -> Result<(), AppError> {
    let (repo, db) = init_repository(&settings).await?;
    let app = build_application_context(repo, db, &settings, NotifyMode::Off)?;

    let report = app
        .entries
        .resend(&args.id)
        .await?
        .ok_or_else(|| AppError::unexpected("notification pipeline is not configured"))?;

    info!(
        target = "streamlog::resend",
        entry_id = %report.entry_id,
        sent = report.sent(),
        links = report.links.len(),
        hub = report.hub.as_ref().map(HubOutcome::describe).as_deref(),
        "Resend completed"
    );

    let summary = serde_json::to_string_pretty(&report.summary())
        .map_err(|err| AppError::unexpected(format!("failed to encode report: {err}")))?;
    println!("{summary}");
    Ok(())
}

fn notify_mode(webmention: &config::WebmentionSettings) -> NotifyMode {
    match (webmention.enabled, webmention.background) {
        (false, _) => NotifyMode::Off,
        (true, false) => NotifyMode::Inline,
        (true, true) => NotifyMode::Background,
    }
}

async fn init_repository(
    settings: &config::Settings,
) -> Result<(Arc<dyn EntriesRepo>, Option<Arc<PostgresRepositories>>), AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!(
            target = "streamlog::storage",
            "No database url configured; entries are kept in memory and lost on exit"
        );
        return Ok((Arc::new(InMemoryEntries::new()), None));
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let repositories = Arc::new(PostgresRepositories::new(
        pool,
        settings.database.namespace.as_str(),
    ));
    let repo: Arc<dyn EntriesRepo> = repositories.clone();
    Ok((repo, Some(repositories)))
}

struct ApplicationContext {
    entries: Arc<EntryService>,
    http_state: HttpState,
}

fn build_application_context(
    repo: Arc<dyn EntriesRepo>,
    db: Option<Arc<PostgresRepositories>>,
    settings: &config::Settings,
    mode: NotifyMode,
) -> Result<ApplicationContext, AppError> {
    let renderer: Arc<dyn ContentRenderer> =
        Arc::new(ComrakRenderer::new(settings.site.bridges.clone()));
    let site_links = SiteLinks::new(&settings.site.host);

    let client = outbound::build_client(settings.webmention.timeout).map_err(AppError::from)?;
    let dispatcher =
        WebmentionDispatcher::new(client.clone(), settings.webmention.concurrency.get() as usize);
    let replies = ReplyContextFetcher::new(client.clone());
    let hub = HubNotifier::new(client, settings.websub.hub_url.clone());
    let pipeline =
        NotificationPipeline::new(renderer.clone(), site_links.clone(), dispatcher, hub);

    let entries = EntryService::new(repo).with_notifications(pipeline, mode);

    let syndication = SyndicationService::new(
        entries.clone(),
        renderer.clone(),
        site_links.clone(),
        FeedMeta {
            title: settings.site.title.clone(),
            author: settings.site.author.clone(),
            hub: settings.websub.hub_url.clone(),
        },
    );

    let admin_token = AdminToken::new(settings.admin.token.as_deref());

    let entries = Arc::new(entries);
    let http_state = HttpState {
        entries: entries.clone(),
        syndication: Arc::new(syndication),
        renderer,
        replies: Arc::new(replies),
        site: Arc::new(SiteInfo {
            title: settings.site.title.clone(),
            author: settings.site.author.clone(),
            links: site_links,
            hub: settings.websub.hub_url.as_ref().map(ToString::to_string),
            fedsoc_bridge: settings.site.fedsoc_bridge.clone(),
        }),
        admin_token: Arc::new(admin_token),
        db,
    };

    Ok(ApplicationContext {
        entries,
        http_state,
    })
}
