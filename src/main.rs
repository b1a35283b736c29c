use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sora_console::api::{ApiKeysApi, Content};
use sora_console::config::{self, Config};
use sora_console::errors::{Action, ConsoleError};
use sora_console::models::page::MAX_PAGE_SIZE;
use sora_console::models::{
    Account, AccountFilter, AccountRequest, ApiKey, ApiKeyFilter, ApiKeyRequest, Character, CharacterFilter,
    DashboardStats, Group, GroupFilter, GroupRequest, PageRequest, SettingsPatch, Task, TaskFilter,
};
use sora_console::presentation::{dashboard_lines, enabled_badge, progress_bar, HasBadge};
use sora_console::reconcile::{self, ImportAction, TokenKind};
use sora_console::session::AppContext;
use sora_console::sync::{
    ListController, ListSource, Record, RecordSource, RecordWatch, SnapshotWatch, Tracked, WatchState,
};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let cfg = config::load()?;
    init_tracing(cfg.log_json);

    let result = run(cfg, args.command).await;
    if let Err(ref e) = result {
        eprintln!("Error: {:#}", e);
    }
    result
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sora_console=info"));
    let registry = tracing_subscriber::registry().with(filter);
    // stdout carries the tables; logs go to stderr.
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cfg: Config, command: cli::Commands) -> anyhow::Result<()> {
    // A dry-run import never talks to the backend, so it needs no session.
    if let cli::Commands::Account {
        command: cli::AccountCommands::Import { file, dry_run: true, .. },
    } = &command
    {
        return preview_import(file);
    }

    let ctx = AppContext::new(cfg)?;
    ctx.sign_in().await.map_err(fail(Action::Login))?;

    let result = match command {
        cli::Commands::Whoami => handle_whoami(&ctx).await,
        cli::Commands::Dashboard { watch } => handle_dashboard(&ctx, watch).await,
        cli::Commands::Account { command } => handle_account_command(&ctx, command).await,
        cli::Commands::Group { command } => handle_group_command(&ctx, command).await,
        cli::Commands::Key { command } => handle_key_command(&ctx, command).await,
        cli::Commands::Task { command } => handle_task_command(&ctx, command).await,
        cli::Commands::Character { command } => handle_character_command(&ctx, command).await,
        cli::Commands::Settings { command } => handle_settings_command(&ctx, command).await,
        cli::Commands::Version => handle_version(&ctx).await,
    };
    ctx.teardown();
    result
}

/// Turn a client error into the message an operator should see.
fn fail(action: Action) -> impl Fn(ConsoleError) -> anyhow::Error {
    move |e| {
        tracing::debug!(error = ?e, "request failed");
        anyhow::anyhow!(e.user_message(action))
    }
}

async fn handle_whoami(ctx: &AppContext) -> anyhow::Result<()> {
    let me = ctx.client.auth().me().await.map_err(fail(Action::Load))?;
    println!("{} ({:?})", me.username, me.role);
    Ok(())
}

async fn handle_version(ctx: &AppContext) -> anyhow::Result<()> {
    let v = ctx.client.settings().version().await.map_err(fail(Action::Load))?;
    println!("Current: {}", v.current);
    println!("Latest:  {}", if v.latest.is_empty() { "unknown" } else { &v.latest });
    if v.has_update {
        println!("An update is available.");
    }
    Ok(())
}

async fn handle_dashboard(ctx: &AppContext, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let stats = ctx.client.dashboard().stats().await.map_err(fail(Action::Load))?;
        print_dashboard(&stats);
        return Ok(());
    }

    let mut dash = SnapshotWatch::start(ctx.client.dashboard(), ctx.config.poll.dashboard);
    loop {
        tokio::select! {
            state = dash.changed() => match state {
                Some(state) => {
                    if let Some(stats) = &state.value {
                        print_dashboard(stats);
                    }
                    if let Some(err) = &state.error {
                        eprintln!("refresh failed: {}", err);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    dash.stop();
    Ok(())
}

fn print_dashboard(s: &DashboardStats) {
    for line in dashboard_lines(s) {
        println!("{}", line);
    }
}

async fn handle_account_command(ctx: &AppContext, cmd: cli::AccountCommands) -> anyhow::Result<()> {
    let api = ctx.client.accounts();
    match cmd {
        cli::AccountCommands::List {
            status,
            group,
            keyword,
            page,
        } => {
            let filter = AccountFilter {
                status,
                group_id: group,
                keyword,
            };
            let page = api
                .list(&filter, PageRequest::new(page, ctx.config.page_size))
                .await
                .map_err(fail(Action::Load))?;
            if page.list.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<6} {:<30} {:<16} {:<16} {:>9} {:<9}",
                    "ID", "NAME", "GROUP", "STATUS", "REMAINING", "ENABLED"
                );
                for a in &page.list {
                    println!(
                        "{:<6} {:<30} {:<16} {:<16} {:>9} {:<9}",
                        a.id,
                        a.display_name(),
                        a.group_name,
                        a.status.badge().plain(),
                        match a.remaining_count {
                            n if n < 0 => "-".to_string(),
                            n => n.to_string(),
                        },
                        enabled_badge(a.enabled).plain()
                    );
                }
                println!("Page {}/{} ({} total)", page.page, page.total_pages().max(1), page.total);
            }
        }
        cli::AccountCommands::Add {
            name,
            access_token,
            refresh_token,
            group,
        } => {
            let req = AccountRequest {
                name,
                access_token,
                refresh_token,
                group_id: group,
                enabled: Some(true),
            };
            let a = api.create(&req).await.map_err(fail(Action::Create))?;
            println!("Account created:");
            print_account(&a);
        }
        cli::AccountCommands::Update {
            id,
            name,
            access_token,
            refresh_token,
            group,
            ungroup,
            enable,
            disable,
        } => {
            let current: Account = find_record(&api, AccountFilter::default(), id).await?;
            let mut req = current.to_update();
            if let Some(name) = name {
                req.name = name;
            }
            req.access_token = access_token;
            req.refresh_token = refresh_token;
            if ungroup {
                req.group_id = None;
            } else if group.is_some() {
                req.group_id = group;
            }
            if enable {
                req.enabled = Some(true);
            } else if disable {
                req.enabled = Some(false);
            }
            let a = api.update(id, &req).await.map_err(fail(Action::Update))?;
            println!("Account updated:");
            print_account(&a);
        }
        cli::AccountCommands::Delete { id } => {
            api.delete(id).await.map_err(fail(Action::Delete))?;
            println!("Account {} deleted.", id);
        }
        cli::AccountCommands::Refresh { id } => {
            let a = api.refresh(id).await.map_err(fail(Action::Refresh))?;
            println!("Token refreshed.");
            print_account(&a);
        }
        cli::AccountCommands::Sync { id } => {
            let a = api.sync_status(id).await.map_err(fail(Action::Sync))?;
            print_account(&a);
        }
        cli::AccountCommands::Reveal { id } => {
            let tokens = api.reveal_tokens(id).await.map_err(fail(Action::Reveal))?;
            println!("Access token:  {}", tokens.access_token.expose());
            if tokens.refresh_token.is_empty() {
                println!("Refresh token: (none)");
            } else {
                println!("Refresh token: {}", tokens.refresh_token.expose());
            }
        }
        cli::AccountCommands::Import { file, group, .. } => {
            let lines = read_lines(&file)?;
            let report = api.batch_import(&lines, group).await.map_err(fail(Action::Import))?;
            println!("{:<16} {:<36} {:<8} ERROR", "TOKEN", "EMAIL", "RESULT");
            for d in &report.details {
                let action = match d.action {
                    ImportAction::Created => "created",
                    ImportAction::Updated => "updated",
                    ImportAction::Failed => "failed",
                };
                println!("{:<16} {:<36} {:<8} {}", d.token, d.email, action, d.error);
            }
            println!(
                "{} lines: {} created, {} updated, {} failed",
                report.total, report.created, report.updated, report.failed
            );
        }
    }
    Ok(())
}

fn print_account(a: &Account) {
    println!("  ID:        {}", a.id);
    println!("  Name:      {}", a.display_name());
    println!("  Email:     {}", a.email);
    println!("  Status:    {}", a.status.badge().plain());
    println!("  Tokens:    AT {}  RT {}", a.at_hint, if a.rt_hint.is_empty() { "-" } else { &a.rt_hint });
    if let Some(exp) = a.token_expires_at {
        println!("  Expires:   {}", exp);
    }
    if !a.plan_title.is_empty() {
        println!("  Plan:      {}", a.plan_title);
    }
    if a.remaining_count >= 0 {
        println!("  Remaining: {}", a.remaining_count);
    }
    if !a.last_error.is_empty() {
        println!("  Error:     {}", a.last_error);
    }
}

fn read_lines(file: &Path) -> anyhow::Result<Vec<String>> {
    let mut raw = String::new();
    if file == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read tokens from stdin")?;
    } else {
        raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    }
    Ok(raw.lines().map(str::to_string).collect())
}

fn preview_import(file: &Path) -> anyhow::Result<()> {
    let lines = read_lines(file)?;
    let rows = reconcile::preview(&lines);
    if rows.is_empty() {
        println!("No tokens found.");
        return Ok(());
    }
    println!("{:<16} {:<8} {:<36} NOTE", "TOKEN", "KIND", "EMAIL");
    for r in &rows {
        let kind = match r.kind {
            TokenKind::Refresh => "refresh",
            TokenKind::Access => "access",
        };
        println!(
            "{:<16} {:<8} {:<36} {}",
            r.token,
            kind,
            r.email.as_deref().unwrap_or("-"),
            r.warning.as_deref().unwrap_or("")
        );
    }
    let warnings = rows.iter().filter(|r| r.warning.is_some()).count();
    println!("{} lines, {} with warnings. Nothing was sent.", rows.len(), warnings);
    Ok(())
}

async fn handle_group_command(ctx: &AppContext, cmd: cli::GroupCommands) -> anyhow::Result<()> {
    let api = ctx.client.groups();
    match cmd {
        cli::GroupCommands::List { keyword, page } => {
            let filter = GroupFilter { enabled: None, keyword };
            let page = api
                .list(&filter, PageRequest::new(page, ctx.config.page_size))
                .await
                .map_err(fail(Action::Load))?;
            if page.list.is_empty() {
                println!("No groups found.");
            } else {
                println!("{:<6} {:<24} {:>8} {:<9} DESCRIPTION", "ID", "NAME", "ACCOUNTS", "ENABLED");
                for g in &page.list {
                    println!(
                        "{:<6} {:<24} {:>8} {:<9} {}",
                        g.id,
                        g.name,
                        g.account_count,
                        enabled_badge(g.enabled).plain(),
                        g.description
                    );
                }
            }
        }
        cli::GroupCommands::Add { name, description } => {
            let req = GroupRequest {
                name,
                description,
                enabled: Some(true),
            };
            let g = api.create(&req).await.map_err(fail(Action::Create))?;
            println!("Group created: {} (ID {})", g.name, g.id);
        }
        cli::GroupCommands::Update {
            id,
            name,
            description,
            enable,
            disable,
        } => {
            let current: Group = find_record(&api, GroupFilter::default(), id).await?;
            let mut req = current.to_update();
            if let Some(name) = name {
                req.name = name;
            }
            if let Some(description) = description {
                req.description = description;
            }
            if enable {
                req.enabled = Some(true);
            } else if disable {
                req.enabled = Some(false);
            }
            let g = api.update(id, &req).await.map_err(fail(Action::Update))?;
            println!("Group updated: {} (ID {})", g.name, g.id);
        }
        cli::GroupCommands::Delete { id } => {
            api.delete(id).await.map_err(fail(Action::Delete))?;
            // Membership changed server-side; count what is now ungrouped.
            let accounts = ctx
                .client
                .accounts()
                .list(&AccountFilter::default(), PageRequest::new(1, MAX_PAGE_SIZE))
                .await
                .map_err(fail(Action::Load))?;
            let ungrouped = accounts.list.iter().filter(|a| a.group_id.is_none()).count();
            println!("Group {} deleted. {} accounts on the first page are ungrouped.", id, ungrouped);
        }
    }
    Ok(())
}

async fn handle_key_command(ctx: &AppContext, cmd: cli::KeyCommands) -> anyhow::Result<()> {
    let api = ctx.client.api_keys();
    match cmd {
        cli::KeyCommands::List { group, keyword, page } => {
            let filter = ApiKeyFilter {
                enabled: None,
                group_id: group,
                keyword,
            };
            let page = api
                .list(&filter, PageRequest::new(page, ctx.config.page_size))
                .await
                .map_err(fail(Action::Load))?;
            if page.list.is_empty() {
                println!("No API keys found.");
            } else {
                println!(
                    "{:<6} {:<24} {:<16} {:<16} {:>8} {:<9}",
                    "ID", "NAME", "KEY", "GROUP", "USES", "ENABLED"
                );
                for k in &page.list {
                    println!(
                        "{:<6} {:<24} {:<16} {:<16} {:>8} {:<9}",
                        k.id,
                        k.name,
                        k.key_hint,
                        if k.group_name.is_empty() { "-" } else { &k.group_name },
                        k.usage_count,
                        enabled_badge(k.enabled).plain()
                    );
                }
            }
        }
        cli::KeyCommands::Add { name, group, key } => {
            let req = ApiKeyRequest {
                name,
                key,
                group_id: group,
                enabled: Some(true),
            };
            let mut created = api.create(&req).await.map_err(fail(Action::Create))?;
            println!("API key created (ID {}).", created.record.id);
            if let Some(secret) = created.secret.take() {
                println!("  Key: {}", secret.expose());
                println!("Store it now; it is only shown once. Use `key reveal` to see it again.");
            }
        }
        cli::KeyCommands::Update {
            id,
            name,
            group,
            ungroup,
        } => {
            let current: ApiKey = find_record(&api, ApiKeyFilter::default(), id).await?;
            let mut req = current.to_update();
            if let Some(name) = name {
                req.name = name;
            }
            if ungroup {
                req.group_id = None;
            } else if group.is_some() {
                req.group_id = group;
            }
            let k = api.update(id, &req).await.map_err(fail(Action::Update))?;
            println!("API key {} updated.", k.id);
        }
        cli::KeyCommands::Enable { id } => set_key_enabled(&api, id, true).await?,
        cli::KeyCommands::Disable { id } => set_key_enabled(&api, id, false).await?,
        cli::KeyCommands::Delete { id } => {
            api.delete(id).await.map_err(fail(Action::Delete))?;
            println!("API key {} deleted.", id);
        }
        cli::KeyCommands::Reveal { id } => {
            let key = api.reveal(id).await.map_err(fail(Action::Reveal))?;
            println!("{}", key.expose());
        }
    }
    Ok(())
}

async fn set_key_enabled(api: &ApiKeysApi, id: i64, enabled: bool) -> anyhow::Result<()> {
    let current: ApiKey = find_record(api, ApiKeyFilter::default(), id).await?;
    let k = api.set_enabled(&current, enabled).await.map_err(fail(Action::Update))?;
    println!("API key {} {}.", k.id, enabled_badge(k.enabled).plain());
    Ok(())
}

async fn handle_task_command(ctx: &AppContext, cmd: cli::TaskCommands) -> anyhow::Result<()> {
    let api = ctx.client.tasks();
    match cmd {
        cli::TaskCommands::List {
            status,
            kind,
            page,
            watch,
        } => {
            let filter = TaskFilter { status, kind };
            let list = ListController::new(api, filter, ctx.config.page_size, ctx.config.poll.list);
            run_list(list, page, watch, print_tasks).await?;
        }
        cli::TaskCommands::Show { id, follow } => {
            if follow {
                follow_record(api, id, ctx, print_task).await?;
            } else {
                let t = api.get(&id).await.map_err(fail(Action::Load))?;
                print_task(&t);
            }
        }
        cli::TaskCommands::Download { id, output } => {
            let task = api.get(&id).await.map_err(fail(Action::Load))?;
            let content = api.content(&task).await.map_err(fail(Action::Download))?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.{}", task.id, task.kind.extension())));
            save_content(content, &path).await?;
        }
    }
    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    println!("{:<28} {:<6} {:<14} {:<17} PROMPT", "ID", "TYPE", "STATUS", "PROGRESS");
    for t in tasks {
        let prompt: String = t.prompt.chars().take(40).collect();
        println!(
            "{:<28} {:<6} {:<14} {:<17} {}",
            t.id,
            t.kind.as_str(),
            t.status.badge().plain(),
            progress_bar(t.progress, 10),
            prompt
        );
    }
}

fn print_task(t: &Task) {
    println!("  ID:       {}", t.id);
    println!("  Type:     {}  Model: {}", t.kind.as_str(), t.model);
    println!("  Status:   {}", t.status.badge().colored());
    println!("  Progress: {}", progress_bar(t.progress, 20));
    if !t.error_message.is_empty() {
        println!("  Error:    {}", t.error_message);
    }
}

async fn handle_character_command(ctx: &AppContext, cmd: cli::CharacterCommands) -> anyhow::Result<()> {
    let api = ctx.client.characters();
    match cmd {
        cli::CharacterCommands::List {
            status,
            public,
            page,
            watch,
        } => {
            let filter = CharacterFilter {
                status,
                is_public: public,
            };
            let list = ListController::new(api, filter, ctx.config.page_size, ctx.config.poll.list);
            run_list(list, page, watch, print_characters).await?;
        }
        cli::CharacterCommands::Show { id, follow } => {
            if follow {
                follow_record(api, id, ctx, print_character).await?;
            } else {
                let c = api.get(&id).await.map_err(fail(Action::Load))?;
                print_character(&c);
            }
        }
        cli::CharacterCommands::Delete { id } => {
            api.delete(&id).await.map_err(fail(Action::Delete))?;
            println!("Character {} deleted.", id);
        }
        cli::CharacterCommands::Visibility { id } => {
            let mut character = api.get(&id).await.map_err(fail(Action::Load))?;
            let change = api
                .toggle_visibility(&mut character)
                .await
                .map_err(fail(Action::ToggleVisibility))?;
            println!(
                "Character {} is now {}.",
                character.id,
                if change.is_public { "public" } else { "private" }
            );
        }
        cli::CharacterCommands::Image { id, output } => {
            let content = api.image(&id).await.map_err(fail(Action::Download))?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.png", id)));
            save_content(content, &path).await?;
        }
    }
    Ok(())
}

fn print_characters(items: &[Character]) {
    println!("{:<28} {:<24} {:<12} {:<7} ACCOUNT", "ID", "NAME", "STATUS", "PUBLIC");
    for c in items {
        println!(
            "{:<28} {:<24} {:<12} {:<7} {}",
            c.id,
            if c.display_name.is_empty() { &c.username } else { &c.display_name },
            c.status.badge().plain(),
            if c.is_public { "yes" } else { "no" },
            c.account_email
        );
    }
}

fn print_character(c: &Character) {
    println!("  ID:       {}", c.id);
    println!("  Name:     {} (@{})", c.display_name, c.username);
    println!("  Status:   {}", c.status.badge().colored());
    println!("  Public:   {}", c.is_public);
    if !c.profile_url.is_empty() {
        println!("  Profile:  {}", c.profile_url);
    }
    if !c.error_message.is_empty() {
        println!("  Error:    {}", c.error_message);
    }
}

async fn handle_settings_command(ctx: &AppContext, cmd: cli::SettingsCommands) -> anyhow::Result<()> {
    let api = ctx.client.settings();
    match cmd {
        cli::SettingsCommands::Show => {
            let settings = api.get().await.map_err(fail(Action::Load))?;
            for (key, value) in settings.entries() {
                println!("{:<28} {}", key, value);
            }
        }
        cli::SettingsCommands::Set { pairs } => {
            let mut patch = SettingsPatch::new();
            for (key, value) in pairs {
                patch = patch.set(&key, value).map_err(fail(Action::SaveSettings))?;
            }
            let settings = api.update(&patch).await.map_err(fail(Action::SaveSettings))?;
            println!("Settings saved.");
            for (key, value) in settings.entries() {
                println!("{:<28} {}", key, value);
            }
        }
        cli::SettingsCommands::TestProxy { url } => {
            let url = match url {
                Some(url) => url,
                None => api.get().await.map_err(fail(Action::Load))?.proxy_url,
            };
            if url.is_empty() {
                anyhow::bail!("No proxy configured; pass one to test.");
            }
            let probe = api.test_proxy(&url).await.map_err(fail(Action::Load))?;
            if probe.success {
                println!(
                    "Proxy OK: HTTP {} in {} ms",
                    probe.status_code.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                    probe.latency
                );
            } else {
                println!("Proxy failed after {} ms: {}", probe.latency, probe.error);
            }
        }
    }
    Ok(())
}

/// Locate a record by id across every page of an unfiltered list.
async fn find_record<S>(source: &S, filter: S::Filter, id: <S::Item as Record>::Id) -> anyhow::Result<S::Item>
where
    S: ListSource,
{
    let mut page = 1;
    loop {
        let batch = source
            .fetch_page(&filter, PageRequest::new(page, MAX_PAGE_SIZE))
            .await
            .map_err(fail(Action::Load))?;
        if let Some(found) = batch.list.iter().find(|r| r.id() == id) {
            return Ok(found.clone());
        }
        if batch.list.is_empty() || page >= batch.total_pages() {
            anyhow::bail!("record {:?} not found", id);
        }
        page += 1;
    }
}

/// Print one page, and with `watch` keep reprinting it as the poller
/// replaces it until Ctrl-C.
async fn run_list<S, F>(list: ListController<S>, page: u32, watch: bool, print: F) -> anyhow::Result<()>
where
    S: ListSource,
    F: Fn(&[S::Item]),
{
    let mut updates = list.subscribe();
    if page > 1 {
        list.set_page(page).await;
    } else {
        list.open().await;
    }
    render_list(&list, &print);
    if !watch {
        list.close();
        return Ok(());
    }
    if !list.is_polling() {
        println!("Nothing in this view can still change; not watching.");
        list.close();
        return Ok(());
    }
    updates.borrow_and_update();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                render_list(&list, &print);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    list.close();
    Ok(())
}

fn render_list<S: ListSource, F: Fn(&[S::Item])>(list: &ListController<S>, print: &F) {
    let snap = list.snapshot();
    if let Some(err) = &snap.error {
        eprintln!("refresh failed: {}", err);
    }
    if snap.items.is_empty() {
        println!("Nothing found.");
    } else {
        print(&snap.items);
    }
    println!(
        "Page {}/{} ({} total){}",
        snap.page,
        snap.total_pages.max(1),
        snap.total,
        if snap.polling { ", refreshing" } else { "" }
    );
}

async fn follow_record<S, T, F>(source: S, id: T::Id, ctx: &AppContext, print: F) -> anyhow::Result<()>
where
    S: RecordSource<Item = T>,
    T: Tracked,
    F: Fn(&T),
{
    let mut watch = RecordWatch::start(source, id, ctx.config.poll.record);
    loop {
        tokio::select! {
            state = watch.changed() => match state {
                Some(WatchState::Loading) => {}
                Some(WatchState::Live(r)) => print(&r),
                Some(WatchState::Settled(r)) => {
                    print(&r);
                    break;
                }
                Some(WatchState::Vanished) => {
                    println!("It no longer exists.");
                    break;
                }
                Some(WatchState::Failed { message, .. }) => eprintln!("refresh failed: {}", message),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    watch.stop();
    Ok(())
}

async fn save_content(content: Content, path: &Path) -> anyhow::Result<()> {
    let kind = content.content_type().unwrap_or("application/octet-stream").to_string();
    let written = content.save(path).await.map_err(fail(Action::Download))?;
    println!("Saved {} ({} bytes, {}).", path.display(), written, kind);
    Ok(())
}
