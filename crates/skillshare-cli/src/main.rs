//! skillshare — thin CLI adapter over `skillshare-core`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use skillshare_core::audit::Severity;
use skillshare_core::check::update::{UpdateOptions, run_update};
use skillshare_core::config::{Config, ConfigStore, TargetConfig};
use skillshare_core::discovery::{discover, tracked_repos};
use skillshare_core::install::{InstallOptions, UninstallOptions, install, uninstall};
use skillshare_core::oplog;
use skillshare_core::registry;
use skillshare_core::sync::engine::{SyncOptions, SyncSkill, sync};
use skillshare_core::sync::target::Target;
use skillshare_core::types::LinkMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "skillshare")]
#[command(about = "Syncs a library of AI-assistant skills across tool directories", long_about = None)]
struct Cli {
    /// Operate on the project-scope config in this directory (or an
    /// ancestor of it) instead of searching upward from the cwd.
    #[arg(long, short = 'p', global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new config at the resolved scope.
    Init {
        #[arg(long)]
        source: Option<String>,
    },
    /// Install a skill or tracked repo into the source tree.
    Install {
        source: String,
        #[arg(long)]
        track: bool,
        #[arg(long = "into")]
        group: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        skip_audit: bool,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove one or more installed skills.
    Uninstall {
        names: Vec<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Materialize skills into every configured target.
    Sync {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        target: Option<String>,
    },
    /// Compare local metadata against remote state.
    Check {
        names: Vec<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Pull tracked repos and reinstall stale skills.
    Update {
        names: Vec<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        prune: bool,
        #[arg(long)]
        skip_audit: bool,
        #[arg(long)]
        diff: bool,
        #[arg(short = 'T', long, default_value = "critical")]
        threshold: Severity,
        #[arg(long)]
        dry_run: bool,
    },
    /// List discovered skills.
    List {
        pattern: Option<String>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        verbose: bool,
    },
    /// Report pending changes for a target.
    Diff {
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        stat: bool,
    },
    /// Summarize scope, source, and target health.
    Status,
    /// Validate the current scope's configuration and source tree.
    Doctor,
    /// Scan every installed skill for unsafe content.
    Audit {
        #[arg(short = 'T', long, default_value = "critical")]
        threshold: Severity,
    },
    /// Snapshot target directories.
    Backup {
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        list: bool,
        #[arg(long)]
        cleanup: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Restore a target from a prior backup.
    Restore {
        target: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Add, remove, list, or mutate configured targets.
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Push the source tree's tracked repos.
    Push,
    /// Pull the source tree's tracked repos.
    Pull,
    /// Query the operation log.
    Log {
        #[arg(long)]
        cmd: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        tail: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TargetAction {
    Add {
        name: String,
        path: String,
        #[arg(long)]
        mode: Option<LinkMode>,
    },
    Remove {
        name: String,
    },
    List,
    Set {
        name: String,
        #[arg(long)]
        add_include: Option<String>,
        #[arg(long)]
        add_exclude: Option<String>,
        #[arg(long)]
        remove_include: Option<String>,
        #[arg(long)]
        remove_exclude: Option<String>,
        #[arg(long)]
        mode: Option<LinkMode>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "skillshare=debug,info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let name = command_name(&cli.command);

    if let Err(e) = oplog::record_timed(name, || run(cli)) {
        eprintln!("skillshare: {e}");
        let code = e
            .downcast_ref::<skillshare_core::error::SkillshareError>()
            .map(|e| e.exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
    Ok(())
}

fn command_name(cmd: &Commands) -> &'static str {
    match cmd {
        Commands::Init { .. } => "init",
        Commands::Install { .. } => "install",
        Commands::Uninstall { .. } => "uninstall",
        Commands::Sync { .. } => "sync",
        Commands::Check { .. } => "check",
        Commands::Update { .. } => "update",
        Commands::List { .. } => "list",
        Commands::Diff { .. } => "diff",
        Commands::Status => "status",
        Commands::Doctor => "doctor",
        Commands::Audit { .. } => "audit",
        Commands::Backup { .. } => "backup",
        Commands::Restore { .. } => "restore",
        Commands::Target { .. } => "target",
        Commands::Push => "push",
        Commands::Pull => "pull",
        Commands::Log { .. } => "log",
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::resolve(cli.project.as_deref())?;

    match cli.command {
        Commands::Init { source } => cmd_init(&store, source),
        Commands::Install { source, track, group, name, skip_audit, force, dry_run } => {
            cmd_install(&store, &source, track, group, name, skip_audit, force, dry_run)
        }
        Commands::Uninstall { names, group, force, dry_run } => cmd_uninstall(&store, names, group, force, dry_run),
        Commands::Sync { dry_run, force, target } => cmd_sync(&store, dry_run, force, target),
        Commands::Check { names, group, json } => cmd_check(&store, names, group, json),
        Commands::Update { names, all, group, prune, skip_audit, diff, threshold, dry_run } => {
            cmd_update(&store, names, all, group, prune, skip_audit, diff, threshold, dry_run)
        }
        Commands::List { pattern, json, verbose } => cmd_list(&store, pattern, json, verbose),
        Commands::Diff { target, stat } => cmd_diff(&store, target, stat),
        Commands::Status => cmd_status(&store),
        Commands::Doctor => cmd_doctor(&store),
        Commands::Audit { threshold } => cmd_audit(&store, threshold),
        Commands::Backup { target, list, cleanup, dry_run } => cmd_backup(&store, target, list, cleanup, dry_run),
        Commands::Restore { target, from, force, dry_run } => cmd_restore(&store, target, from, force, dry_run),
        Commands::Target { action } => cmd_target(&store, action),
        Commands::Push => cmd_push(&store),
        Commands::Pull => cmd_pull(&store),
        Commands::Log { cmd, status, since, tail, json } => cmd_log(cmd, status, since, tail, json),
    }
}

fn cmd_init(store: &ConfigStore, source: Option<String>) -> Result<()> {
    if store.config_path().exists() {
        bail!("config already exists at {}", store.config_path().display());
    }
    let source = source.unwrap_or_else(|| store.project_root().join(".skillshare/skills").to_string_lossy().into_owned());
    std::fs::create_dir_all(&source).ok();
    store.save(&Config::new(source))?;
    println!("initialized config at {}", store.config_path().display());
    Ok(())
}

fn source_root(store: &ConfigStore, config: &Config) -> PathBuf {
    store.source_dir(config)
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn build_targets(config: &Config, target_filter: Option<&str>) -> Vec<Target> {
    config
        .targets
        .iter()
        .filter(|(name, _)| target_filter.map(|f| f == name.as_str()).unwrap_or(true))
        .map(|(name, t)| Target {
            name: name.clone(),
            path: expand_home(&t.path),
            mode: t.mode.unwrap_or_else(|| config.default_mode()),
            include: t.include.clone(),
            exclude: t.exclude.clone(),
        })
        .collect()
}

fn cmd_install(
    store: &ConfigStore,
    raw_source: &str,
    track: bool,
    group: Option<String>,
    name: Option<String>,
    skip_audit: bool,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let source = skillshare_core::source::parse(raw_source)?;

    let dest_name = name.clone().unwrap_or_else(|| source.name.clone());
    let rel = match &group {
        Some(g) => Path::new(g).join(&dest_name),
        None => PathBuf::from(&dest_name),
    };
    let dest = root.join(&rel);

    let opts = InstallOptions {
        track,
        name_override: name,
        skip_audit,
        dry_run,
    };
    let result = install(&source, &dest, &opts)?;

    if !skip_audit && !force && !dry_run {
        let report = skillshare_core::audit::scan_tree(&dest, &dest_name)?;
        if report.blocks(Severity::Critical) {
            std::fs::remove_dir_all(&dest).ok();
            bail!(skillshare_core::error::SkillshareError::AuditBlocked {
                severity: report.max_severity().unwrap()
            });
        }
    }

    if !dry_run {
        registry::reconcile(&root, store_scope_dir(store))?;
    }

    println!("installed {dest_name} ({:?})", result.action);
    Ok(())
}

fn store_scope_dir(store: &ConfigStore) -> &Path {
    store.config_path().parent().unwrap_or(store.project_root())
}

fn cmd_uninstall(store: &ConfigStore, names: Vec<String>, group: Option<String>, force: bool, dry_run: bool) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let result = uninstall(&root, store_scope_dir(store), &names, &UninstallOptions { group, force, dry_run })?;
    for name in &result.removed {
        println!("removed {name}");
    }
    for name in &result.not_found {
        eprintln!("skillshare: no installed skill named {name:?}");
    }
    if !result.not_found.is_empty() {
        bail!("{} name(s) not found", result.not_found.len());
    }
    Ok(())
}

fn cmd_sync(store: &ConfigStore, dry_run: bool, force: bool, target: Option<String>) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let discovered = discover(&root)?;
    let skills: Vec<SyncSkill> = discovered
        .entries
        .iter()
        .map(|e| {
            let targets = e.skill.front_matter().ok().and_then(|fm| fm.targets);
            SyncSkill { skill: e.skill.clone(), targets }
        })
        .collect();
    let targets = build_targets(&config, target.as_deref());
    let opts = SyncOptions { dry_run, force, target_filter: target };
    let report = sync(&root, &skills, &targets, &opts)?;
    for item in &report.items {
        println!("{}: {} {:?}", item.target, item.skill, item.verb);
    }
    Ok(())
}

fn cmd_check(store: &ConfigStore, names: Vec<String>, group: Option<String>, json: bool) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let discovered = discover(&root)?;
    let repos = tracked_repos(&root)?;
    let report = skillshare_core::check::run_check(&discovered, &repos, group.as_deref());
    let items: Vec<_> = report
        .items
        .into_iter()
        .filter(|i| names.is_empty() || names.contains(&i.name))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in &items {
            println!("{}: {:?}", item.name, item.status);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_update(
    store: &ConfigStore,
    names: Vec<String>,
    all: bool,
    group: Option<String>,
    prune: bool,
    skip_audit: bool,
    diff: bool,
    threshold: Severity,
    dry_run: bool,
) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let discovered = discover(&root)?;
    let repos = tracked_repos(&root)?;

    if !all && names.is_empty() && group.is_none() {
        bail!("update requires names, --all, or --group");
    }

    let opts = UpdateOptions { audit_threshold: threshold, skip_audit, dry_run };
    let report = run_update(&root, &discovered, &repos, group.as_deref(), &opts)?;

    let filtered: Vec<_> = report
        .items
        .into_iter()
        .filter(|i| all || group.is_some() || names.contains(&i.name))
        .collect();

    for item in &filtered {
        println!("{}: {:?} {}", item.name, item.outcome, item.detail.clone().unwrap_or_default());
    }

    if prune {
        let stale_names: Vec<String> = skillshare_core::check::run_check(&discovered, &repos, group.as_deref())
            .items
            .into_iter()
            .filter(|i| i.status == skillshare_core::check::Status::Stale)
            .map(|i| i.name)
            .collect();
        if !stale_names.is_empty() && !dry_run {
            uninstall(&root, store_scope_dir(store), &stale_names, &UninstallOptions { group: None, force: true, dry_run: false })?;
        }
        for name in &stale_names {
            println!("pruned {name}");
        }
    }

    let _ = diff;
    if filtered.iter().any(|i| i.outcome == skillshare_core::check::update::Outcome::RolledBack) {
        bail!("one or more updates were rolled back by the audit gate");
    }
    Ok(())
}

fn cmd_list(store: &ConfigStore, pattern: Option<String>, json: bool, verbose: bool) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let listing = skillshare_core::discovery::discover_lite(&root)?;
    let filtered: Vec<_> = listing
        .into_iter()
        .filter(|l| pattern.as_deref().map(|p| glob::Pattern::new(p).map(|g| g.matches(&l.skill.name())).unwrap_or(true)).unwrap_or(true))
        .collect();

    if json {
        #[derive(serde::Serialize)]
        struct Row {
            name: String,
            group: String,
        }
        let rows: Vec<Row> = filtered.iter().map(|l| Row { name: l.skill.name(), group: l.skill.group() }).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for l in &filtered {
            if verbose && !l.skill.group().is_empty() {
                println!("{}/{}", l.skill.group(), l.skill.name());
            } else {
                println!("{}", l.skill.name());
            }
        }
    }
    Ok(())
}

fn cmd_diff(store: &ConfigStore, target: Option<String>, stat: bool) -> Result<()> {
    let config = store.load()?;
    let targets = build_targets(&config, target.as_deref());
    for t in &targets {
        let manifest = skillshare_core::sync::manifest::load(&t.path)?;
        if stat {
            println!("{}: {} managed entries", t.name, manifest.managed.len());
        } else {
            for (flat_name, checksum) in &manifest.managed {
                println!("{} {}: {}", t.name, flat_name, checksum);
            }
        }
    }
    Ok(())
}

fn cmd_status(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    println!("scope: {:?}", store.scope());
    println!("source: {}", root.display());
    println!("targets: {}", config.targets.len());
    let discovered = discover(&root)?;
    println!("skills: {}", discovered.entries.len());
    Ok(())
}

fn cmd_doctor(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let mut problems = 0;
    if !root.is_dir() {
        println!("source directory {} does not exist", root.display());
        problems += 1;
    }
    for (name, t) in &config.targets {
        if let Err(e) = (Target {
            name: name.clone(),
            path: expand_home(&t.path),
            mode: t.mode.unwrap_or_default(),
            include: t.include.clone(),
            exclude: t.exclude.clone(),
        })
        .validate_patterns()
        {
            println!("target {name}: {e}");
            problems += 1;
        }
    }
    if problems == 0 {
        println!("ok");
        return Ok(());
    }
    bail!("{problems} problem(s) found");
}

fn cmd_audit(store: &ConfigStore, threshold: Severity) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    let discovered = discover(&root)?;
    let mut scanned = 0usize;
    let mut failed = Vec::new();
    let mut counts: std::collections::HashMap<Severity, usize> = std::collections::HashMap::new();

    for entry in &discovered.entries {
        scanned += 1;
        let report = skillshare_core::audit::scan_tree(&entry.skill.abs_path, &entry.skill.name())?;
        for (sev, n) in report.counts_by_severity() {
            *counts.entry(sev).or_insert(0) += n;
        }
        if report.blocks(threshold) {
            failed.push(entry.skill.name());
            println!("BLOCKED {}: {:?}", entry.skill.name(), report.max_severity());
        }
    }

    oplog::record_audit(&oplog::AuditLogEntry {
        time: chrono::Utc::now(),
        scanned,
        failed_skills: failed.clone(),
        findings_by_severity: counts,
    })?;

    if !failed.is_empty() {
        bail!("{} skill(s) blocked by audit", failed.len());
    }
    println!("audit clean: {scanned} skill(s) scanned");
    Ok(())
}

fn cmd_backup(store: &ConfigStore, target: Option<String>, list: bool, cleanup: bool, dry_run: bool) -> Result<()> {
    let config = store.load()?;

    if list {
        for ts in skillshare_core::backup::list_timestamps()? {
            println!("{ts}");
        }
        return Ok(());
    }
    if cleanup {
        let removed = skillshare_core::backup::cleanup(30, chrono::Utc::now(), dry_run)?;
        for r in &removed {
            println!("removed backup {r}");
        }
        return Ok(());
    }

    let targets = build_targets(&config, target.as_deref());
    let pairs: Vec<(String, PathBuf)> = targets.into_iter().map(|t| (t.name, t.path)).collect();
    let result = skillshare_core::backup::snapshot(&pairs, chrono::Utc::now(), &skillshare_core::backup::BackupOptions { dry_run })?;
    println!("backed up {} target(s) to {}", result.targets_backed_up.len(), result.timestamp);
    Ok(())
}

fn cmd_restore(store: &ConfigStore, target_name: String, from: Option<String>, force: bool, dry_run: bool) -> Result<()> {
    let config = store.load()?;
    let t = config.targets.get(&target_name).with_context(|| format!("no target named {target_name:?}"))?;
    let path = expand_home(&t.path);
    let ts = skillshare_core::backup::restore(&target_name, &path, from.as_deref(), force, dry_run)?;
    println!("restored {target_name} from backup {ts}");
    Ok(())
}

fn cmd_target(store: &ConfigStore, action: TargetAction) -> Result<()> {
    let mut config = store.load()?;
    match action {
        TargetAction::Add { name, path, mode } => {
            config.targets.insert(name.clone(), TargetConfig { path, mode, include: vec![], exclude: vec![] });
            store.save(&config)?;
            println!("added target {name}");
        }
        TargetAction::Remove { name } => {
            config.targets.remove(&name);
            store.save(&config)?;
            println!("removed target {name}");
        }
        TargetAction::List => {
            for (name, t) in &config.targets {
                println!("{name}: {} ({})", t.path, t.mode.unwrap_or_default());
            }
        }
        TargetAction::Set { name, add_include, add_exclude, remove_include, remove_exclude, mode } => {
            let t = config.targets.get_mut(&name).with_context(|| format!("no target named {name:?}"))?;
            if let Some(p) = add_include {
                t.include.push(p);
            }
            if let Some(p) = add_exclude {
                t.exclude.push(p);
            }
            if let Some(p) = remove_include {
                t.include.retain(|x| x != &p);
            }
            if let Some(p) = remove_exclude {
                t.exclude.retain(|x| x != &p);
            }
            if let Some(m) = mode {
                t.mode = Some(m);
            }
            store.save(&config)?;
            println!("updated target {name}");
        }
    }
    Ok(())
}

fn cmd_push(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    for repo in tracked_repos(&root)? {
        let out = skillshare_core::git::GitAdapter::push(&repo.abs_path)?;
        if !out.ok() {
            eprintln!("skillshare: push failed for {}: {}", repo.name, out.stderr.trim());
        } else {
            println!("pushed {}", repo.name);
        }
    }
    Ok(())
}

fn cmd_pull(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    let root = source_root(store, &config);
    for repo in tracked_repos(&root)? {
        let out = skillshare_core::git::GitAdapter::pull(&repo.abs_path)?;
        if !out.ok() {
            eprintln!("skillshare: pull failed for {}: {}", repo.name, out.stderr.trim());
        } else {
            println!("pulled {}", repo.name);
        }
    }
    Ok(())
}

fn cmd_log(cmd: Option<String>, status: Option<String>, since: Option<String>, tail: Option<usize>, json: bool) -> Result<()> {
    let entries = oplog::read_operations()?;
    let status = status.map(|s| match s.as_str() {
        "ok" => Ok(oplog::Status::Ok),
        "error" => Ok(oplog::Status::Error),
        "warning" => Ok(oplog::Status::Warning),
        other => anyhow::bail!("unknown status {other:?}"),
    }).transpose()?;
    let filter = oplog::Filter { cmd, status, since, tail };
    let filtered = oplog::filter_entries(entries, &filter)?;

    if json {
        for e in &filtered {
            println!("{}", serde_json::to_string(e)?);
        }
    } else {
        for e in &filtered {
            println!("{} {} {:?} {}ms", e.time.to_rfc3339(), e.cmd, e.status, e.duration_ms);
        }
    }
    Ok(())
}
