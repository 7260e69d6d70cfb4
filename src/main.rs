use clap::Parser;
use fithq_core::adapters::records::{self, load_filters, load_records};
use fithq_core::config::cli::{
    Cli, ColumnsCommand, Command, DomainCommand, OutputFormat, RecordsArgs,
};
use fithq_core::core::dns::check_dns;
use fithq_core::core::validator::run_failure;
use fithq_core::core::preferences::client_columns;
use fithq_core::domain::ports::{ConfigProvider, DnsResolver};
use fithq_core::utils::error::{CrmError, ErrorSeverity};
use fithq_core::utils::logger;
use fithq_core::utils::validation::{validate_subdomain, Validate};
use fithq_core::{
    apply_filters, apply_sort, AppConfig, DohResolver, DomainConfigClient, DomainValidationState,
    DomainValidator, LocalStorage, Result, SortSpec, TablePreferences, ValidationStateStore,
    ValidationStatus, ValidatorSettings,
};
use std::path::Path;
use tokio::sync::watch;

const CLIENTS_TABLE: &str = "clients";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting fithq CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => run(cli.command, config).await,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            Err(e)
        }
    };

    if let Err(e) = result {
        report_error(&e);

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,      // 使用者取消
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 配置或系統錯誤
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            tracing::info!("📋 Loading configuration from {}", path.display());
            AppConfig::from_file(path)?
        }
        None => AppConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn report_error(e: &CrmError) {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::Domain(command) => run_domain(command, &config).await,
        Command::Records(args) => run_records(args, &config).await,
        Command::Columns(command) => run_columns(command, &config).await,
    }
}

async fn run_domain(command: DomainCommand, config: &AppConfig) -> Result<()> {
    let storage = LocalStorage::new(config.state_dir());
    let store = ValidationStateStore::new(storage.clone());

    match command {
        DomainCommand::Check { subdomain } => {
            let subdomain = validate_subdomain(&subdomain)?;
            let resolver = DohResolver::from_config(config)?;
            let ip = check_dns(&resolver, &subdomain, config.expected_ip()).await?;
            println!("✅ {} points to {}", subdomain, ip);
            Ok(())
        }
        DomainCommand::Validate {
            subdomain,
            configure,
        } => {
            let subdomain = validate_subdomain(&subdomain)?;
            let mut validator = new_validator(config, DomainValidationState::default())?;
            validator.start_validation(&subdomain).await?;
            let (state, cancelled) = follow_run(&mut validator, &storage).await;
            finish_run(config, state, cancelled, configure).await
        }
        DomainCommand::Resume => {
            let Some(saved) = store.load().await? else {
                println!("No saved validation run");
                return Ok(());
            };
            if saved.status != ValidationStatus::Validating {
                println!("Nothing to resume ({}: {})", saved.subdomain, saved.status);
                return Ok(());
            }

            let mut validator = new_validator(config, saved.clone())?;
            validator.resume_validation(&saved.subdomain, saved.attempts)?;
            let (state, cancelled) = follow_run(&mut validator, &storage).await;
            finish_run(config, state, cancelled, false).await
        }
        DomainCommand::Status => {
            match store.load().await? {
                Some(state) => print_state(&state, config.max_attempts()),
                None => println!("Status: {}", ValidationStatus::NotSet),
            }
            Ok(())
        }
        DomainCommand::Reset => {
            let Some(saved) = store.load().await? else {
                println!("Nothing to reset");
                return Ok(());
            };
            let mut validator = new_validator(config, saved)?;
            validator.reset()?;
            store.clear().await?;
            println!("♻️ Domain cleared");
            Ok(())
        }
        DomainCommand::Remove => {
            let client = backend_client(config)?;
            client.remove_domain().await?;
            store.clear().await?;
            println!("🗑️ Domain removed. Reverted to default domain.");
            Ok(())
        }
    }
}

fn new_validator(
    config: &AppConfig,
    state: DomainValidationState,
) -> Result<DomainValidator<DohResolver>> {
    let resolver = DohResolver::from_config(config)?;
    Ok(DomainValidator::with_state(
        resolver,
        ValidatorSettings::from_config(config),
        state,
    ))
}

/// 持續存檔並顯示進度，直到這一輪結束或使用者按下 Ctrl-C；第二個值表示是否被取消
async fn follow_run<R: DnsResolver + 'static>(
    validator: &mut DomainValidator<R>,
    storage: &LocalStorage,
) -> (DomainValidationState, bool) {
    let saver = tokio::spawn(persist_changes(
        validator.subscribe(),
        ValidationStateStore::new(storage.clone()),
        validator.settings().max_attempts,
    ));

    let mut cancelled = false;
    if validator.status() == ValidationStatus::Validating {
        let interrupted = tokio::select! {
            _ = validator.wait_for_terminal() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            cancelled = validator.cancel_validation();
        }
    }

    if let Err(e) = saver.await {
        tracing::warn!("⚠️ State saver stopped unexpectedly: {}", e);
    }
    (validator.state(), cancelled)
}

async fn persist_changes(
    mut rx: watch::Receiver<DomainValidationState>,
    store: ValidationStateStore<LocalStorage>,
    max_attempts: u32,
) {
    loop {
        let state = rx.borrow_and_update().clone();
        if state.status == ValidationStatus::Validating && state.attempts > 0 {
            match &state.error_message {
                Some(message) => {
                    println!("⏳ Attempt {}/{}: {}", state.attempts, max_attempts, message)
                }
                None => println!("⏳ Attempt {}/{}", state.attempts, max_attempts),
            }
        }
        if let Err(e) = store.save(&state).await {
            tracing::warn!("⚠️ Could not save validation state: {}", e);
        }
        if state.status.is_terminal() || rx.changed().await.is_err() {
            break;
        }
    }
}

async fn finish_run(
    config: &AppConfig,
    state: DomainValidationState,
    cancelled: bool,
    configure: bool,
) -> Result<()> {
    match state.status {
        ValidationStatus::Verified => {
            println!(
                "✅ {} verified ({})",
                state.subdomain,
                state.verified_ip.as_deref().unwrap_or(config.expected_ip())
            );
            if configure {
                configure_backend(config, &state).await?;
            }
            Ok(())
        }
        ValidationStatus::Failed => match run_failure(&state, cancelled) {
            Some(err) => Err(err),
            None => Ok(()),
        },
        other => {
            println!("Status: {}", other);
            Ok(())
        }
    }
}

fn backend_client(config: &AppConfig) -> Result<DomainConfigClient> {
    let api = config.api.as_ref().ok_or_else(|| CrmError::MissingConfigError {
        field: "api.base_url".to_string(),
    })?;
    let token = config.api_token().ok_or_else(|| CrmError::MissingConfigError {
        field: "api.token".to_string(),
    })?;
    Ok(DomainConfigClient::new(&api.base_url, token, config.api_timeout())?
        .with_expected_ip(config.expected_ip()))
}

async fn configure_backend(config: &AppConfig, state: &DomainValidationState) -> Result<()> {
    let client = backend_client(config)?;

    println!("⚙️ Configuring domain and generating SSL certificate...");
    client.configure(state).await?;

    println!("🔗 Updating client links...");
    let stats = client.regenerate_links().await?;
    println!(
        "✅ Domain configured successfully! {} client links updated ({} failed, {} total)",
        stats.success_count, stats.fail_count, stats.total_count
    );
    Ok(())
}

fn print_state(state: &DomainValidationState, max_attempts: u32) {
    println!("Subdomain: {}", state.subdomain);
    println!("Status: {}", state.status);
    println!("Attempts: {}/{}", state.attempts, max_attempts);
    if let Some(checked) = state.last_checked {
        println!("Last checked: {}", checked.to_rfc3339());
    }
    if let Some(ip) = &state.verified_ip {
        println!("Verified IP: {}", ip);
    }
    if let Some(message) = &state.error_message {
        println!("Last result: {}", message);
    }
}

async fn run_records(args: RecordsArgs, config: &AppConfig) -> Result<()> {
    let mut rows = load_records(&args.input).await?;

    if let Some(path) = &args.filters {
        let filters = load_filters(path).await?;
        rows = apply_filters(&rows, &filters);
    }

    if let Some(sort) = &args.sort {
        let spec = SortSpec::parse(sort).ok_or_else(|| {
            CrmError::input(format!("Invalid sort '{}'. Use column[:asc|desc]", sort))
        })?;
        rows = apply_sort(&rows, &spec);
    }

    let columns = if args.visible_columns {
        let storage = LocalStorage::new(config.state_dir());
        TablePreferences::load(&storage, CLIENTS_TABLE, client_columns())
            .await?
            .visible_columns()
    } else {
        args.columns
    };

    let output = match args.format {
        OutputFormat::Json => records::write_json(&rows, &columns)?,
        OutputFormat::Csv => records::write_csv(&rows, &columns)?,
    };
    tracing::info!("📤 Writing {} records", rows.len());
    println!("{}", output.trim_end());
    Ok(())
}

async fn run_columns(command: ColumnsCommand, config: &AppConfig) -> Result<()> {
    let storage = LocalStorage::new(config.state_dir());
    let mut prefs = TablePreferences::load(&storage, CLIENTS_TABLE, client_columns()).await?;

    match command {
        ColumnsCommand::List => {
            for (index, column) in prefs.columns().iter().enumerate() {
                let label = prefs
                    .definition(&column.id)
                    .map(|d| d.label.as_str())
                    .unwrap_or(column.id.as_str());
                let mark = if column.visible { "x" } else { " " };
                println!("{:>2} [{}] {} ({})", index, mark, label, column.id);
            }
            return Ok(());
        }
        ColumnsCommand::Show { id } => prefs.set_visible(&id, true)?,
        ColumnsCommand::Hide { id } => prefs.set_visible(&id, false)?,
        ColumnsCommand::Move { id, to } => {
            let from = prefs
                .position(&id)
                .ok_or_else(|| CrmError::input(format!("Unknown column: {}", id)))?;
            prefs.move_column(from, to)?;
        }
        ColumnsCommand::Reset => prefs.reset(),
    }

    prefs.save(&storage).await?;
    println!("Visible columns: {}", prefs.visible_columns().join(", "));
    Ok(())
}
