use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::LevelFilter;
use ratatui::DefaultTerminal;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use storedash::chart_export::{self, ChartExportOptions};
use storedash::report::{write_json_report, write_text_report};
use storedash::{
    error_display, parse_day, App, AppConfig, AppEvent, Args, ConfigManager, Dashboard,
    DashboardOptions, Dataset, DateRange, LoadOptions,
};

/// Overlay command-line flags on the loaded config.
fn apply_args(config: &mut AppConfig, args: &Args) {
    if let Some(path) = &args.path {
        config.dataset.path = Some(path.clone());
    }
    if let Some(delimiter) = args.delimiter {
        config.dataset.delimiter = Some(delimiter);
    }
    if let Some(compression) = args.compression {
        config.dataset.compression = Some(format!("{:?}", compression).to_lowercase());
    }
    if let Some(top_n) = args.top_n {
        config.display.top_n = top_n;
    }
    if args.dense_daily {
        config.display.dense_daily = true;
    }
    if let Some(code) = &args.currency {
        config.currency.code = code.clone();
    }
    if let Some(locale) = &args.locale {
        config.currency.locale = locale.clone();
    }
    if args.debug {
        config.debug.enabled = true;
    }
}

fn load_options(config: &AppConfig) -> LoadOptions {
    let mut opts = LoadOptions::new();
    if let Some(delimiter) = config.dataset.delimiter {
        // validate() guarantees an ASCII delimiter
        opts = opts.with_delimiter(delimiter as u8);
    }
    if let Some(compression) = config.compression() {
        opts = opts.with_compression(compression);
    }
    opts
}

/// `--start`/`--end` default to the data bounds; anything outside is an error.
fn resolve_range(dataset: &Dataset, args: &Args) -> Result<DateRange> {
    let full = dataset.full_range();
    let start = match &args.start {
        Some(s) => parse_day(s)?,
        None => full.start(),
    };
    let end = match &args.end {
        Some(s) => parse_day(s)?,
        None => full.end(),
    };
    dataset.validate_selection(start, end)
}

fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path).map_err(|e| {
            let context = format!("(log file {})", path.display());
            eyre!(error_display::user_message_from_io(&e, Some(&context)))
        })?;
        builder
            .filter_level(LevelFilter::Info)
            .target(env_logger::Target::Pipe(Box::new(file)));
    } else if args.report || args.export_charts.is_some() {
        builder.filter_level(LevelFilter::Warn);
    } else {
        // stderr would draw over the terminal UI
        builder.filter_level(LevelFilter::Off);
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format_timestamp(None).try_init()?;
    Ok(())
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(
    mut terminal: DefaultTerminal,
    dataset: Dataset,
    range: DateRange,
    config: &AppConfig,
) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(dataset, config, tx.clone())?;
    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Recompute(range))?;

    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn run_report(dataset: &Dataset, range: DateRange, config: &AppConfig, json: bool) -> Result<()> {
    let view = dataset.filter(&range)?;
    let dashboard = Dashboard::compute(&view, &dashboard_options(config))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        write_json_report(&mut out, &dashboard)?;
    } else {
        write_text_report(&mut out, &dashboard, &config.currency_formatter()?)?;
    }
    out.flush()?;
    Ok(())
}

fn run_export(dataset: &Dataset, range: DateRange, config: &AppConfig, dir: &Path) -> Result<()> {
    let view = dataset.filter(&range)?;
    let dashboard = Dashboard::compute(&view, &dashboard_options(config))?;
    let written =
        chart_export::export_dashboard(&dashboard, dir, &ChartExportOptions::from_config(config))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn dashboard_options(config: &AppConfig) -> DashboardOptions {
    DashboardOptions {
        top_n: config.display.top_n,
        dense_daily: config.display.dense_daily,
    }
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(storedash::APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Wrote default configuration to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing config file: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(storedash::APP_NAME).unwrap_or_else(|e| {
        log::warn!("using default configuration: {}", e);
        eprintln!("Warning: {}. Using default configuration.", e);
        AppConfig::default()
    });
    apply_args(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn dataset_path(config: &AppConfig) -> Result<PathBuf> {
    config.dataset.path.clone().ok_or_else(|| {
        eyre!("No dataset given. Pass a PATH or set [dataset] path in the config file")
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    init_logging(&args)?;

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let path = match dataset_path(&config) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let dataset = match Dataset::load(&path, &load_options(&config)) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!(
                "Error: {}",
                error_display::user_message_from_report(&e, Some(&path))
            );
            std::process::exit(1);
        }
    };

    if let Some(logo) = &config.display.logo {
        if !logo.exists() {
            log::warn!("logo asset {} not found", logo.display());
        }
    }

    let range = match resolve_range(&dataset, &args) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if args.report {
        return run_report(&dataset, range, &config, args.json);
    }
    if let Some(dir) = &args.export_charts {
        return run_export(&dataset, range, &config, dir);
    }

    let terminal = ratatui::init();
    let result = run(terminal, dataset, range, &config);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storedash::CompressionFormat;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["storedash"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_args_override_config() {
        let mut config = AppConfig::default();
        config.dataset.path = Some(PathBuf::from("from_config.csv"));
        apply_args(
            &mut config,
            &args(&[
                "orders.csv",
                "--top-n",
                "10",
                "--dense-daily",
                "--currency",
                "USD",
                "--locale",
                "en_US",
                "--delimiter",
                ";",
                "--compression",
                "gzip",
            ]),
        );
        assert_eq!(config.dataset.path, Some(PathBuf::from("orders.csv")));
        assert_eq!(config.display.top_n, 10);
        assert!(config.display.dense_daily);
        assert_eq!(config.currency.code, "USD");
        assert_eq!(config.currency.locale, "en_US");
        assert_eq!(config.compression(), Some(CompressionFormat::Gzip));
        assert!(config.validate().is_ok());

        let opts = load_options(&config);
        assert_eq!(opts.delimiter, b';');
        assert_eq!(opts.compression, Some(CompressionFormat::Gzip));
    }

    #[test]
    fn test_missing_flags_keep_config() {
        let mut config = AppConfig::default();
        config.display.top_n = 7;
        config.dataset.path = Some(PathBuf::from("from_config.csv"));
        apply_args(&mut config, &args(&[]));
        assert_eq!(config.display.top_n, 7);
        assert_eq!(
            dataset_path(&config).unwrap(),
            PathBuf::from("from_config.csv")
        );
        assert_eq!(load_options(&config), LoadOptions::default());
    }

    #[test]
    fn test_no_dataset_path_is_an_error() {
        let config = AppConfig::default();
        assert!(dataset_path(&config).is_err());
    }

    #[test]
    fn test_all_compression_names_round_trip_through_config() {
        for format in [
            CompressionFormat::Gzip,
            CompressionFormat::Zstd,
            CompressionFormat::Bzip2,
            CompressionFormat::Xz,
        ] {
            let mut config = AppConfig::default();
            config.dataset.compression = Some(format!("{:?}", format).to_lowercase());
            assert_eq!(config.compression(), Some(format));
        }
    }
}
