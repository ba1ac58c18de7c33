use dock_icons::{
    AppIconStore, ConfigError, EngineConfig, IconEngine, IconFormat, StoreError, TemplateComposer,
    find_config, load_config,
};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "\
usage:
  dock-icons extract <source> [--size N] [--index N] [--out FILE] [--format png|ico|bmp|jpeg]
  dock-icons list <file>
  dock-icons tray [--size N] [--out-dir DIR]
  dock-icons app-icon <exe>";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Args(#[from] pico_args::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Failed(String),
}

fn init_logger() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dock_icons=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_logger();
    match run(pico_args::Arguments::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}\n{USAGE}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "dock-icons failed");
            ExitCode::FAILURE
        }
    }
}

fn engine_config() -> Result<EngineConfig, CliError> {
    match find_config() {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            Ok(load_config(path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn parse_format(text: Option<String>) -> Result<IconFormat, CliError> {
    match text {
        None => Ok(IconFormat::Png),
        Some(name) => IconFormat::parse(&name)
            .ok_or_else(|| CliError::Usage(format!("unknown format {name:?}"))),
    }
}

fn positional(args: &mut pico_args::Arguments, what: &str) -> Result<String, CliError> {
    args.opt_free_from_str::<String>()?
        .ok_or_else(|| CliError::Usage(format!("missing <{what}>")))
}

fn finish(args: pico_args::Arguments) -> Result<(), CliError> {
    let rest = args.finish();
    if rest.is_empty() {
        Ok(())
    } else {
        Err(CliError::Usage(format!("unexpected arguments: {rest:?}")))
    }
}

fn run(mut args: pico_args::Arguments) -> Result<(), CliError> {
    if args.contains(["-h", "--help"]) {
        println!("{USAGE}");
        return Ok(());
    }
    let Some(command) = args.subcommand()? else {
        return Err(CliError::Usage("missing command".into()));
    };

    let config = engine_config()?;
    let engine = IconEngine::new(config.clone());
    if let Some(err) = engine.dependency_error() {
        tracing::warn!(error = %err, "native icon APIs unavailable");
    }

    match command.as_str() {
        "extract" => {
            let size = args.opt_value_from_str("--size")?.unwrap_or(config.default_size);
            let index = args.opt_value_from_str("--index")?.unwrap_or(0);
            let out: Option<PathBuf> = args.opt_value_from_str("--out")?;
            let format = parse_format(args.opt_value_from_str("--format")?)?;
            let source = positional(&mut args, "source")?;
            finish(args)?;

            let icon = engine.extract_icon(source.as_str(), size, index);
            if let Some(err) = icon.error() {
                return Err(CliError::Failed(err.to_string()));
            }
            let info = icon.info();
            println!(
                "{} #{}: {}x{} {}bpp {} ({} bytes)",
                info.path, info.index, info.width, info.height, info.bits_per_pixel, info.format, info.size_bytes
            );
            if let Some(out) = out {
                if !engine.save_icon(&icon, &out, format, 95) {
                    return Err(CliError::Failed(format!("could not write {}", out.display())));
                }
                println!("saved {}", out.display());
            }
        }
        "list" => {
            let file = positional(&mut args, "file")?;
            finish(args)?;
            let icons = engine.list_icons_in_file(&file);
            for info in &icons {
                println!("#{}: {}x{} {}bpp", info.index, info.width, info.height, info.bits_per_pixel);
            }
            println!("{} icon(s) in {file}", icons.len());
        }
        "tray" => {
            let size = args.opt_value_from_str("--size")?.unwrap_or(config.tray_size);
            let out_dir: Option<PathBuf> = args.opt_value_from_str("--out-dir")?;
            finish(args)?;

            let records = engine.get_tray_icons(size);
            for (n, record) in records.iter().enumerate() {
                println!(
                    "pid {} {:?} tooltip {:?}",
                    record.process_id, record.window_title, record.tooltip
                );
                if let Some(dir) = &out_dir {
                    let path = dir.join(format!("tray_{n}_pid_{}.png", record.process_id));
                    if !engine.save_icon(&record.icon, &path, IconFormat::Png, 95) {
                        tracing::warn!(path = %path.display(), "tray icon not saved");
                    }
                }
            }
            println!("{} tray icon(s)", records.len());
        }
        "app-icon" => {
            let exe = PathBuf::from(positional(&mut args, "exe")?);
            finish(args)?;
            let composer = TemplateComposer::new(config.template_path())
                .with_inner_size(config.template_inner_size);
            let store = AppIconStore::new(config.icon_store_dir(), composer, config.store_icon_size);
            let path = store.icon_for(&engine, &exe)?;
            println!("{}", path.display());
        }
        other => return Err(CliError::Usage(format!("unknown command {other:?}"))),
    }
    Ok(())
}
