mod cli;

use clap::Parser;
use cli::{Cli, Commands, GetArgs, Shape};
use fetchtask::config::{Config, TransferMode};
use fetchtask::transport::HttpTransport;
use fetchtask::{Content, DispatchQueue, ServiceTask};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    fetchtask::observability::init_tracing();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Get(args) => get(config, args).await?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

async fn get(mut config: Config, args: GetArgs) -> Result<(), AnyError> {
    // Shapes that need an in-memory body default to buffering
    config.transfer.mode = match (args.transfer, args.shape) {
        (Some(transfer), _) => transfer.into(),
        (None, Shape::File) => TransferMode::File,
        (None, Shape::Raw) => config.transfer.mode,
        (None, _) => TransferMode::Data,
    };

    let transport = HttpTransport::new(&config.http, config.transfer.clone())?;
    let queue = DispatchQueue::spawn(config.dispatch.label.clone());
    let failed = Arc::new(AtomicBool::new(false));

    let mut task = ServiceTask::new(queue.clone());
    task.default_charset(config.text.default_charset);

    match args.shape {
        Shape::Raw => task.content(|content, meta| match content {
            Content::Data(bytes) => println!("{} ({} bytes in memory)", meta.url, bytes.len()),
            Content::File(path) => println!("{} (stored at {})", meta.url, path.display()),
        }),
        Shape::Data => task.data(|bytes, _meta| {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(&bytes).and_then(|()| stdout.flush()) {
                eprintln!("failed to write body: {e}");
            }
        }),
        Shape::File => task.file(|path, _meta| println!("{}", path.display())),
        Shape::Text => task.text(|text, _meta| print!("{text}")),
        Shape::Json => task.json(|value, _meta| match serde_json::to_string_pretty(&value) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("failed to render JSON: {e}"),
        }),
        Shape::Urlencoded => task.urlencoded(|pairs, _meta| {
            for (key, value) in pairs {
                println!("{key}={value}");
            }
        }),
    };

    let flag = failed.clone();
    task.error(move |err| {
        eprintln!("error: {err}");
        flag.store(true, Ordering::SeqCst);
    });

    info!(url = %args.url, shape = ?args.shape, mode = ?config.transfer.mode, "Fetching");
    task.perform(&transport, &args.url).await;
    queue.barrier().await;

    if failed.load(Ordering::SeqCst) {
        return Err(format!("failed to fetch {}", args.url).into());
    }
    Ok(())
}
