mod cli;

use hdrscope::{
    config,
    dispatch::{Dispatcher, MethodCall, MethodResponse},
    extract::VideoMetadata,
    source::SourceReference,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hdrscope=trace,hdrscope_probe=debug".to_string()
        } else {
            "hdrscope=info,hdrscope_probe=info".to_string()
        }
    });

    // Logs go to stderr so `serve` owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Metadata {
            source,
            headers,
            json,
        } => {
            let dispatcher = build_dispatcher(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_metadata(&dispatcher, &source, &headers, json))
        }
        Commands::Capabilities { json } => {
            let dispatcher = build_dispatcher(cli.config.as_deref())?;
            show_capabilities(&dispatcher, json)
        }
        Commands::Call { method, arguments } => {
            let dispatcher = build_dispatcher(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(call_method(&dispatcher, method, arguments.as_deref()))
        }
        Commands::Serve => {
            let dispatcher = build_dispatcher(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(dispatcher))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hdrscope {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_dispatcher(config_path: Option<&Path>) -> Result<Dispatcher> {
    let config = config::load_config_or_default(config_path)?;
    hdrscope::dispatcher_from_config(&config)
}

/// Parse repeated `Name: value` header arguments
fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|header| -> Result<(String, String)> {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header (expected 'Name: value'): {}", header))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn library_error(e: hdrscope::Error) -> anyhow::Error {
    anyhow::anyhow!("[{}] {}", e.code(), e)
}

async fn show_metadata(
    dispatcher: &Dispatcher,
    source: &str,
    headers: &[String],
    json: bool,
) -> Result<()> {
    let source = SourceReference::parse(source)
        .map_err(library_error)?
        .with_headers(parse_headers(headers)?);

    tracing::info!("Extracting metadata from {}", source);
    let metadata = dispatcher
        .extractor()
        .extract(&source)
        .await
        .map_err(library_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        print_metadata(&source, &metadata);
    }

    Ok(())
}

fn print_metadata(source: &SourceReference, metadata: &VideoMetadata) {
    let or_unknown = |v: Option<u64>| v.map(|v| v.to_string()).unwrap_or_else(|| "?".into());

    println!("Source: {}", source);
    println!(
        "Video: {}x{}",
        or_unknown(metadata.width.map(u64::from)),
        or_unknown(metadata.height.map(u64::from))
    );
    if let Some(ms) = metadata.duration {
        let secs = ms / 1000;
        let mins = secs / 60;
        let hours = mins / 60;
        println!(
            "Duration: {:02}:{:02}:{:02}.{:03}",
            hours,
            mins % 60,
            secs % 60,
            ms % 1000
        );
    }
    if let Some(bitrate) = metadata.bitrate {
        println!("Bitrate: {} kb/s", bitrate / 1000);
    }
    println!("Rotation: {}°", metadata.rotation);
    if let Some(fps) = metadata.frame_rate {
        println!("Frame rate: {:.3} fps", fps);
    }

    match (
        metadata.color_standard,
        metadata.color_transfer,
        metadata.color_range,
    ) {
        (Some(standard), Some(transfer), Some(range)) => {
            println!("Color standard: {}", tag(&standard));
            println!("Color transfer: {}", tag(&transfer));
            println!("Color range: {}", tag(&range));
            if transfer.is_hdr() {
                println!("HDR: yes");
            }
        }
        _ => println!("Color: not exposed"),
    }
}

/// Serialized tag of a color enum
fn tag<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn show_capabilities(dispatcher: &Dispatcher, json: bool) -> Result<()> {
    let detector = dispatcher.detector();
    let hdr = detector.is_hdr_supported().map_err(library_error)?;
    let formats = detector.supported_hdr_formats().map_err(library_error)?;
    let wide = detector
        .is_wide_color_gamut_supported()
        .map_err(library_error)?;

    if json {
        let value = serde_json::json!({
            "provider": detector.provider_name(),
            "hdr": hdr,
            "hdrFormats": formats,
            "wideColorGamut": wide,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        println!("Display provider: {}", detector.provider_name());
        println!("HDR supported: {}", yes_no(hdr));
        if formats.is_empty() {
            println!("HDR formats: none");
        } else {
            let names: Vec<&str> = formats.iter().map(|f| f.as_str()).collect();
            println!("HDR formats: {}", names.join(", "));
        }
        println!("Wide color gamut: {}", yes_no(wide));
    }

    Ok(())
}

async fn call_method(dispatcher: &Dispatcher, method: String, arguments: Option<&str>) -> Result<()> {
    let arguments = match arguments {
        Some(raw) => serde_json::from_str(raw).context("Failed to parse --args as JSON")?,
        None => serde_json::Value::Null,
    };

    let response = dispatcher.handle(MethodCall::new(method, arguments)).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    match response {
        MethodResponse::Success { .. } => Ok(()),
        MethodResponse::Error { code, .. } => anyhow::bail!("Method call failed with {}", code),
        MethodResponse::NotImplemented => anyhow::bail!("Method not implemented"),
    }
}

/// One JSON request per stdin line, one JSON response per stdout line
async fn serve(dispatcher: Dispatcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    tracing::info!("Serving method calls on stdin");

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MethodCall>(&line) {
            Ok(call) => dispatcher.handle(call).await,
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                MethodResponse::Error {
                    code: "INVALID_ARGUMENT".to_string(),
                    message: format!("Malformed request: {}", e),
                }
            }
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Asset root: {:?}", config.assets.root);
            println!("  Remote timeout: {}s", config.remote.timeout_secs);
            println!("  Max download: {} bytes", config.remote.max_download_bytes);
            println!("  DRM root: {:?}", config.display.drm_root);
            println!(
                "  Minimums override: {}",
                if config.display.minimums.is_some() { "yes" } else { "no" }
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Asset root: {:?}", config.assets.root);
            println!("  DRM root: {:?}", config.display.drm_root);
        }
    }

    Ok(())
}
