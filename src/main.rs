use clap::{Parser, Subcommand};
use shine_site::app::{App, AppError};
use shine_site::bus::EventBus;
use shine_site::config;
use shine_site::content;
use shine_site::event_loop::{EventLoop, Millis};
use shine_site::host::files::FileTranslations;
use shine_site::host::memory::{MemoryHost, MemoryViewport, PageLayout};
use shine_site::host::{DomEvent, Viewport};
use shine_site::module::ModuleKind;
use shine_site::output::{self, Timeline};
use shine_site::scroll::ScrollCoordinator;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shine-site")]
#[command(about = "Headless runtime for the Perfect Shine website")]
#[command(long_about = "\
Headless runtime for the Perfect Shine website

Runs the site's client modules (loader, language, navigation, gallery,
call-us widget, partners marquee, contact form, pricing) against an
in-memory page on a virtual clock, so their choreography can be checked
and inspected without a browser.

Project layout:

  site/
  ├── config.toml       # Runtime config (optional, merged over the defaults)
  ├── content/
  │   ├── hero.json     # Hero banner content (optional)
  │   └── services.json # Services section content (optional)
  └── lang/
      ├── sr.json       # Translation tables, one per supported language
      ├── en.json
      └── ru.json

Run 'shine-site gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Log module activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate config.toml
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Boot the site on a virtual clock and print the event timeline
    Simulate {
        /// Directory with <lang>.json translation tables
        #[arg(long, default_value = "lang")]
        lang_dir: PathBuf,

        /// Directory with hero.json and services.json page content
        #[arg(long)]
        content_dir: Option<PathBuf>,

        /// Virtual milliseconds to run after the bootstrap
        #[arg(long, default_value_t = 3000)]
        duration: Millis,

        /// Scroll to these positions (px) one after another
        #[arg(long = "scroll", value_delimiter = ',')]
        scroll: Vec<f64>,

        /// Virtual milliseconds between scroll positions
        #[arg(long, default_value_t = 500)]
        step: Millis,
    },
    /// Print the active section at scroll positions over a page layout
    Sections {
        /// JSON layout: {"viewport_height", "viewport_width", "sections": [{"id", "height"}]}
        layout: PathBuf,

        /// Scroll positions (px)
        #[arg(long = "at", value_delimiter = ',', required = true)]
        at: Vec<f64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check => {
            println!("==> Checking {}", cli.config.join("config.toml").display());
            let config = config::load_config(&cli.config)?;
            println!(
                "==> Config is valid ({} sections, {} modules enabled)",
                config.sections.len(),
                ModuleKind::LOAD_ORDER
                    .iter()
                    .filter(|k| config.modules.is_enabled(**k))
                    .count()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Simulate {
            lang_dir,
            content_dir,
            duration,
            scroll,
            step,
        } => {
            let config = config::load_config(&cli.config)?;
            let memory = MemoryHost::new(&config.sections);
            if let Some(dir) = content_dir {
                let page = content::load_content(&dir)?;
                content::inject(memory.document.as_ref(), &page);
            }
            let mut host = memory.host();
            host.translations = Rc::new(FileTranslations::new(lang_dir));

            let mut el = EventLoop::with_frame_interval(config.performance.frame_interval_ms);
            let app = App::new(config, host, el.scheduler());
            let timeline = Timeline::record(app.bus(), el.scheduler());

            let booted = el
                .block_on(app.initialize())
                .map_err(AppError::from)
                .and_then(|result| result);
            if booted.is_ok() {
                app.start();
                for top in scroll {
                    memory.viewport.set_scroll_top(top);
                    app.dispatch(DomEvent::Scroll);
                    el.advance(step);
                }
            }
            el.advance(duration);

            println!("==> Timeline ({} events)", timeline.len());
            let entries = timeline.entries();
            output::print_timeline(&entries);
            println!();
            output::print_event_summary(&entries);
            println!();
            output::print_module_status(&app.module_status());
            booted?;
            println!("==> Site ready at {}ms", el.now());
        }
        Command::Sections { layout, at } => {
            let mut config = config::load_config(&cli.config)?;
            let text = std::fs::read_to_string(&layout)?;
            let layout: PageLayout = serde_json::from_str(&text)?;
            config.sections = layout.sections.iter().map(|s| s.id.clone()).collect();

            let viewport = Rc::new(MemoryViewport::from_layout(&layout));
            let el = EventLoop::new();
            let scroll = ScrollCoordinator::new(viewport.clone(), el.scheduler(), EventBus::new(), &config);
            let rows: Vec<(f64, Option<String>)> = at
                .into_iter()
                .map(|top| {
                    viewport.set_scroll_top(top);
                    let section = scroll.detect_active_section(&config.sections, true);
                    (viewport.scroll_top(), section)
                })
                .collect();
            output::print_sections(&rows);
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "shine_site=debug" } else { "shine_site=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
